//! Cart

pub mod errors;
pub mod models;
pub mod storage;
pub mod store;
pub mod sync;

pub use errors::{CartStoreError, SyncError};
pub use storage::{CartStorage, StorageError};
pub use store::{AddOutcome, CartStore};
pub use sync::{Correction, LineSyncOutcome, LineSyncStatus, SyncReport};
