//! Cart Store errors.

use thiserror::Error;

use crate::api::ApiError;

/// Errors returned by the cart store's mutation paths.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// An add was requested with a zero quantity.
    #[error("quantity must be greater than zero")]
    ZeroQuantity,

    /// The product has no colour/size combination to resolve to.
    #[error("requires color and size selection")]
    VariantSelectionRequired,

    /// The server declared a business rejection; local state was not touched.
    #[error("{0}")]
    Rejected(String),

    /// The add could not be completed and the server gave no message.
    #[error("the item could not be added to the cart")]
    AddFailed(#[source] ApiError),
}

/// Errors returned by the synchronization routine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reconciliation requires an identified session.
    #[error("no user logged in")]
    NotAuthenticated,
}
