//! Storefront API boundary.
//!
//! Everything the reconciliation core knows about the remote REST API lives
//! here: the operation seam ([`StorefrontApi`]), its HTTP implementation, and
//! the normalization layer that maps every known wire shape into one
//! canonical typed structure before it reaches the domain.

pub mod client;
pub mod errors;
mod records;

pub use client::{HttpStorefrontApi, MockStorefrontApi, StorefrontApi, StorefrontApiConfig};
pub use errors::ApiError;
