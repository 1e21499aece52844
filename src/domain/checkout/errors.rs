//! Checkout errors.
//!
//! Every variant maps to a recovery the caller already knows: notify and
//! redirect to authentication, notify and redirect to the cart view, or show
//! a field-level message and stay put. Checkout never leaves the user on a
//! screen showing totals it cannot currently verify.

use thiserror::Error;

use crate::{api::ApiError, domain::cart::SyncError};

/// Errors aborting the checkout load sequence.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout requires an identified session.
    #[error("no user logged in")]
    NotAuthenticated,

    /// The synchronization routine reported failure; checkout never proceeds
    /// against an unsynchronized cart.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The authoritative cart came back empty.
    #[error("cart is empty")]
    EmptyCart,

    /// The checkout cart snapshot could not be fetched.
    #[error("could not load the checkout cart")]
    Cart(#[source] ApiError),

    /// Shipping methods could not be loaded.
    #[error("could not load shipping methods")]
    Shipping(#[source] ApiError),

    /// Saved addresses could not be loaded.
    #[error("could not load saved addresses")]
    Addresses(#[source] ApiError),
}

/// Errors from promo application.
#[derive(Debug, Error)]
pub enum PromoError {
    /// Promo evaluation requires an identified session.
    #[error("no user logged in")]
    NotAuthenticated,

    /// The code was blank after trimming.
    #[error("enter a promo code")]
    EmptyCode,

    /// The server declined the code (or could not be reached, which is
    /// surfaced the same way).
    #[error("{0}")]
    Invalid(String),
}

/// Errors from order placement.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// Checkout is not in a state an order can be placed from.
    #[error("checkout is not ready")]
    NotReady,

    /// Order placement requires an identified session.
    #[error("no user logged in")]
    NotAuthenticated,

    /// No shipping method is selected.
    #[error("select a shipping method")]
    NoShippingMethod,

    /// The new-address form is missing required fields.
    #[error("complete the shipping address")]
    IncompleteAddress,

    /// The new address could not be persisted.
    #[error("could not save the shipping address")]
    AddressSave(#[source] ApiError),

    /// The pre-commit gate could not re-read the server cart; the order is
    /// withheld rather than placed against an unverifiable cart.
    #[error("could not verify the cart before ordering")]
    Verification(#[source] ApiError),

    /// The server cart diverged from checkout's working set; checkout data
    /// was reloaded and the order was not created.
    #[error("the cart changed; checkout has been refreshed")]
    CartChanged,

    /// The server rejected the order and said why.
    #[error("{message}")]
    Rejected {
        message: String,
        error_type: Option<String>,
    },

    /// The order could not be placed and the server gave no message.
    #[error("the order could not be placed")]
    Failed(#[source] ApiError),
}
