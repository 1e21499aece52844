//! Storefront API errors.

use thiserror::Error;

/// Errors that can occur when talking to the storefront API.
///
/// Conversion from status codes and body shapes happens once, inside the
/// client; callers match on these variants and never inspect wire payloads.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered 401/403. Callers treat this as "no session for
    /// server purposes" rather than a hard failure.
    #[error("not authorized")]
    Unauthorized,

    /// The server declared a business rejection and said why (insufficient
    /// stock, inactive product, invalid promo, ...).
    #[error("{0}")]
    Rejected(String),

    /// Order creation failed with a message and an optional error-type tag.
    #[error("order creation failed: {message}")]
    Order {
        message: String,
        error_type: Option<String>,
    },

    /// An HTTP transport or deserialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a shape the normalization layer does not know.
    #[error("unexpected response from storefront API: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    /// Whether this is the authorization failure the soft-fallback paths key
    /// off.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// The server-supplied message, when the failure carried one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) | Self::Order { message, .. } => Some(message),
            Self::Unauthorized | Self::Http(_) | Self::UnexpectedResponse(_) => None,
        }
    }
}
