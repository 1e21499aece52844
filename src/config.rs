//! Ambient configuration.

use std::{env, path::PathBuf};

use tracing::info;

use crate::api::StorefrontApiConfig;

/// Environment variable naming the API root.
pub const API_BASE_URL_VAR: &str = "WICKER_API_BASE_URL";

/// Environment variable naming the persisted-cart file. When unset, the cart
/// lives only in memory.
pub const CART_PATH_VAR: &str = "WICKER_CART_PATH";

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Top-level configuration for the storefront client.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Connection settings for the storefront API.
    pub api: StorefrontApiConfig,

    /// Where the cart persists between sessions, if anywhere.
    pub cart_path: Option<PathBuf>,
}

impl StorefrontConfig {
    /// Load configuration from the environment, falling back to logged
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var(API_BASE_URL_VAR).unwrap_or_else(|_| {
            info!("{API_BASE_URL_VAR} not set, using default: {DEFAULT_BASE_URL}");
            DEFAULT_BASE_URL.to_string()
        });

        let cart_path = env::var_os(CART_PATH_VAR).map(PathBuf::from);

        Self {
            api: StorefrontApiConfig { base_url },
            cart_path,
        }
    }
}
