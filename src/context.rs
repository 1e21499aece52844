//! App Context

use std::sync::Arc;

use crate::{
    api::{HttpStorefrontApi, StorefrontApi},
    config::StorefrontConfig,
    domain::{
        cart::{CartStorage, CartStore},
        checkout::Checkout,
    },
    identity::IdentityProvider,
};

/// The application's collaborator graph: one API client, one identity
/// provider, and the single shared cart store, wired together at the root
/// and passed by reference to whatever needs them.
#[derive(Clone)]
pub struct AppContext {
    pub api: Arc<dyn StorefrontApi>,
    pub identity: Arc<dyn IdentityProvider>,
    pub cart: Arc<CartStore>,
}

impl AppContext {
    /// Build the context from configuration, using the HTTP client.
    #[must_use]
    pub fn from_config(config: &StorefrontConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        let api: Arc<dyn StorefrontApi> = Arc::new(HttpStorefrontApi::new(config.api.clone()));

        Self::new(api, identity, config.cart_path.clone().map(CartStorage::new))
    }

    /// Wire a context from explicit collaborators.
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        identity: Arc<dyn IdentityProvider>,
        storage: Option<CartStorage>,
    ) -> Self {
        let cart = Arc::new(match storage {
            Some(storage) => {
                CartStore::with_storage(Arc::clone(&api), Arc::clone(&identity), storage)
            }
            None => CartStore::new(Arc::clone(&api), Arc::clone(&identity)),
        });

        Self {
            api,
            identity,
            cart,
        }
    }

    /// A checkout screen over the shared cart store.
    #[must_use]
    pub fn checkout(&self) -> Checkout {
        Checkout::new(
            Arc::clone(&self.api),
            Arc::clone(&self.identity),
            Arc::clone(&self.cart),
        )
    }
}
