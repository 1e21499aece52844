//! Cart Store.
//!
//! The single source of cart truth for everything outside checkout. Every
//! mutation is mediated through the remote cart service when a session
//! exists; an authorization failure downgrades to a local-only cart rather
//! than a hard error. The store is an explicit, injectable container — it is
//! shared by handing out `Arc<CartStore>`, never through global state.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    api::{ApiError, StorefrontApi},
    domain::{
        cart::{
            errors::{CartStoreError, SyncError},
            models::{CartLine, CartState, NewCartItem, VariantKey},
            storage::CartStorage,
            sync::{Correction, LineSyncOutcome, LineSyncStatus, SyncReport, plan_corrections},
        },
        products::{ColorId, Product, SizeId},
    },
    identity::IdentityProvider,
};

/// How an add was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The server recorded the line and local state followed.
    Added,
    /// There was no usable session; the line lives only in the local cart.
    SavedLocally,
}

impl AddOutcome {
    /// The informational notice to surface, if any.
    #[must_use]
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Added => None,
            Self::SavedLocally => Some("sign in to save this cart to your account"),
        }
    }
}

/// The shared cart state container.
pub struct CartStore {
    api: Arc<dyn StorefrontApi>,
    identity: Arc<dyn IdentityProvider>,
    storage: Option<CartStorage>,
    state: RwLock<CartState>,
}

impl Debug for CartStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CartStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create an empty, unpersisted store.
    #[must_use]
    pub fn new(api: Arc<dyn StorefrontApi>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            api,
            identity,
            storage: None,
            state: RwLock::new(CartState::default()),
        }
    }

    /// Create a store backed by durable storage, restoring any persisted
    /// cart. A cart file that cannot be restored is logged and ignored; the
    /// session starts empty.
    #[must_use]
    pub fn with_storage(
        api: Arc<dyn StorefrontApi>,
        identity: Arc<dyn IdentityProvider>,
        storage: CartStorage,
    ) -> Self {
        let state = match storage.load() {
            Ok(Some(state)) => state,
            Ok(None) => CartState::default(),
            Err(error) => {
                warn!(error = %error, "could not restore the persisted cart; starting empty");
                CartState::default()
            }
        };

        Self {
            api,
            identity,
            storage: Some(storage),
            state: RwLock::new(state),
        }
    }

    /// A snapshot of the current cart state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.read().clone()
    }

    /// Add a product to the cart.
    ///
    /// When `color`/`size` are omitted they are resolved from the product's
    /// variant tree (first colour with stock, then its first in-stock size).
    /// With a session, the server validates the add first and a business
    /// rejection leaves local state untouched; a 401/403 downgrades to the
    /// local-only path instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid input, failed variant resolution, or any
    /// server failure other than an authorization failure.
    pub async fn add_item(
        &self,
        product: &Product,
        quantity: u32,
        color: Option<ColorId>,
        size: Option<SizeId>,
    ) -> Result<AddOutcome, CartStoreError> {
        if quantity == 0 {
            return Err(CartStoreError::ZeroQuantity);
        }

        let (color_id, size_id) = match (color, size) {
            (Some(color_id), Some(size_id)) => (color_id, size_id),
            (color, size) => {
                let detail = self
                    .api
                    .fetch_product_detail(product.id)
                    .await
                    .map_err(CartStoreError::AddFailed)?;

                detail
                    .resolve_variant(color, size)
                    .ok_or(CartStoreError::VariantSelectionRequired)?
            }
        };

        let item = NewCartItem {
            product_id: product.id,
            color_id,
            size_id,
            quantity,
        };

        let mut outcome = AddOutcome::Added;
        let mut server_item_id = None;

        if let Some(user) = self.identity.current_user() {
            match self.api.add_cart_item(user.user_id, item).await {
                Ok(echo) => {
                    server_item_id = echo.and_then(|line| line.cart_item_id);
                }
                Err(error) if error.is_unauthorized() => {
                    info!(product_id = %product.id, "server add not authorized; keeping the cart local only");
                    outcome = AddOutcome::SavedLocally;
                }
                Err(ApiError::Rejected(message)) => {
                    return Err(CartStoreError::Rejected(message));
                }
                Err(error) => {
                    return Err(match error.server_message() {
                        Some(message) => CartStoreError::Rejected(message.to_string()),
                        None => CartStoreError::AddFailed(error),
                    });
                }
            }
        } else {
            outcome = AddOutcome::SavedLocally;
        }

        let snapshot = {
            let mut state = self.write();

            let existing = state
                .lines
                .iter()
                .position(|line| line.variant_key() == item_key(&item));

            match existing {
                Some(index) => {
                    if let Some(line) = state.lines.get_mut(index) {
                        line.quantity += quantity;
                        if line.server_item_id.is_none() {
                            line.server_item_id = server_item_id;
                        }
                    }
                }
                None => state.lines.push(CartLine {
                    local_id: Uuid::now_v7(),
                    product_id: product.id,
                    color_id,
                    size_id,
                    quantity,
                    unit_price: product.effective_price(),
                    server_item_id,
                }),
            }

            state.recompute_totals();
            state.is_open = true;
            state.clone()
        };

        self.persist(&snapshot);

        Ok(outcome)
    }

    /// Remove a line by local id. Unknown ids are a no-op.
    ///
    /// A server-backed line is deleted server-side best-effort first; a
    /// failed delete is logged and never blocks the local removal.
    pub async fn remove_item(&self, local_id: Uuid) {
        let Some(line) = self
            .read()
            .lines
            .iter()
            .find(|line| line.local_id == local_id)
            .cloned()
        else {
            return;
        };

        if self.identity.current_user().is_some() {
            if let Some(item_id) = line.server_item_id {
                if let Err(error) = self.api.delete_cart_item(item_id).await {
                    warn!(
                        cart_item_id = %item_id,
                        error = %error,
                        "server-side delete failed; removing locally anyway"
                    );
                }
            }
        }

        let snapshot = {
            let mut state = self.write();
            state.lines.retain(|line| line.local_id != local_id);
            state.recompute_totals();
            state.clone()
        };

        self.persist(&snapshot);
    }

    /// Set a line's quantity. Zero delegates to [`Self::remove_item`].
    ///
    /// This path never calls the server; the change is reconciled at the next
    /// synchronization.
    pub async fn update_quantity(&self, local_id: Uuid, quantity: u32) {
        if quantity == 0 {
            return self.remove_item(local_id).await;
        }

        let snapshot = {
            let mut state = self.write();

            let Some(line) = state
                .lines
                .iter_mut()
                .find(|line| line.local_id == local_id)
            else {
                return;
            };

            line.quantity = quantity;
            state.recompute_totals();
            state.clone()
        };

        self.persist(&snapshot);
    }

    /// Empty the cart locally. Callers that need the server cart cleared do
    /// so explicitly, e.g. at order completion.
    pub fn clear(&self) {
        let snapshot = {
            let mut state = self.write();
            state.lines.clear();
            state.recompute_totals();
            state.clone()
        };

        self.persist(&snapshot);
    }

    /// Replace the whole line set with lines mapped from server truth.
    pub fn replace_state(&self, lines: Vec<CartLine>) {
        let snapshot = {
            let mut state = self.write();
            state.lines = lines;
            state.recompute_totals();
            state.clone()
        };

        self.persist(&snapshot);
    }

    /// Mark the cart UI open.
    pub fn open_cart(&self) {
        self.write().is_open = true;
    }

    /// Mark the cart UI closed.
    pub fn close_cart(&self) {
        self.write().is_open = false;
    }

    /// Reconcile the local cart with the server's cart of record.
    ///
    /// Quantity differences are corrected deterministically (delta add /
    /// absolute set), per-line failures are recorded and skipped, and on
    /// success the local cart is unconditionally replaced by a final fetch of
    /// the server cart. A failed final fetch leaves local state as it was.
    ///
    /// # Errors
    ///
    /// Fails only without an identified session. Partial per-line failure is
    /// reported through the [`SyncReport`], not as an overall error.
    #[tracing::instrument(skip(self))]
    pub async fn sync_with_server(&self) -> Result<SyncReport, SyncError> {
        let Some(user) = self.identity.current_user() else {
            return Err(SyncError::NotAuthenticated);
        };
        let user = user.user_id;

        let server_lines = match self.api.fetch_cart(user).await {
            Ok(lines) => lines,
            Err(error) => {
                warn!(error = %error, "could not read the server cart; reconciling against an empty one");
                Vec::new()
            }
        };

        let local_lines = self.state().lines;
        let corrections = plan_corrections(&local_lines, &server_lines);

        debug!(correction_count = corrections.len(), "planned cart corrections");

        let mut report = SyncReport::default();

        for correction in corrections {
            let status = match correction {
                Correction::Add { key, quantity } => {
                    let item = NewCartItem {
                        product_id: key.product_id,
                        color_id: key.color_id,
                        size_id: key.size_id,
                        quantity,
                    };

                    match self.api.add_cart_item(user, item).await {
                        Ok(_) => LineSyncStatus::Applied,
                        Err(error) if error.is_unauthorized() => {
                            warn!(product_id = %key.product_id, "not authorized to push line; leaving it unsynced");
                            LineSyncStatus::Unauthorized
                        }
                        Err(error) => {
                            warn!(product_id = %key.product_id, error = %error, "could not push line");
                            LineSyncStatus::Failed(error.to_string())
                        }
                    }
                }
                Correction::SetQuantity {
                    key,
                    cart_item_id,
                    quantity,
                } => match self.api.set_item_quantity(cart_item_id, quantity).await {
                    Ok(()) => LineSyncStatus::Applied,
                    Err(error) if error.is_unauthorized() => {
                        warn!(cart_item_id = %cart_item_id, "not authorized to set quantity; leaving line unsynced");
                        LineSyncStatus::Unauthorized
                    }
                    Err(error) => {
                        warn!(cart_item_id = %cart_item_id, error = %error, "could not set quantity");
                        LineSyncStatus::Failed(error.to_string())
                    }
                },
                Correction::MissingHandle { key } => {
                    warn!(product_id = %key.product_id, "server line has no item handle; skipping correction");
                    LineSyncStatus::Skipped
                }
            };

            report.outcomes.push(LineSyncOutcome { correction, status });
        }

        match self.api.fetch_cart(user).await {
            Ok(lines) => {
                self.replace_state(lines.iter().map(CartLine::from_server).collect());
                report.replaced = true;
            }
            Err(error) => {
                warn!(error = %error, "final cart fetch failed; keeping local state as-is");
            }
        }

        Ok(report)
    }

    fn read(&self) -> RwLockReadGuard<'_, CartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &CartState) {
        if let Some(storage) = &self.storage {
            if let Err(error) = storage.save(state) {
                warn!(path = %storage.path().display(), error = %error, "could not persist the cart");
            }
        }
    }
}

fn item_key(item: &NewCartItem) -> VariantKey {
    VariantKey {
        product_id: item.product_id,
        color_id: item.color_id,
        size_id: item.size_id,
    }
}
