//! Checkout orchestrator.
//!
//! Sequences cart truth-establishment, shipping and address loading, promo
//! application, and order placement. The working set is always a fresh server
//! read, and immediately before order creation the server cart is read once
//! more — orders are never created against a cart the client cannot
//! currently verify.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::{
    api::{ApiError, StorefrontApi},
    domain::{
        cart::{
            models::{CartLine, ServerCartLine},
            store::CartStore,
        },
        checkout::{
            errors::{CheckoutError, PlaceOrderError, PromoError},
            models::{
                Address, AddressId, AddressSelection, CheckoutItem, CheckoutPhase, CheckoutTotals,
                NewAddress, OrderConfirmation, PromoApplication, PromoRequest, ShippingMethod,
                ShippingMethodId,
            },
        },
    },
    identity::{IdentityProvider, UserId},
};

/// How long the UI lingers on the confirmation before navigating to the
/// order listing. A fixed pause, not a retry mechanism.
pub const POST_ORDER_NAVIGATION_DELAY: Duration = Duration::from_secs(2);

/// Flat 15% VAT, applied to the discounted subtotal.
fn vat_rate() -> Decimal {
    Decimal::new(15, 2)
}

/// Absolute subtotal drift absorbed by the pre-commit gate, in currency
/// units; anything larger counts as divergence.
fn subtotal_tolerance() -> Decimal {
    Decimal::new(5, 1)
}

/// The checkout screen's state and procedures.
pub struct Checkout {
    api: Arc<dyn StorefrontApi>,
    identity: Arc<dyn IdentityProvider>,
    cart: Arc<CartStore>,
    phase: CheckoutPhase,
    items: Vec<CheckoutItem>,
    shipping_methods: Vec<ShippingMethod>,
    selected_method: Option<ShippingMethodId>,
    addresses: Vec<Address>,
    address: AddressSelection,
    promo: Option<PromoApplication>,
}

impl Debug for Checkout {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Checkout")
            .field("phase", &self.phase)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl Checkout {
    /// Create a checkout over the shared cart store.
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        identity: Arc<dyn IdentityProvider>,
        cart: Arc<CartStore>,
    ) -> Self {
        Self {
            api,
            identity,
            cart,
            phase: CheckoutPhase::Loading,
            items: Vec::new(),
            shipping_methods: Vec::new(),
            selected_method: None,
            addresses: Vec::new(),
            address: AddressSelection::default(),
            promo: None,
        }
    }

    /// Establish checkout's working set.
    ///
    /// Synchronizes the cart, fetches the authoritative checkout snapshot (a
    /// second, independent read — the sync routine's internal replacement is
    /// not trusted as sufficient), pushes it into the shared store, and loads
    /// shipping methods and saved addresses. Also the "window refocus"
    /// handler: re-running it re-establishes truth after the user may have
    /// changed the cart in another tab.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole load; the caller notifies the user and
    /// redirects to authentication or the cart view.
    #[tracing::instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), CheckoutError> {
        self.phase = CheckoutPhase::Loading;

        let Some(user) = self.identity.current_user() else {
            return Err(CheckoutError::NotAuthenticated);
        };
        let user = user.user_id;

        self.cart.sync_with_server().await?;

        let lines = self
            .api
            .fetch_checkout_cart(user)
            .await
            .map_err(CheckoutError::Cart)?;

        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        self.items = lines.iter().map(CheckoutItem::from).collect();
        self.cart
            .replace_state(lines.iter().map(CartLine::from_server).collect());

        let methods = self
            .api
            .fetch_shipping_methods()
            .await
            .map_err(CheckoutError::Shipping)?;
        self.selected_method = methods.first().map(|method| method.method_id);
        self.shipping_methods = methods;

        let addresses = self
            .api
            .fetch_addresses(user)
            .await
            .map_err(CheckoutError::Addresses)?;
        self.address = match addresses.first() {
            Some(address) => AddressSelection::Saved(address.address_id),
            None => AddressSelection::New(NewAddress::default()),
        };
        self.addresses = addresses;

        self.phase = CheckoutPhase::Ready;

        Ok(())
    }

    /// Current phase of the checkout state machine.
    #[must_use]
    pub fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    /// Checkout's working set.
    #[must_use]
    pub fn items(&self) -> &[CheckoutItem] {
        &self.items
    }

    /// The shipping methods on offer.
    #[must_use]
    pub fn shipping_methods(&self) -> &[ShippingMethod] {
        &self.shipping_methods
    }

    /// The currently selected shipping method, if any.
    #[must_use]
    pub fn selected_method(&self) -> Option<ShippingMethodId> {
        self.selected_method
    }

    /// The user's saved addresses.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// The shipping address the order will use.
    #[must_use]
    pub fn address(&self) -> &AddressSelection {
        &self.address
    }

    /// The applied promo, if any.
    #[must_use]
    pub fn promo(&self) -> Option<&PromoApplication> {
        self.promo.as_ref()
    }

    /// Select one of the loaded shipping methods; unknown ids are ignored.
    pub fn select_shipping_method(&mut self, method: ShippingMethodId) {
        if self
            .shipping_methods
            .iter()
            .any(|candidate| candidate.method_id == method)
        {
            self.selected_method = Some(method);
        } else {
            warn!(method_id = %method, "ignoring selection of unknown shipping method");
        }
    }

    /// Select one of the loaded saved addresses; unknown ids are ignored.
    pub fn select_saved_address(&mut self, address: AddressId) {
        if self
            .addresses
            .iter()
            .any(|candidate| candidate.address_id == address)
        {
            self.address = AddressSelection::Saved(address);
        } else {
            warn!(address_id = %address, "ignoring selection of unknown address");
        }
    }

    /// Switch to entering a new address.
    pub fn enter_new_address(&mut self, form: NewAddress) {
        self.address = AddressSelection::New(form);
    }

    /// Apply a promo code against the current working set.
    ///
    /// The code is trimmed and upper-cased, and sent with the current
    /// product quantities and subtotal. The server's stated discount is
    /// authoritative and never re-derived locally.
    ///
    /// # Errors
    ///
    /// An undecided or unreachable promo service surfaces as an invalid code.
    pub async fn apply_promo(&mut self, code: &str) -> Result<PromoApplication, PromoError> {
        let Some(user) = self.identity.current_user() else {
            return Err(PromoError::NotAuthenticated);
        };

        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(PromoError::EmptyCode);
        }

        let mut product_quantities: FxHashMap<_, u32> = FxHashMap::default();
        for item in &self.items {
            *product_quantities.entry(item.product_id).or_insert(0) += item.quantity;
        }

        let request = PromoRequest {
            code: code.clone(),
            product_quantities,
            cart_subtotal: self.totals().subtotal,
        };

        match self.api.apply_promo(user.user_id, request).await {
            Ok(decision) if decision.applied => {
                let applied = PromoApplication {
                    code: code.clone(),
                    discount_amount: decision.discount_amount,
                    message: decision.message,
                };

                info!(code = %code, discount = %applied.discount_amount, "promo applied");
                self.promo = Some(applied.clone());

                Ok(applied)
            }
            Ok(decision) => Err(PromoError::Invalid(if decision.message.is_empty() {
                "that promo code is not valid".to_string()
            } else {
                decision.message
            })),
            Err(error) => {
                warn!(code = %code, error = %error, "promo evaluation failed");
                Err(PromoError::Invalid("that promo code is not valid".to_string()))
            }
        }
    }

    /// Drop the applied promo. Local only — nothing is recorded server-side;
    /// removal merely changes what order creation is sent.
    pub fn remove_promo(&mut self) {
        self.promo = None;
    }

    /// Derived money amounts for the current selections.
    #[must_use]
    pub fn totals(&self) -> CheckoutTotals {
        let subtotal: Decimal = self
            .items
            .iter()
            .map(|item| Decimal::from(item.quantity) * item.base_price)
            .sum();

        let discount = self
            .promo
            .as_ref()
            .map_or(Decimal::ZERO, |promo| promo.discount_amount);

        let shipping = self
            .selected_method
            .and_then(|id| {
                self.shipping_methods
                    .iter()
                    .find(|method| method.method_id == id)
            })
            .map_or(Decimal::ZERO, |method| method.cost);

        let tax = (subtotal - discount) * vat_rate();
        let total = subtotal - discount + shipping + tax;

        CheckoutTotals {
            subtotal,
            discount,
            shipping,
            tax,
            total,
        }
    }

    /// Place the order.
    ///
    /// Validates selections locally, persists a newly entered address, then
    /// passes the pre-commit gate: the server cart is re-fetched and compared
    /// against the working set, and any divergence aborts placement and
    /// reloads checkout instead of creating an order. Only the shipping
    /// choices are sent; the server orders from its own authoritative cart.
    ///
    /// # Errors
    ///
    /// A failed placement leaves checkout in `Ready`; retrying re-enters the
    /// whole procedure, gate included.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&mut self) -> Result<OrderConfirmation, PlaceOrderError> {
        if self.phase != CheckoutPhase::Ready {
            return Err(PlaceOrderError::NotReady);
        }

        let Some(user) = self.identity.current_user() else {
            return Err(PlaceOrderError::NotAuthenticated);
        };

        let Some(method) = self.selected_method else {
            return Err(PlaceOrderError::NoShippingMethod);
        };

        if let AddressSelection::New(form) = &self.address {
            if !form.is_complete() {
                return Err(PlaceOrderError::IncompleteAddress);
            }
        }

        self.phase = CheckoutPhase::PlacingOrder;

        let result = self.place_order_inner(user.user_id, method).await;

        match &result {
            Ok(_) => self.phase = CheckoutPhase::Succeeded,
            // A divergence reload has already moved the phase; otherwise the
            // failure returns checkout to Ready for a retry.
            Err(_) if self.phase == CheckoutPhase::PlacingOrder => {
                self.phase = CheckoutPhase::Ready;
            }
            Err(_) => {}
        }

        result
    }

    async fn place_order_inner(
        &mut self,
        user: UserId,
        method: ShippingMethodId,
    ) -> Result<OrderConfirmation, PlaceOrderError> {
        let address_id = match self.address.clone() {
            AddressSelection::Saved(id) => id,
            AddressSelection::New(form) => {
                let id = self
                    .api
                    .create_address(user, form)
                    .await
                    .map_err(PlaceOrderError::AddressSave)?;

                self.address = AddressSelection::Saved(id);
                id
            }
        };

        let server_lines = self
            .api
            .fetch_checkout_cart(user)
            .await
            .map_err(PlaceOrderError::Verification)?;

        if self.cart_diverged(&server_lines) {
            info!("server cart diverged from the working set; reloading checkout");

            if let Err(error) = self.load().await {
                warn!(error = %error, "checkout reload after divergence failed");
            }

            return Err(PlaceOrderError::CartChanged);
        }

        let confirmation = match self.api.create_order(user, method, address_id).await {
            Ok(confirmation) => confirmation,
            Err(ApiError::Order {
                message,
                error_type,
            }) => {
                return Err(PlaceOrderError::Rejected {
                    message,
                    error_type,
                });
            }
            Err(error) => {
                return Err(match error.server_message() {
                    Some(message) => PlaceOrderError::Rejected {
                        message: message.to_string(),
                        error_type: None,
                    },
                    None => PlaceOrderError::Failed(error),
                });
            }
        };

        self.cart.clear();

        if let Err(error) = self.api.clear_cart(user).await {
            warn!(error = %error, "server-side cart clear failed after order placement");
        }

        info!(order_number = %confirmation.order_number, "order placed");

        Ok(confirmation)
    }

    /// The final consistency gate: a different line count, or a server-side
    /// subtotal drifting beyond the tolerance, counts as divergence.
    fn cart_diverged(&self, server_lines: &[ServerCartLine]) -> bool {
        if server_lines.len() != self.items.len() {
            return true;
        }

        let server_subtotal: Decimal = server_lines
            .iter()
            .map(|line| Decimal::from(line.quantity) * line.base_price)
            .sum();

        (server_subtotal - self.totals().subtotal).abs() > subtotal_tolerance()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        api::MockStorefrontApi,
        domain::{
            checkout::models::{PromoDecision, ShippingMethod},
            products::{ColorId, ProductId, SizeId},
        },
        identity::{Anonymous, FixedIdentity},
    };

    use super::*;

    fn checkout_with(api: MockStorefrontApi) -> Checkout {
        let api: Arc<dyn StorefrontApi> = Arc::new(api);
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(FixedIdentity::new(UserId::from_raw(1)));
        let cart = Arc::new(CartStore::new(Arc::clone(&api), Arc::clone(&identity)));

        Checkout::new(api, identity, cart)
    }

    fn item(product: u64, quantity: u32, base_price: Decimal) -> CheckoutItem {
        CheckoutItem {
            cart_item_id: Some(1.into()),
            product_id: ProductId::from_raw(product),
            color_id: ColorId::from_raw(1),
            size_id: SizeId::from_raw(1),
            quantity,
            unit_price: base_price,
            base_price,
        }
    }

    #[test]
    fn totals_use_base_price_and_discounted_vat() {
        let mut checkout = checkout_with(MockStorefrontApi::new());
        checkout.items = vec![item(1, 10, Decimal::new(100_00, 2))];
        checkout.promo = Some(PromoApplication {
            code: "SAVE10".to_string(),
            discount_amount: Decimal::new(100_00, 2),
            message: "10% off applied".to_string(),
        });

        let totals = checkout.totals();

        assert_eq!(totals.subtotal, Decimal::new(1000_00, 2));
        assert_eq!(totals.discount, Decimal::new(100_00, 2));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::new(135_0000, 4));
        assert_eq!(totals.total, Decimal::new(1035_0000, 4));
    }

    #[test]
    fn totals_include_the_selected_shipping_method() {
        let mut checkout = checkout_with(MockStorefrontApi::new());
        checkout.items = vec![item(1, 1, Decimal::new(100_00, 2))];
        checkout.shipping_methods = vec![ShippingMethod {
            method_id: ShippingMethodId::from_raw(1),
            name: "Standard".to_string(),
            cost: Decimal::new(4_50, 2),
            estimated_days: 3,
        }];
        checkout.selected_method = Some(ShippingMethodId::from_raw(1));

        let totals = checkout.totals();

        assert_eq!(totals.shipping, Decimal::new(4_50, 2));
        assert_eq!(totals.tax, Decimal::new(15_0000, 4));
        assert_eq!(totals.total, Decimal::new(119_5000, 4));
    }

    #[tokio::test]
    async fn load_requires_a_session() {
        let api: Arc<dyn StorefrontApi> = Arc::new(MockStorefrontApi::new());
        let identity: Arc<dyn IdentityProvider> = Arc::new(Anonymous);
        let cart = Arc::new(CartStore::new(Arc::clone(&api), Arc::clone(&identity)));
        let mut checkout = Checkout::new(api, identity, cart);

        let result = checkout.load().await;

        assert!(
            matches!(result, Err(CheckoutError::NotAuthenticated)),
            "expected NotAuthenticated, got {result:?}"
        );
    }

    #[tokio::test]
    async fn load_with_an_empty_server_cart_aborts() {
        let mut api = MockStorefrontApi::new();
        api.expect_fetch_cart().returning(|_| Ok(vec![]));
        api.expect_fetch_checkout_cart().returning(|_| Ok(vec![]));

        let mut checkout = checkout_with(api);

        let result = checkout.load().await;

        assert!(
            matches!(result, Err(CheckoutError::EmptyCart)),
            "expected EmptyCart, got {result:?}"
        );
        assert_eq!(checkout.phase(), CheckoutPhase::Loading);
    }

    #[tokio::test]
    async fn place_order_requires_ready_phase() {
        let mut checkout = checkout_with(MockStorefrontApi::new());

        let result = checkout.place_order().await;

        assert!(
            matches!(result, Err(PlaceOrderError::NotReady)),
            "expected NotReady, got {result:?}"
        );
    }

    #[tokio::test]
    async fn place_order_validates_selections_before_any_call() {
        let mut checkout = checkout_with(MockStorefrontApi::new());
        checkout.phase = CheckoutPhase::Ready;
        checkout.items = vec![item(1, 1, Decimal::new(10_00, 2))];

        let result = checkout.place_order().await;
        assert!(
            matches!(result, Err(PlaceOrderError::NoShippingMethod)),
            "expected NoShippingMethod, got {result:?}"
        );

        checkout.shipping_methods = vec![ShippingMethod {
            method_id: ShippingMethodId::from_raw(1),
            name: "Standard".to_string(),
            cost: Decimal::new(4_50, 2),
            estimated_days: 3,
        }];
        checkout.selected_method = Some(ShippingMethodId::from_raw(1));
        checkout.phase = CheckoutPhase::Ready;

        let result = checkout.place_order().await;
        assert!(
            matches!(result, Err(PlaceOrderError::IncompleteAddress)),
            "expected IncompleteAddress, got {result:?}"
        );
        assert_eq!(checkout.phase(), CheckoutPhase::Ready);
    }

    #[tokio::test]
    async fn invalid_promo_is_surfaced_verbatim() -> TestResult {
        let mut api = MockStorefrontApi::new();
        api.expect_apply_promo().returning(|_, _| {
            Ok(PromoDecision {
                applied: false,
                discount_amount: Decimal::ZERO,
                message: "that code has expired".to_string(),
            })
        });

        let mut checkout = checkout_with(api);
        checkout.items = vec![item(1, 1, Decimal::new(10_00, 2))];

        let result = checkout.apply_promo("  save10 ").await;

        match result {
            Err(PromoError::Invalid(message)) => assert_eq!(message, "that code has expired"),
            other => return Err(format!("expected Invalid, got {other:?}").into()),
        }
        assert!(checkout.promo().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn promo_transport_failure_reads_as_invalid_code() {
        let mut api = MockStorefrontApi::new();
        api.expect_apply_promo()
            .returning(|_, _| Err(ApiError::UnexpectedResponse("status 500".to_string())));

        let mut checkout = checkout_with(api);
        checkout.items = vec![item(1, 1, Decimal::new(10_00, 2))];

        let result = checkout.apply_promo("SAVE10").await;

        assert!(
            matches!(result, Err(PromoError::Invalid(_))),
            "expected Invalid, got {result:?}"
        );
    }

    #[tokio::test]
    async fn applied_promo_is_trimmed_and_uppercased() -> TestResult {
        let mut api = MockStorefrontApi::new();
        api.expect_apply_promo()
            .withf(|_, request| request.code == "SAVE10")
            .returning(|_, request| {
                Ok(PromoDecision {
                    applied: true,
                    discount_amount: request.cart_subtotal / Decimal::new(10, 0),
                    message: "10% off applied".to_string(),
                })
            });

        let mut checkout = checkout_with(api);
        checkout.items = vec![item(1, 10, Decimal::new(100_00, 2))];

        let applied = checkout.apply_promo("  save10 ").await?;

        assert_eq!(applied.code, "SAVE10");
        assert_eq!(applied.discount_amount, Decimal::new(100_00, 2));

        checkout.remove_promo();
        assert!(checkout.promo().is_none());

        Ok(())
    }

    #[test]
    fn divergence_by_line_count_and_by_subtotal() {
        let mut checkout = checkout_with(MockStorefrontApi::new());
        checkout.items = vec![item(1, 2, Decimal::new(50_00, 2))];

        let matching = vec![ServerCartLine {
            cart_item_id: Some(1.into()),
            product_id: ProductId::from_raw(1),
            color_id: ColorId::from_raw(1),
            size_id: SizeId::from_raw(1),
            quantity: 2,
            unit_price: Decimal::new(50_00, 2),
            base_price: Decimal::new(50_00, 2),
        }];

        assert!(!checkout.cart_diverged(&matching));
        assert!(checkout.cart_diverged(&[]), "missing line must diverge");

        // 0.20 per unit × 2 = 0.40 of drift: absorbed by the tolerance.
        let mut drifted = matching.clone();
        if let Some(line) = drifted.first_mut() {
            line.base_price = Decimal::new(50_20, 2);
        }
        assert!(!checkout.cart_diverged(&drifted), "0.40 drift is tolerated");

        // 0.40 per unit × 2 = 0.80 of drift: beyond the tolerance.
        let mut drifted = matching;
        if let Some(line) = drifted.first_mut() {
            line.base_price = Decimal::new(50_40, 2);
        }
        assert!(checkout.cart_diverged(&drifted), "0.80 drift must diverge");
    }
}
