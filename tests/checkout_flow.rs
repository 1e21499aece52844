//! The full checkout sequence against a mocked API: load, promo, pre-commit
//! gate, order placement, and the divergence path that withholds the order.

use std::sync::Arc;

use rust_decimal::Decimal;
use testresult::TestResult;
use wicker::{
    api::{ApiError, MockStorefrontApi},
    context::AppContext,
    domain::{
        cart::models::ServerCartLine,
        checkout::{
            PlaceOrderError,
            models::{
                Address, AddressId, AddressSelection, CheckoutPhase, OrderConfirmation,
                PromoDecision, ShippingMethod, ShippingMethodId,
            },
        },
        products::{ColorId, ProductId, SizeId},
    },
    identity::{FixedIdentity, IdentityProvider, UserId},
};

fn server_line(cart_item_id: u64, product: u64, quantity: u32, price: Decimal) -> ServerCartLine {
    ServerCartLine {
        cart_item_id: Some(cart_item_id.into()),
        product_id: ProductId::from_raw(product),
        color_id: ColorId::from_raw(1),
        size_id: SizeId::from_raw(1),
        quantity,
        unit_price: price,
        base_price: price,
    }
}

fn standard_shipping() -> ShippingMethod {
    ShippingMethod {
        method_id: ShippingMethodId::from_raw(1),
        name: "Standard".to_string(),
        cost: Decimal::new(4_50, 2),
        estimated_days: 3,
    }
}

fn saved_address(id: u64) -> Address {
    Address {
        address_id: AddressId::from_raw(id),
        recipient: "R. Fenwick".to_string(),
        line1: "12 Harbour Row".to_string(),
        line2: None,
        city: "Whitby".to_string(),
        postal_code: "YO21 1DN".to_string(),
        country: "GB".to_string(),
    }
}

fn signed_in() -> Arc<dyn IdentityProvider> {
    Arc::new(FixedIdentity::new(UserId::from_raw(1)))
}

fn two_lines() -> Vec<ServerCartLine> {
    vec![
        server_line(11, 1, 2, Decimal::new(50_00, 2)),
        server_line(12, 2, 1, Decimal::new(100_00, 2)),
    ]
}

#[tokio::test]
async fn happy_path_places_the_order_and_clears_the_cart() -> TestResult {
    let mut api = MockStorefrontApi::new();

    api.expect_fetch_cart().returning(|_| Ok(two_lines()));
    api.expect_fetch_checkout_cart().returning(|_| Ok(two_lines()));
    api.expect_fetch_shipping_methods()
        .returning(|| Ok(vec![standard_shipping()]));
    api.expect_fetch_addresses()
        .returning(|_| Ok(vec![saved_address(55)]));
    api.expect_apply_promo().returning(|_, request| {
        Ok(PromoDecision {
            applied: true,
            discount_amount: request.cart_subtotal / Decimal::new(10, 0),
            message: "10% off applied".to_string(),
        })
    });
    api.expect_create_order()
        .withf(|user, method, address| {
            *user == UserId::from_raw(1)
                && *method == ShippingMethodId::from_raw(1)
                && *address == AddressId::from_raw(55)
        })
        .times(1)
        .returning(|_, _, _| {
            Ok(OrderConfirmation {
                order_number: "WK-1001".to_string(),
            })
        });
    api.expect_clear_cart().times(1).returning(|_| Ok(()));

    let ctx = AppContext::new(Arc::new(api), signed_in(), None);
    let mut checkout = ctx.checkout();

    checkout.load().await?;

    assert_eq!(checkout.phase(), CheckoutPhase::Ready);
    assert_eq!(checkout.items().len(), 2);
    assert_eq!(
        checkout.selected_method(),
        Some(ShippingMethodId::from_raw(1)),
        "the first shipping method is the default"
    );
    assert_eq!(
        checkout.address(),
        &AddressSelection::Saved(AddressId::from_raw(55)),
        "the first saved address is selected"
    );

    // The shared store now reflects the same truth checkout works from.
    assert_eq!(ctx.cart.state().item_count, 3);

    checkout.apply_promo("save10").await?;

    let totals = checkout.totals();
    assert_eq!(totals.subtotal, Decimal::new(200_00, 2));
    assert_eq!(totals.discount, Decimal::new(20_00, 2));
    assert_eq!(totals.shipping, Decimal::new(4_50, 2));
    assert_eq!(totals.tax, Decimal::new(27_00, 2));
    assert_eq!(totals.total, Decimal::new(211_50, 2));

    let confirmation = checkout.place_order().await?;

    assert_eq!(confirmation.order_number, "WK-1001");
    assert_eq!(checkout.phase(), CheckoutPhase::Succeeded);
    assert!(
        ctx.cart.state().lines.is_empty(),
        "the shared cart clears on success"
    );

    Ok(())
}

#[tokio::test]
async fn external_cart_change_withholds_the_order_and_reloads() -> TestResult {
    let one_line = || vec![server_line(11, 1, 2, Decimal::new(50_00, 2))];

    let mut api = MockStorefrontApi::new();

    // Initial load syncs against the two-line cart...
    api.expect_fetch_cart().times(2).returning(|_| Ok(two_lines()));
    // ...while the reload after divergence sees only one line.
    api.expect_fetch_cart().times(2).returning(move |_| Ok(one_line()));

    // Working set at load, then the gate's read after another tab removed a
    // line, then the reload's working set.
    api.expect_fetch_checkout_cart()
        .times(1)
        .returning(|_| Ok(two_lines()));
    api.expect_fetch_checkout_cart()
        .times(1)
        .returning(move |_| Ok(one_line()));
    api.expect_fetch_checkout_cart()
        .times(1)
        .returning(move |_| Ok(one_line()));

    api.expect_fetch_shipping_methods()
        .times(2)
        .returning(|| Ok(vec![standard_shipping()]));
    api.expect_fetch_addresses()
        .times(2)
        .returning(|_| Ok(vec![saved_address(55)]));

    // The reload's sync tries to push the locally remembered line back and
    // the server refuses; the routine tolerates it.
    api.expect_add_cart_item()
        .returning(|_, _| Err(ApiError::Rejected("insufficient stock".to_string())));

    // No create_order expectation: placement reaching the server would fail
    // this test with an unexpected-call panic.

    let ctx = AppContext::new(Arc::new(api), signed_in(), None);
    let mut checkout = ctx.checkout();

    checkout.load().await?;
    assert_eq!(checkout.items().len(), 2);

    let result = checkout.place_order().await;

    assert!(
        matches!(result, Err(PlaceOrderError::CartChanged)),
        "expected CartChanged, got {result:?}"
    );
    assert_eq!(
        checkout.phase(),
        CheckoutPhase::Ready,
        "the reload re-established a placeable state"
    );
    assert_eq!(
        checkout.items().len(),
        1,
        "the working set reflects the external removal"
    );

    Ok(())
}

#[tokio::test]
async fn rejected_order_returns_checkout_to_ready() -> TestResult {
    let mut api = MockStorefrontApi::new();

    api.expect_fetch_cart().returning(|_| Ok(two_lines()));
    api.expect_fetch_checkout_cart().returning(|_| Ok(two_lines()));
    api.expect_fetch_shipping_methods()
        .returning(|| Ok(vec![standard_shipping()]));
    api.expect_fetch_addresses()
        .returning(|_| Ok(vec![saved_address(55)]));
    api.expect_create_order().times(1).returning(|_, _, _| {
        Err(ApiError::Order {
            message: "payment declined".to_string(),
            error_type: Some("PAYMENT".to_string()),
        })
    });

    let ctx = AppContext::new(Arc::new(api), signed_in(), None);
    let mut checkout = ctx.checkout();

    checkout.load().await?;

    let result = checkout.place_order().await;

    match result {
        Err(PlaceOrderError::Rejected {
            message,
            error_type,
        }) => {
            assert_eq!(message, "payment declined");
            assert_eq!(error_type.as_deref(), Some("PAYMENT"));
        }
        other => return Err(format!("expected Rejected, got {other:?}").into()),
    }

    assert_eq!(
        checkout.phase(),
        CheckoutPhase::Ready,
        "a failed placement is retryable"
    );
    assert!(
        !ctx.cart.state().lines.is_empty(),
        "the cart is only cleared on success"
    );

    Ok(())
}

#[tokio::test]
async fn new_address_is_persisted_before_the_gate() -> TestResult {
    use wicker::domain::checkout::models::NewAddress;

    let mut api = MockStorefrontApi::new();

    api.expect_fetch_cart().returning(|_| Ok(two_lines()));
    api.expect_fetch_checkout_cart().returning(|_| Ok(two_lines()));
    api.expect_fetch_shipping_methods()
        .returning(|| Ok(vec![standard_shipping()]));
    // No saved addresses: checkout defaults to the new-address form.
    api.expect_fetch_addresses().returning(|_| Ok(vec![]));
    api.expect_create_address()
        .withf(|_, address| address.city == "Whitby")
        .times(1)
        .returning(|_, _| Ok(AddressId::from_raw(77)));
    api.expect_create_order()
        .withf(|_, _, address| *address == AddressId::from_raw(77))
        .times(1)
        .returning(|_, _, _| {
            Ok(OrderConfirmation {
                order_number: "WK-1002".to_string(),
            })
        });
    api.expect_clear_cart().returning(|_| Ok(()));

    let ctx = AppContext::new(Arc::new(api), signed_in(), None);
    let mut checkout = ctx.checkout();

    checkout.load().await?;
    assert!(matches!(checkout.address(), AddressSelection::New(_)));

    checkout.enter_new_address(NewAddress {
        recipient: "R. Fenwick".to_string(),
        line1: "12 Harbour Row".to_string(),
        line2: None,
        city: "Whitby".to_string(),
        postal_code: "YO21 1DN".to_string(),
        country: "GB".to_string(),
    });

    let confirmation = checkout.place_order().await?;

    assert_eq!(confirmation.order_number, "WK-1002");
    assert_eq!(
        checkout.address(),
        &AddressSelection::Saved(AddressId::from_raw(77)),
        "the persisted address becomes the selection"
    );

    Ok(())
}
