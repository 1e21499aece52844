//! Checkout Models

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::{
    domain::{
        cart::models::{CartItemId, ServerCartLine, VariantKey},
        products::{ColorId, ProductId, SizeId},
    },
    ids::TypedId,
};

/// Shipping Method Id
pub type ShippingMethodId = TypedId<ShippingMethod>;

/// Shipping Method Model
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingMethod {
    pub method_id: ShippingMethodId,
    pub name: String,
    pub cost: Decimal,
    pub estimated_days: u32,
}

/// Address Id
pub type AddressId = TypedId<Address>;

/// Saved Address Model
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub address_id: AddressId,
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// New Address Model
///
/// The form a user fills when none of their saved addresses fits. Persisted
/// just before order placement to obtain a server-assigned id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewAddress {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl NewAddress {
    /// Whether every required field has been filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.recipient.trim().is_empty()
            && !self.line1.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.postal_code.trim().is_empty()
            && !self.country.trim().is_empty()
    }
}

/// Which shipping address the order will use.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressSelection {
    /// A saved address, by server-assigned id.
    Saved(AddressId),
    /// A new address being entered; persisted at order placement.
    New(NewAddress),
}

impl Default for AddressSelection {
    fn default() -> Self {
        Self::New(NewAddress::default())
    }
}

/// Promo Application Model
///
/// Checkout-scoped and ephemeral: the server's stated discount, never
/// re-derived locally, cleared without a server call on removal.
#[derive(Debug, Clone, PartialEq)]
pub struct PromoApplication {
    pub code: String,
    pub discount_amount: Decimal,
    pub message: String,
}

/// Promo Request Model
#[derive(Debug, Clone, PartialEq)]
pub struct PromoRequest {
    pub code: String,
    pub product_quantities: FxHashMap<ProductId, u32>,
    pub cart_subtotal: Decimal,
}

/// Promo Decision Model
///
/// What the promo-evaluation endpoint returned; `applied: false` carries the
/// reason in `message`.
#[derive(Debug, Clone, PartialEq)]
pub struct PromoDecision {
    pub applied: bool,
    pub discount_amount: Decimal,
    pub message: String,
}

/// Order Confirmation Model
#[derive(Debug, Clone, PartialEq)]
pub struct OrderConfirmation {
    pub order_number: String,
}

/// Checkout Item Model
///
/// One line of checkout's working set, mapped from the authoritative server
/// snapshot. Carries the base price because checkout totals are computed from
/// it at this stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutItem {
    pub cart_item_id: Option<CartItemId>,
    pub product_id: ProductId,
    pub color_id: ColorId,
    pub size_id: SizeId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub base_price: Decimal,
}

impl CheckoutItem {
    /// The `(product, colour, size)` key of this item.
    #[must_use]
    pub fn variant_key(&self) -> VariantKey {
        VariantKey {
            product_id: self.product_id,
            color_id: self.color_id,
            size_id: self.size_id,
        }
    }
}

impl From<&ServerCartLine> for CheckoutItem {
    fn from(line: &ServerCartLine) -> Self {
        Self {
            cart_item_id: line.cart_item_id,
            product_id: line.product_id,
            color_id: line.color_id,
            size_id: line.size_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            base_price: line.base_price,
        }
    }
}

/// Derived money amounts for the checkout screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckoutTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Checkout Phase
///
/// Linear: `Loading → Ready → PlacingOrder → Succeeded`, with a failed
/// placement falling back to `Ready`. There are no backward transitions other
/// than a fresh load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutPhase {
    /// Checkout data is being established; nothing can be placed yet.
    #[default]
    Loading,
    /// The working set is authoritative and an order can be attempted.
    Ready,
    /// An order placement is in flight.
    PlacingOrder,
    /// The order was created; the cart has been cleared.
    Succeeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_address_completeness() {
        let mut address = NewAddress {
            recipient: "R. Fenwick".to_string(),
            line1: "12 Harbour Row".to_string(),
            line2: None,
            city: "Whitby".to_string(),
            postal_code: "YO21 1DN".to_string(),
            country: "GB".to_string(),
        };

        assert!(address.is_complete());

        address.city = "   ".to_string();
        assert!(!address.is_complete());
    }

    #[test]
    fn default_address_selection_is_an_empty_form() {
        match AddressSelection::default() {
            AddressSelection::New(form) => assert!(!form.is_complete()),
            AddressSelection::Saved(_) => unreachable!("default must be a new-address form"),
        }
    }
}
