//! Cart Models

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::products::{ColorId, ProductId, SizeId},
    ids::TypedId,
};

/// Server-issued handle for one cart line; required to mutate or delete that
/// line with an absolute-quantity call.
pub type CartItemId = TypedId<ServerCartLine>;

/// The natural key a cart line is diffed by: one purchasable variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub product_id: ProductId,
    pub color_id: ColorId,
    pub size_id: SizeId,
}

/// Cart Line Model
///
/// A locally-identified entry: this variant, this many times. `local_id` is
/// client-generated and meaningless to the server; `server_item_id` is the
/// server's handle for the same line, carried once known.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub local_id: Uuid,
    pub product_id: ProductId,
    pub color_id: ColorId,
    pub size_id: SizeId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub server_item_id: Option<CartItemId>,
}

impl CartLine {
    /// The `(product, colour, size)` key this line is reconciled by.
    #[must_use]
    pub fn variant_key(&self) -> VariantKey {
        VariantKey {
            product_id: self.product_id,
            color_id: self.color_id,
            size_id: self.size_id,
        }
    }

    /// `unit_price × quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Remap a server line into the local shape, minting a fresh local id and
    /// keeping the server handle.
    #[must_use]
    pub fn from_server(line: &ServerCartLine) -> Self {
        Self {
            local_id: Uuid::now_v7(),
            product_id: line.product_id,
            color_id: line.color_id,
            size_id: line.size_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            server_item_id: line.cart_item_id,
        }
    }
}

/// Server Cart Line Model
///
/// The server's view of a line. Every line the server returns is ground
/// truth; `cart_item_id` should always be present, but the wire does not
/// guarantee it, and a line without it cannot be corrected in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerCartLine {
    pub cart_item_id: Option<CartItemId>,
    pub product_id: ProductId,
    pub color_id: ColorId,
    pub size_id: SizeId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub base_price: Decimal,
}

impl ServerCartLine {
    /// The `(product, colour, size)` key this line is reconciled by.
    #[must_use]
    pub fn variant_key(&self) -> VariantKey {
        VariantKey {
            product_id: self.product_id,
            color_id: self.color_id,
            size_id: self.size_id,
        }
    }
}

/// New Cart Item Model
///
/// The payload of a server-side "add item" call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub color_id: ColorId,
    pub size_id: SizeId,
    pub quantity: u32,
}

/// Cart State Model
///
/// The aggregate the store holds: lines plus totals derived from them.
/// `subtotal` and `item_count` are never set independently; every mutation
/// path recomputes both from the line list. `is_open` is a presentation
/// signal only and takes no part in any correctness property.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartState {
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
    pub item_count: u32,
    pub is_open: bool,
}

impl CartState {
    /// Recompute `subtotal` and `item_count` from the current line list.
    pub fn recompute_totals(&mut self) {
        self.subtotal = self.lines.iter().map(CartLine::line_total).sum();
        self.item_count = self.lines.iter().map(|line| line.quantity).sum();
    }
}
