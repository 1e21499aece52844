//! Product Models

use rust_decimal::Decimal;

use crate::ids::TypedId;

/// Product Id
pub type ProductId = TypedId<Product>;

/// Colour variant Id
pub type ColorId = TypedId<ColorVariant>;

/// Size variant Id
pub type SizeId = TypedId<SizeVariant>;

/// Product Model
///
/// The listing-level view of a purchasable product. Prices are kept as
/// decimals in the store currency; `sale_price` is present only while the
/// product is discounted.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub base_price: Decimal,
    pub sale_price: Option<Decimal>,
}

impl Product {
    /// The price a cart line snapshots when this product is added: the sale
    /// price when one is set, the base price otherwise.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.base_price)
    }
}

/// Product Detail Model
///
/// The full variant tree for one product, fetched when a caller adds a
/// product without specifying a colour or size.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetail {
    pub product: Product,
    pub colors: Vec<ColorVariant>,
}

/// Colour Variant Model
#[derive(Debug, Clone, PartialEq)]
pub struct ColorVariant {
    pub color_id: ColorId,
    pub name: String,
    pub sizes: Vec<SizeVariant>,
}

/// Size Variant Model
#[derive(Debug, Clone, PartialEq)]
pub struct SizeVariant {
    pub size_id: SizeId,
    pub label: String,
    pub in_stock: bool,
}

impl ColorVariant {
    /// First size of this colour that is in stock.
    pub fn first_available_size(&self) -> Option<SizeId> {
        self.sizes
            .iter()
            .find(|size| size.in_stock)
            .map(|size| size.size_id)
    }
}

impl ProductDetail {
    /// Fill in whichever of `color`/`size` the caller omitted.
    ///
    /// An omitted colour resolves to the first colour with an in-stock size;
    /// an omitted size resolves to the first in-stock size of the chosen
    /// colour. Returns `None` when no such combination exists, in which case
    /// the add must fail without touching any state.
    pub fn resolve_variant(
        &self,
        color: Option<ColorId>,
        size: Option<SizeId>,
    ) -> Option<(ColorId, SizeId)> {
        let color_variant = match color {
            Some(id) => self.colors.iter().find(|c| c.color_id == id)?,
            None => self
                .colors
                .iter()
                .find(|c| c.first_available_size().is_some())?,
        };

        let size = match size {
            Some(id) => color_variant
                .sizes
                .iter()
                .find(|s| s.size_id == id)
                .map(|s| s.size_id)?,
            None => color_variant.first_available_size()?,
        };

        Some((color_variant.color_id, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail_with_variants() -> ProductDetail {
        ProductDetail {
            product: Product {
                id: ProductId::from_raw(10),
                name: "Waxed Jacket".to_string(),
                base_price: Decimal::new(120_00, 2),
                sale_price: None,
            },
            colors: vec![
                ColorVariant {
                    color_id: ColorId::from_raw(1),
                    name: "Olive".to_string(),
                    sizes: vec![SizeVariant {
                        size_id: SizeId::from_raw(7),
                        label: "M".to_string(),
                        in_stock: false,
                    }],
                },
                ColorVariant {
                    color_id: ColorId::from_raw(2),
                    name: "Navy".to_string(),
                    sizes: vec![
                        SizeVariant {
                            size_id: SizeId::from_raw(7),
                            label: "M".to_string(),
                            in_stock: true,
                        },
                        SizeVariant {
                            size_id: SizeId::from_raw(8),
                            label: "L".to_string(),
                            in_stock: true,
                        },
                    ],
                },
            ],
        }
    }

    #[test]
    fn effective_price_prefers_sale_price() {
        let mut product = Product {
            id: ProductId::from_raw(1),
            name: "Tee".to_string(),
            base_price: Decimal::new(25_00, 2),
            sale_price: Some(Decimal::new(19_00, 2)),
        };

        assert_eq!(product.effective_price(), Decimal::new(19_00, 2));

        product.sale_price = None;
        assert_eq!(product.effective_price(), Decimal::new(25_00, 2));
    }

    #[test]
    fn resolve_variant_skips_out_of_stock_colors() {
        let detail = detail_with_variants();

        let resolved = detail.resolve_variant(None, None);

        assert_eq!(
            resolved,
            Some((ColorId::from_raw(2), SizeId::from_raw(7))),
            "first colour has no stock, so the second should be chosen"
        );
    }

    #[test]
    fn resolve_variant_keeps_explicit_color() {
        let detail = detail_with_variants();

        let resolved = detail.resolve_variant(Some(ColorId::from_raw(2)), None);

        assert_eq!(resolved, Some((ColorId::from_raw(2), SizeId::from_raw(7))));
    }

    #[test]
    fn resolve_variant_with_no_stock_anywhere_is_none() {
        let mut detail = detail_with_variants();
        for color in &mut detail.colors {
            for size in &mut color.sizes {
                size.in_stock = false;
            }
        }

        assert_eq!(detail.resolve_variant(None, None), None);
    }

    #[test]
    fn resolve_variant_unknown_color_is_none() {
        let detail = detail_with_variants();

        assert_eq!(detail.resolve_variant(Some(ColorId::from_raw(99)), None), None);
    }
}
