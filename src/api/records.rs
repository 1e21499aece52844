//! Storefront API wire records.
//!
//! The remote API is duck-typed: cart payloads arrive either wrapped in
//! `{success, data}` or as bare arrays, ids are sometimes spelled `colourId`,
//! and optional fields come and go. Every known shape is normalized here,
//! once, into the canonical domain models; nothing past this module guesses
//! at wire shapes.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    api::errors::ApiError,
    domain::{
        cart::models::{NewCartItem, ServerCartLine},
        checkout::models::{
            Address, NewAddress, OrderConfirmation, PromoDecision, PromoRequest, ShippingMethod,
        },
        products::{ColorVariant, Product, ProductDetail, SizeVariant},
    },
    identity::UserId,
};

/// One cart line as the server sends it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartLineRecord {
    #[serde(default)]
    pub cart_item_id: Option<u64>,
    pub product_id: u64,
    #[serde(alias = "colourId")]
    pub color_id: u64,
    pub size_id: u64,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub base_price: Option<Decimal>,
}

impl From<CartLineRecord> for ServerCartLine {
    fn from(record: CartLineRecord) -> Self {
        Self {
            cart_item_id: record.cart_item_id.map(Into::into),
            product_id: record.product_id.into(),
            color_id: record.color_id.into(),
            size_id: record.size_id.into(),
            quantity: record.quantity,
            unit_price: record.unit_price,
            // A payload without a base price is an older line shape where the
            // unit price was the only price recorded.
            base_price: record.base_price.unwrap_or(record.unit_price),
        }
    }
}

/// The shapes a cart payload is known to arrive in.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CartEnvelope {
    Wrapped {
        success: bool,
        data: CartEnvelopeData,
    },
    Flat {
        items: Vec<CartLineRecord>,
    },
    Bare(Vec<CartLineRecord>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartEnvelopeData {
    pub items: Vec<CartLineRecord>,
}

impl CartEnvelope {
    pub(crate) fn into_lines(self) -> Result<Vec<ServerCartLine>, ApiError> {
        let records = match self {
            Self::Wrapped { success: false, .. } => {
                return Err(ApiError::UnexpectedResponse(
                    "cart payload reported failure".to_string(),
                ));
            }
            Self::Wrapped { data, .. } => data.items,
            Self::Flat { items } => items,
            Self::Bare(items) => items,
        };

        Ok(records.into_iter().map(Into::into).collect())
    }
}

/// Lists (shipping methods, addresses) arrive bare or `{success, data}`-wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Wrapped { success: bool, data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_items(self, what: &str) -> Result<Vec<T>, ApiError> {
        match self {
            Self::Wrapped { success: false, .. } => Err(ApiError::UnexpectedResponse(format!(
                "{what} payload reported failure"
            ))),
            Self::Wrapped { data, .. } => Ok(data),
            Self::Bare(items) => Ok(items),
        }
    }
}

/// Body of the "add cart line" call. The endpoint spells the colour id the
/// British way.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddCartItemRequest {
    pub user_id: u64,
    pub product_id: u64,
    #[serde(rename = "colourId")]
    pub color_id: u64,
    pub size_id: u64,
    pub quantity: u32,
}

impl AddCartItemRequest {
    pub(crate) fn new(user: UserId, item: NewCartItem) -> Self {
        Self {
            user_id: user.into_raw(),
            product_id: item.product_id.into_raw(),
            color_id: item.color_id.into_raw(),
            size_id: item.size_id.into_raw(),
            quantity: item.quantity,
        }
    }
}

/// Response of the "add cart line" call: a success flag, a message on
/// rejection, and sometimes the created line echoed back.
#[derive(Debug, Deserialize)]
pub(crate) struct AddCartItemResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub item: Option<CartLineRecord>,
}

/// A 4xx body carrying a server message.
#[derive(Debug, Deserialize)]
pub(crate) struct FailureRecord {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ShippingMethodRecord {
    pub method_id: u64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    pub estimated_days: u32,
}

impl From<ShippingMethodRecord> for ShippingMethod {
    fn from(record: ShippingMethodRecord) -> Self {
        Self {
            method_id: record.method_id.into(),
            name: record.name,
            cost: record.cost,
            estimated_days: record.estimated_days,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddressRecord {
    pub address_id: u64,
    pub recipient: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl From<AddressRecord> for Address {
    fn from(record: AddressRecord) -> Self {
        Self {
            address_id: record.address_id.into(),
            recipient: record.recipient,
            line1: record.line1,
            line2: record.line2,
            city: record.city,
            postal_code: record.postal_code,
            country: record.country,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewAddressRecord {
    pub recipient: String,
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl From<&NewAddress> for NewAddressRecord {
    fn from(address: &NewAddress) -> Self {
        Self {
            recipient: address.recipient.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateAddressResponse {
    pub address_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductDetailRecord {
    pub id: u64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub colors: Vec<ColorVariantRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ColorVariantRecord {
    #[serde(alias = "colourId")]
    pub color_id: u64,
    pub name: String,
    #[serde(default)]
    pub sizes: Vec<SizeVariantRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SizeVariantRecord {
    pub size_id: u64,
    pub label: String,
    pub in_stock: bool,
}

impl From<ProductDetailRecord> for ProductDetail {
    fn from(record: ProductDetailRecord) -> Self {
        Self {
            product: Product {
                id: record.id.into(),
                name: record.name,
                base_price: record.base_price,
                sale_price: record.sale_price,
            },
            colors: record
                .colors
                .into_iter()
                .map(|color| ColorVariant {
                    color_id: color.color_id.into(),
                    name: color.name,
                    sizes: color
                        .sizes
                        .into_iter()
                        .map(|size| SizeVariant {
                            size_id: size.size_id.into(),
                            label: size.label,
                            in_stock: size.in_stock,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromoRequestRecord {
    pub code: String,
    pub user_id: u64,
    pub product_quantities: BTreeMap<String, u32>,
    #[serde(with = "rust_decimal::serde::float")]
    pub cart_subtotal: Decimal,
}

impl PromoRequestRecord {
    pub(crate) fn new(user: UserId, request: PromoRequest) -> Self {
        Self {
            code: request.code,
            user_id: user.into_raw(),
            product_quantities: request
                .product_quantities
                .into_iter()
                .map(|(product, quantity)| (product.into_raw().to_string(), quantity))
                .collect(),
            cart_subtotal: request.cart_subtotal,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromoDecisionRecord {
    pub applied: bool,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_amount: Option<Decimal>,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<PromoDecisionRecord> for PromoDecision {
    fn from(record: PromoDecisionRecord) -> Self {
        Self {
            applied: record.applied,
            discount_amount: record.discount_amount.unwrap_or(Decimal::ZERO),
            message: record.message.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrderRequest {
    pub user_id: u64,
    pub shipping_method_id: u64,
    pub shipping_address_id: u64,
}

/// Order creation answers with either the confirmation or an error record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreateOrderResponse {
    Created {
        #[serde(rename = "orderNumber")]
        order_number: String,
    },
    Failed {
        error: String,
        #[serde(rename = "errorType", default)]
        error_type: Option<String>,
    },
}

impl CreateOrderResponse {
    pub(crate) fn into_confirmation(self) -> Result<OrderConfirmation, ApiError> {
        match self {
            Self::Created { order_number } => Ok(OrderConfirmation { order_number }),
            Self::Failed { error, error_type } => Err(ApiError::Order {
                message: error,
                error_type,
            }),
        }
    }
}
