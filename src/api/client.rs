//! Storefront HTTP client.

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Client, Response, StatusCode};

use crate::{
    api::{
        errors::ApiError,
        records::{
            AddCartItemRequest, AddCartItemResponse, AddressRecord, CartEnvelope,
            CreateAddressResponse, CreateOrderRequest, CreateOrderResponse, FailureRecord,
            ListEnvelope, NewAddressRecord, ProductDetailRecord, PromoDecisionRecord,
            PromoRequestRecord, ShippingMethodRecord,
        },
    },
    domain::{
        cart::models::{CartItemId, NewCartItem, ServerCartLine},
        checkout::models::{
            Address, AddressId, NewAddress, OrderConfirmation, PromoDecision, PromoRequest,
            ShippingMethod, ShippingMethodId,
        },
        products::{ProductDetail, ProductId},
    },
    identity::UserId,
};

/// Configuration for connecting to the storefront API.
#[derive(Debug, Clone)]
pub struct StorefrontApiConfig {
    /// API root, e.g. `"http://localhost:8000/api"`.
    pub base_url: String,
}

/// HTTP implementation of [`StorefrontApi`] over the REST-ish JSON API.
#[derive(Debug, Clone)]
pub struct HttpStorefrontApi {
    config: StorefrontApiConfig,
    http: Client,
}

impl HttpStorefrontApi {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: StorefrontApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }
}

/// Map a non-2xx response into the error taxonomy.
///
/// 401/403 become [`ApiError::Unauthorized`]; any body carrying a `message`
/// becomes a business rejection; everything else is an unexpected response.
async fn failure(response: Response) -> ApiError {
    let status = response.status();

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return ApiError::Unauthorized;
    }

    let text = response.text().await.unwrap_or_default();

    if let Ok(FailureRecord {
        message: Some(message),
    }) = serde_json::from_str(&text)
    {
        return ApiError::Rejected(message);
    }

    ApiError::UnexpectedResponse(format!("status {status}: {text}"))
}

#[async_trait]
impl StorefrontApi for HttpStorefrontApi {
    async fn add_cart_item(
        &self,
        user: UserId,
        item: NewCartItem,
    ) -> Result<Option<ServerCartLine>, ApiError> {
        let response = self
            .http
            .post(self.url("/cart/items"))
            .json(&AddCartItemRequest::new(user, item))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let parsed: AddCartItemResponse = response.json().await?;

        if parsed.success == Some(false) {
            return Err(ApiError::Rejected(parsed.message.unwrap_or_else(|| {
                "the item could not be added to the cart".to_string()
            })));
        }

        Ok(parsed.item.map(Into::into))
    }

    async fn fetch_cart(&self, user: UserId) -> Result<Vec<ServerCartLine>, ApiError> {
        let response = self
            .http
            .get(self.url("/cart"))
            .query(&[("userId", user.into_raw())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        response.json::<CartEnvelope>().await?.into_lines()
    }

    async fn set_item_quantity(&self, item: CartItemId, quantity: u32) -> Result<(), ApiError> {
        let response = self
            .http
            .put(self.url(&format!("/cart/items/{item}")))
            .query(&[("quantity", quantity)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        Ok(())
    }

    async fn delete_cart_item(&self, item: CartItemId) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url(&format!("/cart/items/{item}")))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        Ok(())
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url("/cart"))
            .query(&[("userId", user.into_raw())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        Ok(())
    }

    async fn fetch_product_detail(&self, product: ProductId) -> Result<ProductDetail, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/products/{product}/detail")))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let record: ProductDetailRecord = response.json().await?;

        Ok(record.into())
    }

    async fn fetch_shipping_methods(&self) -> Result<Vec<ShippingMethod>, ApiError> {
        let response = self.http.get(self.url("/shipping/methods")).send().await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let methods = response
            .json::<ListEnvelope<ShippingMethodRecord>>()
            .await?
            .into_items("shipping methods")?;

        Ok(methods.into_iter().map(Into::into).collect())
    }

    async fn fetch_addresses(&self, user: UserId) -> Result<Vec<Address>, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/users/{user}/addresses")))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let addresses = response
            .json::<ListEnvelope<AddressRecord>>()
            .await?
            .into_items("addresses")?;

        Ok(addresses.into_iter().map(Into::into).collect())
    }

    async fn create_address(
        &self,
        user: UserId,
        address: NewAddress,
    ) -> Result<AddressId, ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/users/{user}/addresses")))
            .json(&NewAddressRecord::from(&address))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let created: CreateAddressResponse = response.json().await?;

        Ok(created.address_id.into())
    }

    async fn apply_promo(
        &self,
        user: UserId,
        request: PromoRequest,
    ) -> Result<PromoDecision, ApiError> {
        let response = self
            .http
            .post(self.url("/promotions/apply"))
            .json(&PromoRequestRecord::new(user, request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let decision: PromoDecisionRecord = response.json().await?;

        Ok(decision.into())
    }

    async fn create_order(
        &self,
        user: UserId,
        method: ShippingMethodId,
        address: AddressId,
    ) -> Result<OrderConfirmation, ApiError> {
        let response = self
            .http
            .post(self.url("/orders"))
            .json(&CreateOrderRequest {
                user_id: user.into_raw(),
                shipping_method_id: method.into_raw(),
                shipping_address_id: address.into_raw(),
            })
            .send()
            .await?;

        let status = response.status();

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ApiError::Unauthorized);
        }

        // Failed orders come back as `{error, errorType}` with either a 2xx
        // or a 4xx status, so the body shape decides before the status does.
        let text = response.text().await.unwrap_or_default();

        if let Ok(parsed) = serde_json::from_str::<CreateOrderResponse>(&text) {
            return parsed.into_confirmation();
        }

        Err(ApiError::UnexpectedResponse(format!(
            "order creation returned status {status}: {text}"
        )))
    }

    async fn fetch_checkout_cart(&self, user: UserId) -> Result<Vec<ServerCartLine>, ApiError> {
        let response = self
            .http
            .get(self.url("/checkout/cart"))
            .query(&[("userId", user.into_raw())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        response.json::<CartEnvelope>().await?.into_lines()
    }
}

#[automock]
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// Add a line to the user's server cart; the server validates stock and
    /// business rules. Echoes the created line when the wire shape carries it.
    async fn add_cart_item(
        &self,
        user: UserId,
        item: NewCartItem,
    ) -> Result<Option<ServerCartLine>, ApiError>;

    /// Fetch the user's cart of record.
    async fn fetch_cart(&self, user: UserId) -> Result<Vec<ServerCartLine>, ApiError>;

    /// Set a line's quantity to an absolute value.
    async fn set_item_quantity(&self, item: CartItemId, quantity: u32) -> Result<(), ApiError>;

    /// Delete one line from the server cart.
    async fn delete_cart_item(&self, item: CartItemId) -> Result<(), ApiError>;

    /// Empty the user's server cart.
    async fn clear_cart(&self, user: UserId) -> Result<(), ApiError>;

    /// Fetch the full variant tree for a product.
    async fn fetch_product_detail(&self, product: ProductId) -> Result<ProductDetail, ApiError>;

    /// Fetch the available shipping methods.
    async fn fetch_shipping_methods(&self) -> Result<Vec<ShippingMethod>, ApiError>;

    /// Fetch the user's saved addresses.
    async fn fetch_addresses(&self, user: UserId) -> Result<Vec<Address>, ApiError>;

    /// Persist a new address, returning its server-assigned id.
    async fn create_address(&self, user: UserId, address: NewAddress)
    -> Result<AddressId, ApiError>;

    /// Evaluate a promo code against the current cart contents.
    async fn apply_promo(
        &self,
        user: UserId,
        request: PromoRequest,
    ) -> Result<PromoDecision, ApiError>;

    /// Create an order from the server's authoritative cart. The line items
    /// are never sent; only the shipping choices are.
    async fn create_order(
        &self,
        user: UserId,
        method: ShippingMethodId,
        address: AddressId,
    ) -> Result<OrderConfirmation, ApiError>;

    /// Fetch the cart snapshot checkout works from.
    async fn fetch_checkout_cart(&self, user: UserId) -> Result<Vec<ServerCartLine>, ApiError>;
}
