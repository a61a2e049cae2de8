//! Kroger public API client: product search and cart endpoints.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use listcart_core::{ApiError, Cart, CartApi, CartLine, CatalogSearch, Product, PurchasableUnit};

use crate::credentials::CredentialStore;

pub const DEFAULT_BASE_URL: &str = "https://api.kroger.com/v1";

#[derive(Debug, Clone)]
pub struct KrogerConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for KrogerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct KrogerClient {
    config: KrogerConfig,
    credentials: Arc<CredentialStore>,
    agent: ureq::Agent,
}

impl KrogerClient {
    pub fn new(config: KrogerConfig, credentials: Arc<CredentialStore>) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(config.timeout))
                .build(),
        );
        Self {
            config,
            credentials,
            agent,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn bearer(&self) -> Result<String, ApiError> {
        self.credentials
            .get()
            .map(|token| format!("Bearer {}", token))
            .ok_or(ApiError::NotAuthenticated)
    }

    /// Run a blocking request off the async runtime. A 401 forgets the
    /// stored token.
    async fn run<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(ureq::Agent) -> Result<T, ApiError> + Send + 'static,
    {
        let agent = self.agent.clone();
        let result = tokio::task::spawn_blocking(move || call(agent))
            .await
            .map_err(|e| ApiError::Transport(format!("task join error: {}", e)))?;
        if let Err(ApiError::Unauthorized) = &result {
            self.credentials.clear();
        }
        result
    }
}

#[async_trait]
impl CatalogSearch for KrogerClient {
    async fn search(
        &self,
        term: &str,
        location_id: &str,
        limit: usize,
    ) -> Result<Vec<Product>, ApiError> {
        let auth = self.bearer()?;
        let url = self.url("products");
        let term = term.to_string();
        let location_id = location_id.to_string();
        let limit = limit.to_string();

        let envelope: ProductsEnvelope = self
            .run(move |agent| {
                let response = agent
                    .get(&url)
                    .header("Authorization", &auth)
                    .header("Accept", "application/json")
                    .query("filter.term", &term)
                    .query("filter.locationId", &location_id)
                    .query("filter.limit", &limit)
                    .call()
                    .map_err(|e| map_error(e, "products"))?;
                response
                    .into_body()
                    .read_json()
                    .map_err(|e| ApiError::Decode(e.to_string()))
            })
            .await?;

        let products: Vec<Product> = envelope.data.into_iter().map(Product::from).collect();
        tracing::debug!(count = products.len(), "catalog search returned");
        Ok(products)
    }
}

#[async_trait]
impl CartApi for KrogerClient {
    async fn get_cart(&self) -> Result<Cart, ApiError> {
        let auth = self.bearer()?;
        let url = self.url("carts");

        let envelope: CartEnvelope = self
            .run(move |agent| {
                let response = agent
                    .get(&url)
                    .header("Authorization", &auth)
                    .header("Accept", "application/json")
                    .call()
                    .map_err(|e| map_error(e, "cart"))?;
                response
                    .into_body()
                    .read_json()
                    .map_err(|e| ApiError::Decode(e.to_string()))
            })
            .await?;

        envelope
            .into_cart()
            .ok_or_else(|| ApiError::NotFound("cart".to_string()))
    }

    async fn update_cart(&self, product_id: &str, quantity: u32) -> Result<(), ApiError> {
        let auth = self.bearer()?;
        let url = self.url("cart/add");
        let body = CartUpdateRequest {
            items: vec![CartItemRequest {
                upc: product_id.to_string(),
                quantity,
            }],
        };

        self.run(move |agent| {
            agent
                .put(&url)
                .header("Authorization", &auth)
                .send_json(&body)
                .map_err(|e| map_error(e, "cart"))?;
            Ok(())
        })
        .await
    }

    async fn remove_item(&self, cart_id: &str, product_id: &str) -> Result<(), ApiError> {
        let auth = self.bearer()?;
        let url = self.url(&format!("carts/{}/items/{}", cart_id, product_id));
        let what = product_id.to_string();

        self.run(move |agent| {
            agent
                .delete(&url)
                .header("Authorization", &auth)
                .call()
                .map_err(|e| map_error(e, &what))?;
            Ok(())
        })
        .await
    }
}

/// Map a transport error to the shared taxonomy.
pub fn map_error(err: ureq::Error, what: &str) -> ApiError {
    match err {
        ureq::Error::StatusCode(401) => ApiError::Unauthorized,
        ureq::Error::StatusCode(404) => ApiError::NotFound(what.to_string()),
        ureq::Error::StatusCode(status) => ApiError::Status {
            status,
            message: ureq::http::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unexpected status")
                .to_string(),
        },
        other => ApiError::Transport(other.to_string()),
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProductsEnvelope {
    #[serde(default)]
    data: Vec<ProductDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductDto {
    product_id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    items: Vec<ItemDto>,
    #[serde(default)]
    images: Vec<ImageDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDto {
    item_id: String,
    #[serde(default)]
    price: Option<PriceDto>,
    #[serde(default)]
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceDto {
    #[serde(default)]
    regular: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ImageDto {
    #[serde(default)]
    featured: bool,
    #[serde(default)]
    sizes: Vec<ImageSizeDto>,
}

#[derive(Debug, Deserialize)]
struct ImageSizeDto {
    #[serde(default)]
    size: String,
    url: String,
}

fn to_price(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(2))
}

impl ImageDto {
    /// Medium rendition when present, else the first one listed.
    fn best_url(&self) -> Option<String> {
        self.sizes
            .iter()
            .find(|s| s.size == "medium")
            .or_else(|| self.sizes.first())
            .map(|s| s.url.clone())
    }
}

impl From<ProductDto> for Product {
    fn from(dto: ProductDto) -> Self {
        let mut images: Vec<&ImageDto> = dto.images.iter().collect();
        images.sort_by_key(|image| !image.featured);
        let images = images.into_iter().filter_map(ImageDto::best_url).collect();

        let units = dto
            .items
            .into_iter()
            .map(|item| PurchasableUnit {
                unit_id: item.item_id,
                price: item.price.and_then(|p| p.regular).and_then(to_price),
                size: item.size,
            })
            .collect();

        Product {
            product_id: dto.product_id,
            description: dto.description,
            units,
            images,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CartEnvelope {
    data: CartData,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CartData {
    One(CartDto),
    Many(Vec<CartDto>),
}

impl CartEnvelope {
    fn into_cart(self) -> Option<Cart> {
        let dto = match self.data {
            CartData::One(cart) => cart,
            CartData::Many(carts) => carts.into_iter().next()?,
        };
        Some(Cart {
            cart_id: dto.id,
            lines: dto
                .items
                .into_iter()
                .map(|item| CartLine {
                    product_id: item.upc,
                    description: item.description.unwrap_or_default(),
                    quantity: item.quantity,
                    price: item.price.and_then(|p| p.regular).and_then(to_price),
                })
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CartDto {
    #[serde(alias = "cartId")]
    id: String,
    #[serde(default)]
    items: Vec<CartItemDto>,
}

#[derive(Debug, Deserialize)]
struct CartItemDto {
    upc: String,
    #[serde(default)]
    quantity: u32,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price: Option<PriceDto>,
}

#[derive(Debug, Serialize)]
struct CartUpdateRequest {
    items: Vec<CartItemRequest>,
}

#[derive(Debug, Serialize)]
struct CartItemRequest {
    upc: String,
    quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_JSON: &str = r#"{
        "data": [{
            "productId": "0001111060903",
            "upc": "0001111060903",
            "description": "Kroger 2% Reduced Fat Milk",
            "images": [
                {"perspective": "back", "sizes": [{"size": "medium", "url": "https://img/back.jpg"}]},
                {"perspective": "front", "featured": true, "sizes": [
                    {"size": "large", "url": "https://img/front-large.jpg"},
                    {"size": "medium", "url": "https://img/front-medium.jpg"}
                ]}
            ],
            "items": [{
                "itemId": "0001111060903",
                "price": {"regular": 3.49, "promo": 0},
                "size": "1 gal"
            }]
        }],
        "meta": {"pagination": {"start": 0, "limit": 5, "total": 1}}
    }"#;

    #[test]
    fn product_dto_conversion() {
        let envelope: ProductsEnvelope = serde_json::from_str(PRODUCT_JSON).unwrap();
        let product = Product::from(envelope.data.into_iter().next().unwrap());
        assert_eq!(product.description, "Kroger 2% Reduced Fat Milk");
        assert_eq!(product.units.len(), 1);
        assert_eq!(product.units[0].unit_id, "0001111060903");
        assert_eq!(product.units[0].price, Some(Decimal::new(349, 2)));
        assert_eq!(product.units[0].size.as_deref(), Some("1 gal"));
        assert_eq!(product.image_url(), Some("https://img/front-medium.jpg"));
    }

    #[test]
    fn product_without_items_has_no_units() {
        let envelope: ProductsEnvelope =
            serde_json::from_str(r#"{"data":[{"productId":"x","description":"Gift Card"}]}"#)
                .unwrap();
        let product = Product::from(envelope.data.into_iter().next().unwrap());
        assert!(product.units.is_empty());
        assert!(product.image_url().is_none());
    }

    #[test]
    fn cart_envelope_accepts_object_or_array() {
        let one: CartEnvelope = serde_json::from_str(
            r#"{"data":{"cartId":"c1","items":[{"upc":"0001","quantity":2}]}}"#,
        )
        .unwrap();
        let cart = one.into_cart().unwrap();
        assert_eq!(cart.cart_id, "c1");
        assert_eq!(cart.lines[0].quantity, 2);

        let many: CartEnvelope =
            serde_json::from_str(r#"{"data":[{"id":"c2","items":[]}]}"#).unwrap();
        assert_eq!(many.into_cart().unwrap().cart_id, "c2");

        let none: CartEnvelope = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(none.into_cart().is_none());
    }

    #[test]
    fn update_request_shape() {
        let body = CartUpdateRequest {
            items: vec![CartItemRequest {
                upc: "0001".to_string(),
                quantity: 3,
            }],
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"items":[{"upc":"0001","quantity":3}]}"#
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(map_error(ureq::Error::StatusCode(401), "cart"), ApiError::Unauthorized);
        assert_eq!(
            map_error(ureq::Error::StatusCode(404), "cart"),
            ApiError::NotFound("cart".to_string())
        );
        assert_eq!(
            map_error(ureq::Error::StatusCode(503), "cart"),
            ApiError::Status {
                status: 503,
                message: "Service Unavailable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_token_is_not_authenticated() {
        let client = KrogerClient::new(KrogerConfig::default(), Arc::new(CredentialStore::new(None)));
        assert_eq!(
            client.search("milk", "01400943", 5).await,
            Err(ApiError::NotAuthenticated)
        );
        assert_eq!(client.get_cart().await, Err(ApiError::NotAuthenticated));
    }
}
