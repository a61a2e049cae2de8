//! Seams to the product catalog and the remote cart service.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{Cart, Product};

/// Product search against a store catalog.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Ranked products matching `term` at `location_id`, at most `limit`.
    async fn search(
        &self,
        term: &str,
        location_id: &str,
        limit: usize,
    ) -> Result<Vec<Product>, ApiError>;
}

/// The authoritative remote cart.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Current cart. A missing cart is reported as [`ApiError::NotFound`].
    async fn get_cart(&self) -> Result<Cart, ApiError>;

    /// Add `quantity` units of `product_id` to the cart.
    async fn update_cart(&self, product_id: &str, quantity: u32) -> Result<(), ApiError>;

    /// Remove the line for `product_id` from cart `cart_id`.
    async fn remove_item(&self, cart_id: &str, product_id: &str) -> Result<(), ApiError>;
}
