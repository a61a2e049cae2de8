//! In-process catalog and cart used for offline runs and tests.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::catalog::{CartApi, CatalogSearch};
use crate::error::{ApiError, FixtureError};
use crate::types::{Cart, CartLine, Product};

// ──────────────────────────────────────────────
// StaticCatalog
// ──────────────────────────────────────────────

/// A fixed product list searched by word containment.
///
/// A product matches when its lowercased description contains every word of
/// the term. Results keep fixture order.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Load a JSON array of products.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Ok(Self::new(products))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[async_trait]
impl CatalogSearch for StaticCatalog {
    async fn search(
        &self,
        term: &str,
        _location_id: &str,
        limit: usize,
    ) -> Result<Vec<Product>, ApiError> {
        let words: Vec<String> = term
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        if words.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .products
            .iter()
            .filter(|p| {
                let description = p.description.to_lowercase();
                words.iter().all(|w| description.contains(w.as_str()))
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

// ──────────────────────────────────────────────
// MemoryCart
// ──────────────────────────────────────────────

const MEMORY_CART_ID: &str = "local";

/// A cart held in memory.
///
/// Reports an empty cart as not found, like the remote service does before a
/// cart exists. Product ids registered with [`MemoryCart::fail_on`] reject
/// every update with a server error.
#[derive(Debug, Default)]
pub struct MemoryCart {
    lines: Mutex<Vec<CartLine>>,
    failing: HashSet<String>,
}

impl MemoryCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, product_id: &str) -> Self {
        self.failing.insert(product_id.to_string());
        self
    }

    pub async fn lines(&self) -> Vec<CartLine> {
        self.lines.lock().await.clone()
    }
}

#[async_trait]
impl CartApi for MemoryCart {
    async fn get_cart(&self) -> Result<Cart, ApiError> {
        let lines = self.lines.lock().await;
        if lines.is_empty() {
            return Err(ApiError::NotFound("cart".to_string()));
        }
        Ok(Cart {
            cart_id: MEMORY_CART_ID.to_string(),
            lines: lines.clone(),
        })
    }

    async fn update_cart(&self, product_id: &str, quantity: u32) -> Result<(), ApiError> {
        if self.failing.contains(product_id) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("cannot add {}", product_id),
            });
        }
        let mut lines = self.lines.lock().await;
        match lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => lines.push(CartLine {
                product_id: product_id.to_string(),
                description: String::new(),
                quantity,
                price: None,
            }),
        }
        Ok(())
    }

    async fn remove_item(&self, _cart_id: &str, product_id: &str) -> Result<(), ApiError> {
        let mut lines = self.lines.lock().await;
        let before = lines.len();
        lines.retain(|l| l.product_id != product_id);
        if lines.len() == before {
            return Err(ApiError::NotFound(product_id.to_string()));
        }
        Ok(())
    }
}
