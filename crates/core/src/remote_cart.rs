//! Direct maintenance of the remote cart, outside the pending flow.

use std::sync::Arc;

use crate::catalog::CartApi;
use crate::error::ApiError;
use crate::session::SessionEvents;
use crate::types::Cart;

pub struct RemoteCart {
    api: Arc<dyn CartApi>,
    events: SessionEvents,
}

impl RemoteCart {
    pub fn new(api: Arc<dyn CartApi>, events: SessionEvents) -> Self {
        Self { api, events }
    }

    /// Current cart. A cart that does not exist yet reads as empty.
    pub async fn load(&self) -> Result<Cart, ApiError> {
        match self.api.get_cart().await {
            Ok(cart) => Ok(cart),
            Err(ApiError::NotFound(_)) => Ok(Cart::empty()),
            Err(e) => Err(self.observed(e)),
        }
    }

    /// Add `quantity` units of a product.
    pub async fn add(&self, product_id: &str, quantity: u32) -> Result<(), ApiError> {
        self.api
            .update_cart(product_id, quantity)
            .await
            .map_err(|e| self.observed(e))
    }

    /// Remove a line. Loads the cart first to learn its id.
    pub async fn remove(&self, product_id: &str) -> Result<(), ApiError> {
        let cart = self.load().await?;
        if !cart.lines.iter().any(|l| l.product_id == product_id) {
            return Err(ApiError::NotFound(product_id.to_string()));
        }
        self.api
            .remove_item(&cart.cart_id, product_id)
            .await
            .map_err(|e| self.observed(e))
    }

    fn observed(&self, error: ApiError) -> ApiError {
        self.events.observe(&error);
        error
    }
}
