//! Applying a confirmed pending set to the remote cart.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::CartApi;
use crate::local_cart::LocalCart;
use crate::pending::PendingSet;
use crate::session::SessionEvents;
use crate::types::LocalCartItem;

/// A line the remote cart refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedLine {
    pub product_id: String,
    pub display_name: String,
    pub reason: String,
}

/// Outcome of one commit. Partial success is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommitReport {
    /// Product ids accepted by the remote cart, in commit order.
    pub committed: Vec<String>,
    pub failed: Vec<FailedLine>,
}

impl CommitReport {
    pub fn success_count(&self) -> usize {
        self.committed.len()
    }

    pub fn attempted(&self) -> usize {
        self.committed.len() + self.failed.len()
    }

    pub fn summary(&self) -> String {
        format!("Added {} items to cart!", self.success_count())
    }
}

pub struct CommitCoordinator {
    cart: Arc<dyn CartApi>,
    local: LocalCart,
    events: SessionEvents,
}

impl CommitCoordinator {
    pub fn new(cart: Arc<dyn CartApi>, local: LocalCart, events: SessionEvents) -> Self {
        Self {
            cart,
            local,
            events,
        }
    }

    pub fn local_cart(&self) -> &LocalCart {
        &self.local
    }

    /// Submit every line in order. Successes are mirrored into the local
    /// cart; failures are recorded and skipped. Consumes the set.
    pub async fn commit(&self, set: PendingSet) -> CommitReport {
        let mut report = CommitReport::default();
        let mut expired = false;

        for item in set.items() {
            match self.cart.update_cart(&item.product_id, item.quantity).await {
                Ok(()) => {
                    self.local.add_item(LocalCartItem::from(item));
                    report.committed.push(item.product_id.clone());
                    tracing::debug!(product_id = %item.product_id, quantity = item.quantity, "committed line");
                }
                Err(e) => {
                    expired |= e.is_session_expiry();
                    tracing::warn!(product_id = %item.product_id, error = %e, "cart update failed");
                    report.failed.push(FailedLine {
                        product_id: item.product_id.clone(),
                        display_name: item.display_name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if expired {
            self.events.emit_unauthorized();
        }
        tracing::info!(
            committed = report.success_count(),
            failed = report.failed.len(),
            "commit finished"
        );
        report
    }
}
