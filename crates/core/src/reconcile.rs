//! Batch resolution of parsed items into a pending set.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use crate::pending::PendingSet;
use crate::resolve::{ProductResolver, Resolution};
use crate::session::SessionEvents;
use crate::types::{ParsedItem, PendingCartItem, ResolvedCandidate};

/// How a batch of names is sent to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ResolutionMode {
    /// One name at a time, with a status message per name.
    #[default]
    Sequential,
    /// All names at once; results are put back in input order.
    Concurrent,
}

/// Partitioned outcome of resolving a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// One entry per input item, in input order.
    pub candidates: Vec<ResolvedCandidate>,
    pub found: Vec<PendingCartItem>,
    pub unavailable: Vec<String>,
    /// A catalog call was rejected as unauthorized.
    pub session_expired: bool,
}

impl Reconciliation {
    /// The reviewable set, or `None` when nothing was found.
    pub fn into_pending(self) -> Option<PendingSet> {
        PendingSet::new(self.found, self.unavailable)
    }
}

pub struct Reconciler {
    resolver: Arc<ProductResolver>,
    events: SessionEvents,
    mode: ResolutionMode,
}

impl Reconciler {
    pub fn new(resolver: Arc<ProductResolver>, events: SessionEvents, mode: ResolutionMode) -> Self {
        Self {
            resolver,
            events,
            mode,
        }
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Resolve every item and split the outcomes into found lines and
    /// unavailable names. Per-item failures never abort the batch.
    pub async fn reconcile(
        &self,
        items: &[ParsedItem],
        status: &(dyn Fn(String) + Send + Sync),
    ) -> Reconciliation {
        let resolutions = match self.mode {
            ResolutionMode::Sequential => self.resolve_sequential(items, status).await,
            ResolutionMode::Concurrent => self.resolve_concurrent(items, status).await,
        };

        let mut out = Reconciliation {
            candidates: Vec::with_capacity(items.len()),
            found: Vec::new(),
            unavailable: Vec::new(),
            session_expired: false,
        };

        for (item, resolution) in items.iter().zip(resolutions) {
            let product = match resolution {
                Resolution::Found(product) => {
                    out.found
                        .push(PendingCartItem::new(product.clone(), item.quantity()));
                    Some(product)
                }
                Resolution::NotFound => {
                    out.unavailable.push(item.name().to_string());
                    None
                }
                Resolution::Failed(e) => {
                    if e.is_session_expiry() {
                        out.session_expired = true;
                    }
                    out.unavailable.push(item.name().to_string());
                    None
                }
            };
            out.candidates.push(ResolvedCandidate {
                item: item.clone(),
                product,
            });
        }

        if out.session_expired {
            self.events.emit_unauthorized();
        }
        tracing::info!(
            requested = items.len(),
            found = out.found.len(),
            unavailable = out.unavailable.len(),
            "reconciled batch"
        );
        out
    }

    async fn resolve_sequential(
        &self,
        items: &[ParsedItem],
        status: &(dyn Fn(String) + Send + Sync),
    ) -> Vec<Resolution> {
        let mut resolutions = Vec::with_capacity(items.len());
        for item in items {
            status(format!("Searching: {}...", item.name()));
            resolutions.push(self.resolver.resolve(item.name()).await);
        }
        resolutions
    }

    async fn resolve_concurrent(
        &self,
        items: &[ParsedItem],
        status: &(dyn Fn(String) + Send + Sync),
    ) -> Vec<Resolution> {
        status(format!("Searching {} items...", items.len()));
        let mut set = JoinSet::new();
        for (index, item) in items.iter().enumerate() {
            let resolver = Arc::clone(&self.resolver);
            let name = item.name().to_string();
            set.spawn(async move { (index, resolver.resolve(&name).await) });
        }

        let mut slots: Vec<Option<Resolution>> = vec![None; items.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, resolution)) => slots[index] = Some(resolution),
                Err(e) => tracing::error!(error = %e, "resolution task failed"),
            }
        }
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Resolution::NotFound))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSearch;
    use crate::error::ApiError;
    use crate::memory::StaticCatalog;
    use crate::oracle::FallbackAssistant;
    use crate::types::{Product, PurchasableUnit};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    fn product(id: &str, description: &str) -> Product {
        Product {
            product_id: id.to_string(),
            description: description.to_string(),
            units: vec![PurchasableUnit {
                unit_id: format!("{}-upc", id),
                price: Some(Decimal::new(199, 2)),
                size: None,
            }],
            images: vec![],
        }
    }

    fn catalog() -> Arc<StaticCatalog> {
        Arc::new(StaticCatalog::new(vec![
            product("p1", "Black Pepper"),
            product("p2", "Hot Sauce"),
            product("p3", "Whole Milk"),
        ]))
    }

    fn reconciler(catalog: Arc<dyn CatalogSearch>, mode: ResolutionMode) -> Reconciler {
        let resolver = ProductResolver::new(catalog, Arc::new(FallbackAssistant), "01400943");
        Reconciler::new(Arc::new(resolver), SessionEvents::new(), mode)
    }

    fn items(pairs: &[(&str, u32)]) -> Vec<ParsedItem> {
        pairs
            .iter()
            .map(|(name, qty)| ParsedItem::new(name, *qty).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn partitions_found_and_unavailable() {
        let statuses = Mutex::new(Vec::new());
        let record = |s: String| statuses.lock().unwrap().push(s);
        let out = reconciler(catalog(), ResolutionMode::Sequential)
            .reconcile(&items(&[("pepper", 2), ("saffron", 1), ("milk", 1)]), &record)
            .await;

        assert_eq!(out.found.len(), 2);
        assert_eq!(out.found[0].product_id, "p1-upc");
        assert_eq!(out.found[0].quantity, 2);
        assert_eq!(out.unavailable, vec!["saffron".to_string()]);
        assert_eq!(out.candidates.len(), 3);
        assert!(out.candidates[1].product.is_none());
        assert_eq!(
            statuses.lock().unwrap().as_slice(),
            ["Searching: pepper...", "Searching: saffron...", "Searching: milk..."]
        );
    }

    #[tokio::test]
    async fn concurrent_mode_keeps_input_order() {
        let out = reconciler(catalog(), ResolutionMode::Concurrent)
            .reconcile(&items(&[("milk", 1), ("hot sauce", 3), ("pepper", 1)]), &|_| {})
            .await;
        let ids: Vec<&str> = out.found.iter().map(|f| f.product_id.as_str()).collect();
        assert_eq!(ids, ["p3-upc", "p2-upc", "p1-upc"]);
        assert_eq!(out.found[1].quantity, 3);
    }

    #[tokio::test]
    async fn nothing_found_has_no_pending_set() {
        let out = reconciler(catalog(), ResolutionMode::Sequential)
            .reconcile(&items(&[("saffron", 1)]), &|_| {})
            .await;
        assert!(out.into_pending().is_none());
    }

    struct ExpiredCatalog;

    #[async_trait]
    impl CatalogSearch for ExpiredCatalog {
        async fn search(&self, _: &str, _: &str, _: usize) -> Result<Vec<Product>, ApiError> {
            Err(ApiError::Unauthorized)
        }
    }

    #[tokio::test]
    async fn unauthorized_emits_one_session_event() {
        let resolver = ProductResolver::new(Arc::new(ExpiredCatalog), Arc::new(FallbackAssistant), "01400943");
        let events = SessionEvents::new();
        let mut rx = events.subscribe();
        let out = Reconciler::new(Arc::new(resolver), events, ResolutionMode::Sequential)
            .reconcile(&items(&[("milk", 1), ("eggs", 1)]), &|_| {})
            .await;

        assert!(out.session_expired);
        assert_eq!(out.unavailable.len(), 2);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
