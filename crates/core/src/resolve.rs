//! Name-to-product resolution.
//!
//! One catalog search per name. With several hits the assistant may pick
//! among the first [`SEARCH_LIMIT`]; a missing or out-of-range choice keeps
//! the catalog's first-ranked product.

use std::sync::Arc;

use crate::catalog::CatalogSearch;
use crate::error::ApiError;
use crate::oracle::Assistant;
use crate::types::{Product, ResolvedProduct};

/// Default number of catalog hits requested and shown for disambiguation.
pub const SEARCH_LIMIT: usize = 5;

/// Outcome of resolving one name.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(ResolvedProduct),
    /// The catalog returned nothing purchasable.
    NotFound,
    /// The catalog call failed.
    Failed(ApiError),
}

impl Resolution {
    pub fn product(&self) -> Option<&ResolvedProduct> {
        match self {
            Resolution::Found(p) => Some(p),
            _ => None,
        }
    }
}

pub struct ProductResolver {
    catalog: Arc<dyn CatalogSearch>,
    assistant: Arc<dyn Assistant>,
    location_id: String,
    limit: usize,
}

impl ProductResolver {
    pub fn new(
        catalog: Arc<dyn CatalogSearch>,
        assistant: Arc<dyn Assistant>,
        location_id: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            assistant,
            location_id: location_id.into(),
            limit: SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    /// Resolve a single name to a purchasable unit.
    pub async fn resolve(&self, name: &str) -> Resolution {
        let results = match self
            .catalog
            .search(name, &self.location_id, self.limit)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(name, error = %e, "catalog search failed");
                return Resolution::Failed(e);
            }
        };

        let chosen = match results.len() {
            0 => {
                tracing::debug!(name, "no catalog match");
                return Resolution::NotFound;
            }
            1 => &results[0],
            _ => self.choose(name, &results).await,
        };

        match ResolvedProduct::from_product(chosen) {
            Some(product) => {
                tracing::debug!(name, product_id = %product.product_id, "resolved");
                Resolution::Found(product)
            }
            None => {
                tracing::debug!(name, product = %chosen.product_id, "match has no purchasable unit");
                Resolution::NotFound
            }
        }
    }

    async fn choose<'a>(&self, name: &str, results: &'a [Product]) -> &'a Product {
        let shown = &results[..results.len().min(SEARCH_LIMIT)];
        match self.assistant.disambiguate(name, shown).await {
            Some(index) if index < shown.len() => &shown[index],
            _ => &results[0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::memory::StaticCatalog;
    use crate::oracle::{FallbackAssistant, IntentLabel};
    use crate::types::{ImageData, PurchasableUnit};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    struct FixedChoice {
        choice: Option<usize>,
        calls: Mutex<usize>,
    }

    impl FixedChoice {
        fn new(choice: Option<usize>) -> Self {
            Self {
                choice,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Assistant for FixedChoice {
        async fn classify(&self, _text: &str) -> IntentLabel {
            IntentLabel::Item
        }
        async fn disambiguate(&self, _term: &str, _candidates: &[Product]) -> Option<usize> {
            *self.calls.lock().unwrap() += 1;
            self.choice
        }
        async fn expand(&self, _recipe: &str) -> Result<String, OracleError> {
            Err(OracleError::Unavailable)
        }
        async fn converse(&self, _text: &str) -> Result<String, OracleError> {
            Err(OracleError::Unavailable)
        }
        async fn transcribe(&self, _image: &ImageData) -> Result<String, OracleError> {
            Err(OracleError::Unavailable)
        }
    }

    struct BrokenCatalog;

    #[async_trait]
    impl CatalogSearch for BrokenCatalog {
        async fn search(&self, _: &str, _: &str, _: usize) -> Result<Vec<Product>, ApiError> {
            Err(ApiError::Unauthorized)
        }
    }

    fn product(id: &str, description: &str, price: i64) -> Product {
        Product {
            product_id: id.to_string(),
            description: description.to_string(),
            units: vec![PurchasableUnit {
                unit_id: format!("{}-upc", id),
                price: Some(Decimal::new(price, 2)),
                size: None,
            }],
            images: vec![],
        }
    }

    fn milk_catalog() -> Arc<StaticCatalog> {
        Arc::new(StaticCatalog::new(vec![
            product("a", "Milk Half Gallon", 219),
            product("b", "Milk Gallon", 349),
            product("c", "Chocolate Milk", 299),
            product("d", "Cheddar", 399),
        ]))
    }

    #[tokio::test]
    async fn assistant_choice_is_used() {
        let resolver = ProductResolver::new(milk_catalog(), Arc::new(FixedChoice::new(Some(1))), "01400943");
        let resolved = resolver.resolve("milk").await;
        assert_eq!(resolved.product().unwrap().product_id, "b-upc");
    }

    #[tokio::test]
    async fn out_of_range_choice_keeps_first() {
        let resolver = ProductResolver::new(milk_catalog(), Arc::new(FixedChoice::new(Some(9))), "01400943");
        assert_eq!(resolver.resolve("milk").await.product().unwrap().product_id, "a-upc");
    }

    #[tokio::test]
    async fn fallback_keeps_catalog_ranking() {
        let resolver = ProductResolver::new(milk_catalog(), Arc::new(FallbackAssistant), "01400943");
        assert_eq!(resolver.resolve("milk").await.product().unwrap().product_id, "a-upc");
    }

    #[tokio::test]
    async fn single_hit_skips_disambiguation() {
        let assistant = Arc::new(FixedChoice::new(Some(0)));
        let resolver = ProductResolver::new(milk_catalog(), assistant.clone(), "01400943");
        let resolved = resolver.resolve("cheddar").await;
        assert_eq!(resolved.product().unwrap().product_id, "d-upc");
        assert_eq!(*assistant.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn no_hits_is_not_found() {
        let resolver = ProductResolver::new(milk_catalog(), Arc::new(FallbackAssistant), "01400943");
        assert_eq!(resolver.resolve("saffron").await, Resolution::NotFound);
    }

    #[tokio::test]
    async fn product_without_units_is_not_found() {
        let catalog = Arc::new(StaticCatalog::new(vec![Product {
            product_id: "x".to_string(),
            description: "Gift Card".to_string(),
            units: vec![],
            images: vec![],
        }]));
        let resolver = ProductResolver::new(catalog, Arc::new(FallbackAssistant), "01400943");
        assert_eq!(resolver.resolve("gift card").await, Resolution::NotFound);
    }

    #[tokio::test]
    async fn catalog_failure_is_reported() {
        let resolver = ProductResolver::new(Arc::new(BrokenCatalog), Arc::new(FallbackAssistant), "01400943");
        assert_eq!(
            resolver.resolve("milk").await,
            Resolution::Failed(ApiError::Unauthorized)
        );
    }
}
