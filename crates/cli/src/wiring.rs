//! Collaborator construction from configuration.

use std::sync::Arc;

use listcart_connect::{CredentialStore, KrogerClient, NimConfig, NimOracle};
use listcart_core::memory::{MemoryCart, StaticCatalog};
use listcart_core::{
    Assistant, CartApi, CatalogSearch, FallbackAssistant, LocalCart, OracleAssistant,
    OrderSession, RemoteCart, SessionEvents,
};

use crate::config::Config;

/// Everything a command needs, built once per invocation.
pub struct Services {
    pub assistant: Arc<dyn Assistant>,
    /// Whether `assistant` is backed by a live oracle.
    pub has_oracle: bool,
    pub catalog: Arc<dyn CatalogSearch>,
    pub cart: Arc<dyn CartApi>,
    pub events: SessionEvents,
    pub offline: bool,
}

impl Services {
    pub fn build(config: &Config, no_assistant: bool) -> Result<Self, String> {
        let (assistant, has_oracle) = build_assistant(config, no_assistant);
        let events = SessionEvents::new();

        let (catalog, cart, offline): (Arc<dyn CatalogSearch>, Arc<dyn CartApi>, bool) =
            match &config.catalog.fixture {
                Some(path) => {
                    let json = std::fs::read_to_string(path).map_err(|e| {
                        format!("could not read catalog fixture '{}': {}", path.display(), e)
                    })?;
                    let catalog = StaticCatalog::from_json(&json)
                        .map_err(|e| format!("'{}': {}", path.display(), e))?;
                    tracing::info!(products = catalog.len(), "using offline catalog");
                    let catalog: Arc<dyn CatalogSearch> = Arc::new(catalog);
                    let cart: Arc<dyn CartApi> = Arc::new(MemoryCart::new());
                    (catalog, cart, true)
                }
                None => {
                    let credentials = CredentialStore::from_env(&config.catalog.token_env)
                        .map_err(|e| format!("catalog credentials: {}", e))?;
                    let client = Arc::new(KrogerClient::new(
                        config.kroger_config(),
                        Arc::new(credentials),
                    ));
                    let catalog: Arc<dyn CatalogSearch> = client.clone();
                    let cart: Arc<dyn CartApi> = client;
                    (catalog, cart, false)
                }
            };

        Ok(Self {
            assistant,
            has_oracle,
            catalog,
            cart,
            events,
            offline,
        })
    }

    pub fn order_session(&self, config: &Config) -> OrderSession {
        OrderSession::new(
            Arc::clone(&self.assistant),
            Arc::clone(&self.catalog),
            Arc::clone(&self.cart),
            LocalCart::new(),
            self.events.clone(),
            config.order_config(),
        )
    }

    pub fn remote_cart(&self) -> RemoteCart {
        RemoteCart::new(Arc::clone(&self.cart), self.events.clone())
    }
}

fn build_assistant(config: &Config, no_assistant: bool) -> (Arc<dyn Assistant>, bool) {
    if no_assistant || !config.assistant.enabled {
        tracing::debug!("assistant disabled, using deterministic fallback");
        return (Arc::new(FallbackAssistant), false);
    }
    match NimConfig::from_env(&config.assistant.api_key_env) {
        Ok(from_env) => {
            let oracle = NimOracle::new(config.nim_config(from_env.api_key));
            (Arc::new(OracleAssistant::new(Arc::new(oracle))), true)
        }
        Err(e) => {
            tracing::warn!(error = %e, "no assistant API key, using deterministic fallback");
            (Arc::new(FallbackAssistant), false)
        }
    }
}
