//! HTTP implementations of the listcart collaborator traits.
//!
//! - [`nim::NimOracle`]: OpenAI-compatible chat and vision completions
//!   ([`listcart_core::LanguageOracle`]).
//! - [`kroger::KrogerClient`]: product search and cart endpoints
//!   ([`listcart_core::CatalogSearch`], [`listcart_core::CartApi`]).
//!
//! Both use `ureq` (sync) wrapped in `tokio::task::spawn_blocking`.

pub mod credentials;
pub mod kroger;
pub mod nim;

pub use credentials::CredentialStore;
pub use kroger::{KrogerClient, KrogerConfig};
pub use nim::{NimConfig, NimOracle};

/// Errors raised while constructing a client.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("environment variable {var} is not set")]
    MissingCredential { var: String },
}
