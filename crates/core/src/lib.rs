//! listcart-core: shopping-list extraction and cart commit pipeline.
//!
//! Turns free text (an OCR'd shopping list, a chat message, a recipe name)
//! into a confirmed set of catalog line items and commits them to a cart.
//!
//! # Pipeline
//!
//! raw text / image -> [`normalize`] -> [`parser`] (strategies + dedup)
//! -> [`resolve`] (catalog search + disambiguation) -> [`reconcile`]
//! -> [`pending`] (user edits) -> [`commit`] -> remote cart + [`local_cart`]
//!
//! [`order::OrderSession`] wires the stages together and exposes the
//! observable state a front end renders.
//!
//! # Collaborators
//!
//! Everything that talks to the outside world sits behind an async trait:
//! [`oracle::LanguageOracle`] (generative text + vision),
//! [`catalog::CatalogSearch`] and [`catalog::CartApi`]. [`memory`] carries
//! in-process implementations for offline runs.

pub mod catalog;
pub mod classify;
pub mod commit;
pub mod error;
pub mod local_cart;
pub mod memory;
pub mod normalize;
pub mod oracle;
pub mod order;
pub mod parser;
pub mod pending;
pub mod recipe;
pub mod reconcile;
pub mod remote_cart;
pub mod resolve;
pub mod session;
pub mod types;

// ── Convenience re-exports ───────────────────────────────────────────

pub use catalog::{CartApi, CatalogSearch};
pub use classify::{Intent, IntentClassifier};
pub use commit::{CommitCoordinator, CommitReport};
pub use error::{ApiError, FixtureError, OracleError, AI_ERROR_PREFIX};
pub use local_cart::LocalCart;
pub use oracle::{Assistant, FallbackAssistant, IntentLabel, LanguageOracle, OracleAssistant};
pub use order::{OrderConfig, OrderInput, OrderSession, StageOutcome};
pub use parser::{dedup_items, extract_items, parse_line, LineStrategy};
pub use pending::{PendingEdit, PendingSet};
pub use recipe::{Expansion, RecipeExpander};
pub use reconcile::{Reconciler, Reconciliation, ResolutionMode};
pub use remote_cart::RemoteCart;
pub use resolve::{ProductResolver, Resolution, SEARCH_LIMIT};
pub use session::{SessionEvent, SessionEvents};
pub use types::{
    Cart, CartLine, ImageData, LocalCartItem, ParsedItem, PendingCartItem, Product,
    PurchasableUnit, ResolvedCandidate, ResolvedProduct,
};
