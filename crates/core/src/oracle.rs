//! Generative-text oracle and the assistant capability built on it.
//!
//! Two levels of abstraction:
//! - [`LanguageOracle`]: the raw collaborator. A prompt goes in, text comes
//!   out, plus a vision call that transcribes an image.
//! - [`Assistant`]: what the pipeline consults while turning text into cart
//!   lines.
//!
//! [`OracleAssistant`] implements the capability by prompting an oracle.
//! [`FallbackAssistant`] implements it deterministically with no oracle.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{OracleError, AI_ERROR_PREFIX};
use crate::types::{ImageData, Product};

/// Most candidates ever shown to the oracle for disambiguation.
pub const MAX_DISAMBIGUATION_OPTIONS: usize = 5;

static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

// ──────────────────────────────────────────────
// LanguageOracle
// ──────────────────────────────────────────────

/// The external generative-text collaborator.
///
/// Implementations own transport, authentication and timeouts. A reply that
/// starts with [`AI_ERROR_PREFIX`] is an upstream failure, not content;
/// callers run replies through [`interpret_reply`].
#[async_trait]
pub trait LanguageOracle: Send + Sync {
    /// Send a single user prompt and return the reply text.
    async fn chat(&self, prompt: &str) -> Result<String, OracleError>;

    /// Transcribe the text visible in an image.
    async fn vision_extract(&self, image: &ImageData) -> Result<String, OracleError>;
}

/// Map a sentinel-prefixed reply to [`OracleError::Upstream`].
pub fn interpret_reply(raw: String) -> Result<String, OracleError> {
    let trimmed = raw.trim_start();
    if let Some(detail) = trimmed.strip_prefix(AI_ERROR_PREFIX) {
        let detail = detail.trim_start_matches(':').trim();
        return Err(OracleError::Upstream(detail.to_string()));
    }
    Ok(raw)
}

/// First run of digits in `text`, as a number.
pub fn first_integer(text: &str) -> Option<usize> {
    FIRST_INTEGER
        .find(text)
        .and_then(|m| m.as_str().parse::<usize>().ok())
}

// ──────────────────────────────────────────────
// Assistant capability
// ──────────────────────────────────────────────

/// The oracle's three-way reading of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntentLabel {
    Item,
    Recipe,
    Other,
}

impl IntentLabel {
    /// Read a label out of a free-text reply. `ITEM` is checked before
    /// `RECIPE`; anything else is `Other`.
    pub fn from_reply(reply: &str) -> Self {
        let upper = reply.trim().to_uppercase();
        if upper.contains("ITEM") {
            IntentLabel::Item
        } else if upper.contains("RECIPE") {
            IntentLabel::Recipe
        } else {
            IntentLabel::Other
        }
    }
}

/// The soft-intelligence capability the pipeline consults.
///
/// Every method has a safe outcome when the assistant cannot help:
/// `disambiguate` returns `None` (use the first-ranked candidate) and the
/// text-producing methods return an [`OracleError`] the caller absorbs.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Classify chat text that matched no structural pattern.
    async fn classify(&self, text: &str) -> IntentLabel;

    /// Choose among ranked candidates for `term`. Returns a zero-based index
    /// into `candidates`, or `None` to keep the first-ranked one.
    async fn disambiguate(&self, term: &str, candidates: &[Product]) -> Option<usize>;

    /// Raw comma-separated ingredient list for a recipe name.
    async fn expand(&self, recipe: &str) -> Result<String, OracleError>;

    /// Free-form answer to a message that is not a shopping request.
    async fn converse(&self, text: &str) -> Result<String, OracleError>;

    /// Raw text transcribed from a photographed list.
    async fn transcribe(&self, image: &ImageData) -> Result<String, OracleError>;
}

// ──────────────────────────────────────────────
// FallbackAssistant
// ──────────────────────────────────────────────

/// Deterministic assistant used when no oracle is configured.
///
/// Treats unmatched chat text as item requests and always keeps the
/// catalog's own ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAssistant;

#[async_trait]
impl Assistant for FallbackAssistant {
    async fn classify(&self, _text: &str) -> IntentLabel {
        IntentLabel::Item
    }

    async fn disambiguate(&self, _term: &str, _candidates: &[Product]) -> Option<usize> {
        None
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

// ──────────────────────────────────────────────
// OracleAssistant
// ──────────────────────────────────────────────

/// Assistant backed by a [`LanguageOracle`] with fixed prompts.
pub struct OracleAssistant {
    oracle: Arc<dyn LanguageOracle>,
}

impl OracleAssistant {
    pub fn new(oracle: Arc<dyn LanguageOracle>) -> Self {
        Self { oracle }
    }

    async fn ask(&self, prompt: &str) -> Result<String, OracleError> {
        let reply = interpret_reply(self.oracle.chat(prompt).await?)?;
        if reply.trim().is_empty() {
            return Err(OracleError::Blank);
        }
        Ok(reply)
    }
}

#[async_trait]
impl Assistant for OracleAssistant {
    async fn classify(&self, text: &str) -> IntentLabel {
        match self.ask(&classify_prompt(text)).await {
            Ok(reply) => {
                let label = IntentLabel::from_reply(&reply);
                tracing::debug!(?label, reply = reply.trim(), "oracle classified message");
                label
            }
            Err(e) => {
                tracing::warn!(error = %e, "classification failed, treating as conversation");
                IntentLabel::Other
            }
        }
    }

    async fn disambiguate(&self, term: &str, candidates: &[Product]) -> Option<usize> {
        let shown = candidates.len().min(MAX_DISAMBIGUATION_OPTIONS);
        if shown < 2 {
            return None;
        }
        let reply = match self
            .ask(&disambiguation_prompt(term, &candidates[..shown]))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(term, error = %e, "disambiguation failed, keeping first result");
                return None;
            }
        };
        match first_integer(&reply) {
            Some(n) if (1..=shown).contains(&n) => {
                tracing::debug!(term, choice = n, "oracle picked candidate");
                Some(n - 1)
            }
            _ => {
                tracing::debug!(
                    term,
                    reply = reply.trim(),
                    "unusable disambiguation reply, keeping first result"
                );
                None
            }
        }
    }

    async fn expand(&self, recipe: &str) -> Result<String, OracleError> {
        self.ask(&ingredient_prompt(recipe)).await
    }

    async fn converse(&self, text: &str) -> Result<String, OracleError> {
        self.ask(text).await
    }

    async fn transcribe(&self, image: &ImageData) -> Result<String, OracleError> {
        interpret_reply(self.oracle.vision_extract(image).await?)
    }
}

// ── Prompt construction ──────────────────────────────────────────────────────

/// Three-way classification prompt (ITEM / RECIPE / OTHER).
pub fn classify_prompt(text: &str) -> String {
    format!(
        r#"Classify this message: "{text}"
Is this:
1. A grocery item or list of grocery items (e.g., "milk", "eggs and bread", "2 apples")
2. A recipe request (e.g., "carbonara", "chicken soup")
3. Something else (a question, greeting, etc.)

Reply with ONLY one word: ITEM, RECIPE, or OTHER"#
    )
}

/// Numbered-options prompt asking for the most likely purchase.
pub fn disambiguation_prompt(term: &str, candidates: &[Product]) -> String {
    let options = candidates
        .iter()
        .enumerate()
        .map(|(i, product)| {
            let unit = product.primary_unit();
            let size = unit
                .and_then(|u| u.size.as_deref())
                .unwrap_or("unknown size");
            let price = unit.and_then(|u| u.price).unwrap_or_default();
            format!("{}. {} - {} - ${:.2}", i + 1, product.description, size, price)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a shopping assistant. A customer wants to buy "{term}".
Here are the available options:
{options}

Pick the NUMBER (1-{count}) of the product that a typical shopper would most likely want.
Consider: common sizes (gallon of milk, dozen eggs, standard packages), popular brands, and reasonable quantities.
Reply with ONLY the number, nothing else."#,
        count = candidates.len()
    )
}

/// Prompt asking for 5-8 comma-separated ingredient names.
pub fn ingredient_prompt(recipe: &str) -> String {
    format!(
        r#"List the essential grocery ingredients needed to make "{recipe}".
Return ONLY a comma-separated list of simple ingredient names.
Example format: chicken, butter, hot sauce, garlic, celery
List 5-8 main ingredients only. No quantities, no numbers, no instructions."#
    )
}
