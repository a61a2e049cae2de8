//! Recipe-to-ingredient expansion.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::OracleError;
use crate::normalize::clean_line;
use crate::oracle::Assistant;
use crate::types::ParsedItem;

/// Most ingredients kept from one reply.
pub const MAX_INGREDIENTS: usize = 10;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());
static ARTICLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:a|an|the|some)\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    Ingredients(Vec<String>),
    /// The reply contained nothing usable. Terminal for this request.
    NoIngredients,
    /// The assistant failed; nothing should be resolved.
    Failed(OracleError),
}

impl Expansion {
    /// Ingredients as single-quantity items, ready for resolution.
    pub fn into_items(self) -> Vec<ParsedItem> {
        match self {
            Expansion::Ingredients(names) => names
                .iter()
                .filter_map(|name| ParsedItem::new(name, 1))
                .collect(),
            _ => Vec::new(),
        }
    }
}

pub struct RecipeExpander {
    assistant: Arc<dyn Assistant>,
}

impl RecipeExpander {
    pub fn new(assistant: Arc<dyn Assistant>) -> Self {
        Self { assistant }
    }

    pub async fn expand(&self, recipe: &str) -> Expansion {
        let raw = match self.assistant.expand(recipe).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(recipe, error = %e, "ingredient expansion failed");
                return Expansion::Failed(e);
            }
        };
        let ingredients = clean_ingredient_reply(&raw);
        tracing::debug!(recipe, ?ingredients, "expanded recipe");
        if ingredients.is_empty() {
            Expansion::NoIngredients
        } else {
            Expansion::Ingredients(ingredients)
        }
    }
}

/// Turn a free-text ingredient reply into clean, unique, lowercase names.
pub fn clean_ingredient_reply(raw: &str) -> Vec<String> {
    let flattened = raw.replace(['\n', '\r', '.'], ",");
    let without_digits = DIGITS.replace_all(&flattened, "");
    let without_notes = PARENTHETICAL.replace_all(&without_digits, "");

    let mut seen = HashSet::new();
    without_notes
        .split(',')
        .map(|part| clean_line(part).trim().to_lowercase())
        .filter(|part| part.chars().count() > 2 && !part.contains("ingredient"))
        .map(|part| ARTICLE.replace(&part, "").trim().to_string())
        .filter(|part| !part.is_empty() && seen.insert(part.clone()))
        .take(MAX_INGREDIENTS)
        .collect()
}
