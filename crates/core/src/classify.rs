//! Chat intent detection.
//!
//! Structural patterns run first; only text none of them recognise is sent
//! to the assistant for a three-way label.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::normalize_line;
use crate::oracle::{Assistant, IntentLabel};
use crate::parser::{dedup_items, parse_line};
use crate::types::ParsedItem;

static RECIPE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)ingredients?\s+(?:for|to make)\s+(.+)",
        r"(?i)what do i need (?:for|to make)\s+(.+)",
        r"(?i)add.*ingredients?.*for\s+(.+)",
        r"(?i)make\s+(.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ADD_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^add\s+(.+)").unwrap());
static RECIPE_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ingredient|\bfor\b|to make").unwrap());
static RECIPE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ingredients?\s*(?:for|to make)?\s*").unwrap());
static CART_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+to\s+(?:my|the)\s+(?:cart|basket)\s*$").unwrap());
static SEGMENT_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i),|&|\s+and\s+").unwrap());

/// What a chat message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// One or more items to look up.
    Items(Vec<ParsedItem>),
    /// A recipe whose ingredients should be looked up.
    Recipe(String),
    /// Anything else; answered conversationally.
    Conversation(String),
}

pub struct IntentClassifier {
    assistant: Arc<dyn Assistant>,
}

impl IntentClassifier {
    pub fn new(assistant: Arc<dyn Assistant>) -> Self {
        Self { assistant }
    }

    /// Classify `text`, asking the assistant only when no structural
    /// pattern applies.
    pub async fn classify(&self, text: &str) -> Intent {
        let text = text.trim();
        if let Some(intent) = detect_structural(text) {
            tracing::debug!(?intent, "structural intent");
            return intent;
        }

        match self.assistant.classify(text).await {
            IntentLabel::Item => {
                let items = split_items(text);
                if items.is_empty() {
                    Intent::Conversation(text.to_string())
                } else {
                    Intent::Items(items)
                }
            }
            IntentLabel::Recipe => match clean_recipe_name(text) {
                Some(name) => Intent::Recipe(name),
                None => Intent::Conversation(text.to_string()),
            },
            IntentLabel::Other => Intent::Conversation(text.to_string()),
        }
    }
}

/// Cheap local detection of recipe phrasing and explicit "add" commands.
pub fn detect_structural(text: &str) -> Option<Intent> {
    let recipe = RECIPE_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()));
    if let Some(name) = recipe {
        if !name.to_lowercase().contains("add") {
            if let Some(name) = clean_recipe_name(&name) {
                return Some(Intent::Recipe(name));
            }
        }
    }

    let target = ADD_COMMAND.captures(text)?.get(1)?.as_str();
    if RECIPE_HINT.is_match(target) {
        let name = RECIPE_PREFIX.replace_all(target, "");
        return clean_recipe_name(&name).map(Intent::Recipe);
    }
    let items = split_items(target);
    if items.is_empty() {
        None
    } else {
        Some(Intent::Items(items))
    }
}

/// Split an item request on commas, ampersands and "and"; each segment
/// is parsed as its own line.
pub fn split_items(text: &str) -> Vec<ParsedItem> {
    let text = CART_SUFFIX.replace(text.trim(), "");
    let items = SEGMENT_SPLIT
        .split(&text)
        .filter_map(normalize_line)
        .filter_map(|segment| parse_line(&segment))
        .collect();
    dedup_items(items)
}

fn clean_recipe_name(raw: &str) -> Option<String> {
    let name = CART_SUFFIX.replace(raw.trim(), "");
    let name = name
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::oracle::FallbackAssistant;
    use crate::types::{ImageData, Product};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Labeller {
        label: IntentLabel,
        calls: AtomicUsize,
    }

    impl Labeller {
        fn new(label: IntentLabel) -> Arc<Self> {
            Arc::new(Self {
                label,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Assistant for Labeller {
        async fn classify(&self, _text: &str) -> IntentLabel {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.label
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

    fn item(name: &str, quantity: u32) -> ParsedItem {
        ParsedItem::new(name, quantity).unwrap()
    }

    #[test]
    fn recipe_phrasings() {
        assert_eq!(
            detect_structural("ingredients for chicken soup"),
            Some(Intent::Recipe("chicken soup".to_string()))
        );
        assert_eq!(
            detect_structural("What do I need to make lasagna?"),
            Some(Intent::Recipe("lasagna".to_string()))
        );
        assert_eq!(
            detect_structural("make pancakes"),
            Some(Intent::Recipe("pancakes".to_string()))
        );
    }

    #[test]
    fn add_with_recipe_hint_is_recipe() {
        assert_eq!(
            detect_structural("add ingredients for tacos"),
            Some(Intent::Recipe("tacos".to_string()))
        );
        assert_eq!(
            detect_structural("add stuff to make carbonara"),
            Some(Intent::Recipe("carbonara".to_string()))
        );
    }

    #[test]
    fn add_command_splits_items() {
        assert_eq!(
            detect_structural("add 2 eggs, milk and bread to my cart"),
            Some(Intent::Items(vec![item("eggs", 2), item("milk", 1), item("bread", 1)]))
        );
        assert_eq!(
            detect_structural("Add butter & jam"),
            Some(Intent::Items(vec![item("butter", 1), item("jam", 1)]))
        );
    }

    #[test]
    fn add_does_not_misread_embedded_for() {
        // "fork" contains "for" but is not a recipe hint.
        assert_eq!(
            detect_structural("add plastic forks"),
            Some(Intent::Items(vec![item("plastic forks", 1)]))
        );
    }

    #[test]
    fn plain_text_has_no_structural_intent() {
        assert_eq!(detect_structural("milk"), None);
        assert_eq!(detect_structural("hello there"), None);
    }

    #[tokio::test]
    async fn structural_match_skips_assistant() {
        let labeller = Labeller::new(IntentLabel::Other);
        let classifier = IntentClassifier::new(labeller.clone());
        let intent = classifier.classify("ingredients for chili").await;
        assert_eq!(intent, Intent::Recipe("chili".to_string()));
        assert_eq!(labeller.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn item_label_splits_segments() {
        let classifier = IntentClassifier::new(Labeller::new(IntentLabel::Item));
        assert_eq!(
            classifier.classify("eggs and 3 apples").await,
            Intent::Items(vec![item("eggs", 1), item("apples", 3)])
        );
    }

    #[tokio::test]
    async fn recipe_label_uses_whole_text() {
        let classifier = IntentClassifier::new(Labeller::new(IntentLabel::Recipe));
        assert_eq!(
            classifier.classify("carbonara").await,
            Intent::Recipe("carbonara".to_string())
        );
    }

    #[tokio::test]
    async fn other_label_is_conversation() {
        let classifier = IntentClassifier::new(Labeller::new(IntentLabel::Other));
        assert_eq!(
            classifier.classify("how are you?").await,
            Intent::Conversation("how are you?".to_string())
        );
    }

    #[tokio::test]
    async fn fallback_treats_text_as_items() {
        let classifier = IntentClassifier::new(Arc::new(FallbackAssistant));
        assert_eq!(
            classifier.classify("milk, eggs").await,
            Intent::Items(vec![item("milk", 1), item("eggs", 1)])
        );
    }
}
