//! Item line parsing and de-duplication.
//!
//! A normalized line is turned into at most one [`ParsedItem`] by trying a
//! fixed, ordered list of [`LineStrategy`] values; the first strategy that
//! yields a valid item wins. Lines no strategy accepts are dropped without
//! an error.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::normalize_line;
use crate::types::ParsedItem;

static LEADING_MULTIPLIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*[xX×]\s*(.+)$").unwrap());
static LEADING_QUANTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s+(.+)$").unwrap());
static TRAILING_MULTIPLIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*[xX×]\s*(\d+)$").unwrap());
static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*\((\d+)\)$").unwrap());

/// One way of reading a line as `(name, quantity)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStrategy {
    /// `name|quantity`
    Separator,
    /// `2x milk`, `2 × milk`
    LeadingMultiplier,
    /// `2 milk`
    LeadingQuantity,
    /// `milk x2`
    TrailingMultiplier,
    /// `milk (2)`
    Parenthesized,
    /// The whole line is the name, quantity 1.
    BareName,
}

impl LineStrategy {
    /// Priority order. The first strategy that accepts a line wins.
    pub const ORDER: [LineStrategy; 6] = [
        LineStrategy::Separator,
        LineStrategy::LeadingMultiplier,
        LineStrategy::LeadingQuantity,
        LineStrategy::TrailingMultiplier,
        LineStrategy::Parenthesized,
        LineStrategy::BareName,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LineStrategy::Separator => "separator",
            LineStrategy::LeadingMultiplier => "leading-multiplier",
            LineStrategy::LeadingQuantity => "leading-quantity",
            LineStrategy::TrailingMultiplier => "trailing-multiplier",
            LineStrategy::Parenthesized => "parenthesized",
            LineStrategy::BareName => "bare-name",
        }
    }

    /// Apply this strategy alone to a normalized line.
    pub fn apply(self, line: &str) -> Option<ParsedItem> {
        match self {
            LineStrategy::Separator => parse_separator(line),
            LineStrategy::LeadingMultiplier => parse_captures(&LEADING_MULTIPLIER, line),
            LineStrategy::LeadingQuantity => parse_captures(&LEADING_QUANTITY, line),
            LineStrategy::TrailingMultiplier => parse_captures(&TRAILING_MULTIPLIER, line),
            LineStrategy::Parenthesized => parse_captures(&PARENTHESIZED, line),
            LineStrategy::BareName => parse_bare(line),
        }
    }
}

/// Parse one normalized line with the strategies in priority order.
pub fn parse_line(line: &str) -> Option<ParsedItem> {
    LineStrategy::ORDER.iter().find_map(|strategy| {
        let item = strategy.apply(line)?;
        tracing::trace!(
            strategy = strategy.label(),
            name = item.name(),
            quantity = item.quantity(),
            "parsed line"
        );
        Some(item)
    })
}

/// Drop later items whose trimmed, lowercased name was already seen.
///
/// The first occurrence wins, including its quantity.
pub fn dedup_items(items: Vec<ParsedItem>) -> Vec<ParsedItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.identity()))
        .collect()
}

/// Full text extraction: normalize every line, parse, de-duplicate.
pub fn extract_items(text: &str) -> Vec<ParsedItem> {
    let parsed: Vec<ParsedItem> = text
        .lines()
        .filter_map(normalize_line)
        .filter_map(|line| parse_line(&line))
        .collect();
    let parsed_count = parsed.len();
    let items = dedup_items(parsed);
    tracing::debug!(
        parsed = parsed_count,
        unique = items.len(),
        "extracted items from text"
    );
    items
}

// ── Strategies ───────────────────────────────────────────────────────────────

/// Quantity from a free-form field: its digits, or 1 when there are none.
fn quantity_from_digits(field: &str) -> u32 {
    let digits: String = field.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse::<u32>()
        .ok()
        .filter(|q| *q > 0)
        .unwrap_or(1)
}

fn parse_integer(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok()
}

fn parse_separator(line: &str) -> Option<ParsedItem> {
    let mut parts = line.split('|');
    let name = parts.next()?;
    let quantity_field = parts.next()?;
    ParsedItem::new(name, quantity_from_digits(quantity_field))
}

/// Two-capture patterns: whichever side parses as an integer is the
/// quantity, the other side is the name.
fn parse_captures(pattern: &Regex, line: &str) -> Option<ParsedItem> {
    let caps = pattern.captures(line)?;
    let first = caps.get(1)?.as_str();
    let second = caps.get(2)?.as_str();
    let (name, quantity) = match parse_integer(first) {
        Some(q) => (second, q),
        None => (first, parse_integer(second).unwrap_or(1)),
    };
    ParsedItem::new(name, quantity.max(1))
}

fn parse_bare(line: &str) -> Option<ParsedItem> {
    if line.contains('=') || line.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    ParsedItem::new(line, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, quantity: u32) -> ParsedItem {
        ParsedItem::new(name, quantity).unwrap()
    }

    #[test]
    fn separator_format() {
        assert_eq!(parse_line("eggs|3"), Some(item("eggs", 3)));
        assert_eq!(parse_line("hot sauce | 1"), Some(item("hot sauce", 1)));
    }

    #[test]
    fn separator_extracts_digits_from_quantity_field() {
        assert_eq!(parse_line("apples|x4"), Some(item("apples", 4)));
        assert_eq!(parse_line("apples|12 pcs"), Some(item("apples", 12)));
    }

    #[test]
    fn separator_without_digits_defaults_to_one() {
        assert_eq!(parse_line("bread|some"), Some(item("bread", 1)));
        assert_eq!(parse_line("bread|"), Some(item("bread", 1)));
    }

    #[test]
    fn separator_ignores_fields_after_the_second() {
        assert_eq!(parse_line("eggs|2|large"), Some(item("eggs", 2)));
    }

    #[test]
    fn quantity_placement_is_commutative() {
        let expected = Some(item("milk", 2));
        assert_eq!(parse_line("2x milk"), expected);
        assert_eq!(parse_line("milk x2"), expected);
        assert_eq!(parse_line("2 x milk"), expected);
        assert_eq!(parse_line("milk × 2"), expected);
    }

    #[test]
    fn leading_plain_quantity() {
        assert_eq!(parse_line("3 bananas"), Some(item("bananas", 3)));
    }

    #[test]
    fn parenthesized_quantity() {
        assert_eq!(parse_line("yogurt (6)"), Some(item("yogurt", 6)));
    }

    #[test]
    fn bare_name_defaults_to_one() {
        assert_eq!(parse_line("peanut butter"), Some(item("peanut butter", 1)));
    }

    #[test]
    fn pure_digits_and_equations_are_rejected() {
        assert_eq!(parse_line("42"), None);
        assert_eq!(parse_line("x=5"), None);
        assert_eq!(parse_line("total = 12"), None);
    }

    #[test]
    fn single_character_names_are_rejected() {
        assert_eq!(parse_line("a"), None);
        assert_eq!(LineStrategy::Separator.apply("a|3"), None);
    }

    #[test]
    fn zero_quantity_is_raised_to_one() {
        assert_eq!(parse_line("eggs|0"), Some(item("eggs", 1)));
        assert_eq!(parse_line("0 x eggs"), Some(item("eggs", 1)));
    }

    #[test]
    fn strategy_order_is_fixed() {
        assert_eq!(LineStrategy::ORDER[0], LineStrategy::Separator);
        assert_eq!(LineStrategy::ORDER[5], LineStrategy::BareName);
        // Separator wins over the leading-quantity reading.
        assert_eq!(parse_line("2 lemons|5"), Some(item("2 lemons", 5)));
    }

    #[test]
    fn each_strategy_is_independent() {
        assert_eq!(LineStrategy::LeadingMultiplier.apply("milk"), None);
        assert_eq!(
            LineStrategy::TrailingMultiplier.apply("milk x3"),
            Some(item("milk", 3))
        );
        assert_eq!(LineStrategy::Parenthesized.apply("milk x3"), None);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let items = vec![item("milk", 2), item("Milk", 5), item("eggs", 1)];
        let deduped = dedup_items(items);
        assert_eq!(deduped, vec![item("milk", 2), item("eggs", 1)]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let once = dedup_items(vec![item("milk", 2), item("MILK", 1)]);
        let twice = dedup_items(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn extract_items_from_vision_reply() {
        let reply = "Here is the list I can read:\n\
                     ```\n\
                     pepper|1\n\
                     hot sauce|1\n\
                     pepper|2\n\
                     ```\n";
        assert_eq!(
            extract_items(reply),
            vec![item("pepper", 1), item("hot sauce", 1)]
        );
    }

    #[test]
    fn extract_items_first_quantity_wins_across_lines() {
        assert_eq!(extract_items("milk|2\nMilk|5"), vec![item("milk", 2)]);
    }

    #[test]
    fn extract_items_handles_markdown_bullets() {
        let text = "# Groceries\n- **2x eggs**\n* bread\n\n42\n";
        assert_eq!(extract_items(text), vec![item("eggs", 2), item("bread", 1)]);
    }
}
