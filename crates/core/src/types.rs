//! Data model shared by every pipeline stage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// ParsedItem
// ──────────────────────────────────────────────

/// A `(name, quantity)` pair extracted from one line of free text.
///
/// Immutable once built. The name is trimmed and at least two characters
/// long; the quantity is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedItem {
    name: String,
    quantity: u32,
}

impl ParsedItem {
    /// Build an item, returning `None` when the name is shorter than two
    /// characters after trimming or the quantity is zero.
    pub fn new(name: &str, quantity: u32) -> Option<Self> {
        let name = name.trim();
        if name.chars().count() < 2 || quantity == 0 {
            return None;
        }
        Some(ParsedItem {
            name: name.to_string(),
            quantity,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Identity key used for de-duplication: trimmed, lowercased name.
    pub fn identity(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

// ──────────────────────────────────────────────
// Catalog products
// ──────────────────────────────────────────────

/// A catalog product as returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub description: String,
    /// Purchasable units in catalog order. The first one is what gets bought.
    #[serde(default)]
    pub units: Vec<PurchasableUnit>,
    /// Image URLs, best first.
    #[serde(default)]
    pub images: Vec<String>,
}

/// One purchasable variant of a product (a UPC with its own price and size).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasableUnit {
    pub unit_id: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub size: Option<String>,
}

impl Product {
    /// The unit that a resolution would put in the cart.
    pub fn primary_unit(&self) -> Option<&PurchasableUnit> {
        self.units.first()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// The concrete unit chosen for a name: what a pending line is built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedProduct {
    /// Identifier of the purchasable unit (the cart key).
    pub product_id: String,
    pub display_name: String,
    pub unit_price: Decimal,
    pub image_url: Option<String>,
}

impl ResolvedProduct {
    /// Pick the primary purchasable unit of `product`. `None` when the
    /// product has no unit to buy. A missing price reads as zero.
    pub fn from_product(product: &Product) -> Option<Self> {
        let unit = product.primary_unit()?;
        Some(ResolvedProduct {
            product_id: unit.unit_id.clone(),
            display_name: product.description.clone(),
            unit_price: unit.price.unwrap_or(Decimal::ZERO).max(Decimal::ZERO),
            image_url: product.image_url().map(str::to_string),
        })
    }
}

/// A parsed item paired with the outcome of resolving it.
///
/// `product` is `None` when the catalog had nothing usable; that is a normal
/// outcome and lands the name in the unavailable list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCandidate {
    pub item: ParsedItem,
    pub product: Option<ResolvedProduct>,
}

// ──────────────────────────────────────────────
// Cart lines
// ──────────────────────────────────────────────

/// A resolved line awaiting the user's confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingCartItem {
    pub product_id: String,
    pub display_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
}

impl PendingCartItem {
    pub fn new(product: ResolvedProduct, quantity: u32) -> Self {
        PendingCartItem {
            product_id: product.product_id,
            display_name: product.display_name,
            unit_price: product.unit_price,
            quantity: quantity.max(1),
            image_url: product.image_url,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Session-scoped mirror of a line that was committed to the remote cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalCartItem {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
}

impl From<&PendingCartItem> for LocalCartItem {
    fn from(item: &PendingCartItem) -> Self {
        LocalCartItem {
            product_id: item.product_id.clone(),
            name: item.display_name.clone(),
            price: item.unit_price,
            quantity: item.quantity,
            image_url: item.image_url.clone(),
        }
    }
}

/// The authoritative remote cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub cart_id: String,
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Placeholder id the remote side uses before a cart exists.
    pub const NEW_CART_ID: &'static str = "new";

    /// The cart a "not found" response stands for.
    pub fn empty() -> Self {
        Cart {
            cart_id: Self::NEW_CART_ID.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    #[serde(default)]
    pub description: String,
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<Decimal>,
}

// ──────────────────────────────────────────────
// Images
// ──────────────────────────────────────────────

/// An opaque image handed to the vision oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// Raw image bytes with their MIME type (e.g. `image/jpeg`).
    Raw { bytes: Vec<u8>, mime_type: String },
    /// An already-encoded `data:` URL.
    DataUrl(String),
}
