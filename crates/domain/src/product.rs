//! Catalog products.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::order::{Money, UnitKind};

/// Catalog categories carried by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Rice,
    Flour,
    Pulses,
    Oil,
    Essentials,
}

impl Category {
    /// Returns the category name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Rice => "rice",
            Category::Flour => "flour",
            Category::Pulses => "pulses",
            Category::Oil => "oil",
            Category::Essentials => "essentials",
        }
    }

    /// Parses a stored category name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rice" => Some(Category::Rice),
            "flour" => Some(Category::Flour),
            "pulses" => Some(Category::Pulses),
            "oil" => Some(Category::Oil),
            "essentials" => Some(Category::Essentials),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a product is priced.
///
/// A tagged variant rather than two optional price fields: a product is
/// always priced exactly one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "price", rename_all = "snake_case")]
pub enum Pricing {
    /// Sold by weight, price per kilogram.
    PerKg(Money),

    /// Sold individually, price per piece.
    PerPiece(Money),
}

impl Pricing {
    /// Returns the price for one unit (kilogram or piece).
    pub fn unit_price(&self) -> Money {
        match self {
            Pricing::PerKg(price) | Pricing::PerPiece(price) => *price,
        }
    }

    /// Returns the unit a quantity of this product counts.
    pub fn unit_kind(&self) -> UnitKind {
        match self {
            Pricing::PerKg(_) => UnitKind::Weight,
            Pricing::PerPiece(_) => UnitKind::Piece,
        }
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub pricing: Pricing,
    pub image: String,
    pub category: Category,
    pub stock: u32,
    pub brand: Option<String>,
    pub is_featured: bool,
}

impl Product {
    /// Creates a product with the required fields; stock, brand and the
    /// featured flag start at their defaults.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        pricing: Pricing,
        image: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            description: description.into(),
            pricing,
            image: image.into(),
            category,
            stock: 0,
            brand: None,
            is_featured: false,
        }
    }

    /// Case-insensitive substring match over name, brand and description.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self
                .brand
                .as_deref()
                .is_some_and(|b| b.to_lowercase().contains(&query))
    }
}
