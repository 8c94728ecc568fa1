//! Catalog query filters.

use domain::{Category, Product};

/// Filter for listing catalog products.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to one category.
    pub category: Option<Category>,

    /// Case-insensitive substring match over name, brand and description.
    pub search: Option<String>,
}

impl ProductFilter {
    /// Creates an empty filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the filter to a category.
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Adds a search term.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Returns true if the product passes the filter.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category
            && product.category != category
        {
            return false;
        }
        if let Some(ref term) = self.search
            && !product.matches_search(term)
        {
            return false;
        }
        true
    }
}
