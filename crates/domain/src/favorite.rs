//! Favorites: an owner's saved products.

use chrono::{DateTime, Utc};
use common::{OwnerId, ProductId};
use serde::{Deserialize, Serialize};

/// A saved product. The `(owner_id, product_id)` pair is unique; toggling
/// creates and destroys these records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub owner_id: OwnerId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    /// Creates a new favorite for the given owner and product.
    pub fn new(owner_id: OwnerId, product_id: ProductId) -> Self {
        Self {
            owner_id,
            product_id,
            created_at: Utc::now(),
        }
    }
}
