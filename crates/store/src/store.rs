use async_trait::async_trait;
use common::{AddressId, OrderId, OwnerId, ProductId};
use domain::{Address, Favorite, Order, OrderTransition, Product};

use crate::{ProductFilter, Result};

/// Address book operations.
///
/// Implementations must preserve the single-default invariant: for a given
/// owner, at most one address is default, and exactly one when the owner has
/// any. The clear-then-set in [`insert_address`](Self::insert_address) and
/// [`set_default_address`](Self::set_default_address), and the promotion in
/// [`delete_address`](Self::delete_address), are applied as one atomic unit;
/// a concurrent reader never observes zero or two defaults.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Lists the owner's addresses, newest first.
    async fn list_addresses(&self, owner: OwnerId) -> Result<Vec<Address>>;

    /// Inserts a validated address record.
    ///
    /// The owner's first address is stored as default regardless of the
    /// requested flag; otherwise a requested default clears the previous
    /// one. Returns the record as stored.
    async fn insert_address(&self, address: Address) -> Result<Address>;

    /// Fetches one of the owner's addresses.
    async fn get_address(&self, owner: OwnerId, id: AddressId) -> Result<Option<Address>>;

    /// Deletes an owner's address.
    ///
    /// Fails with `NotFound` when the id does not belong to the owner. When
    /// the deleted address was the default and others remain, the most
    /// recently created remaining address is promoted.
    async fn delete_address(&self, owner: OwnerId, id: AddressId) -> Result<()>;

    /// Makes the given address the owner's only default.
    ///
    /// Fails with `NotFound` when the id does not belong to the owner; the
    /// owner's previous default is untouched in that case.
    async fn set_default_address(&self, owner: OwnerId, id: AddressId) -> Result<Address>;
}

/// Order ledger operations.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a freshly created order.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Fetches one of the owner's orders.
    async fn get_order(&self, owner: OwnerId, id: OrderId) -> Result<Option<Order>>;

    /// Lists the owner's orders, newest first.
    async fn list_orders(&self, owner: OwnerId) -> Result<Vec<Order>>;

    /// Returns the owner's most recent order, if any.
    async fn latest_order(&self, owner: OwnerId) -> Result<Option<Order>>;

    /// Resolves an order by its remote gateway session id.
    ///
    /// Used only by the webhook path, where trust comes from the verified
    /// signature rather than an owner credential.
    async fn find_by_gateway_session(&self, session_id: &str) -> Result<Option<Order>>;

    /// Records the remote session id if none is set yet.
    ///
    /// Returns false when a session id is already recorded; the caller
    /// re-reads the order and reuses it instead of opening a second remote
    /// session.
    async fn claim_gateway_session(&self, id: OrderId, session_id: &str) -> Result<bool>;

    /// Applies a guarded state transition as a single conditional update.
    ///
    /// The transition's guard is evaluated inside the same atomic update
    /// that writes the new state (compare-and-set). Returns the updated
    /// order when the guard matched, `None` when it did not (the caller
    /// re-reads to distinguish an idempotent repeat from a real conflict),
    /// and `NotFound` when no such order exists.
    async fn apply_transition(
        &self,
        id: OrderId,
        transition: &OrderTransition,
    ) -> Result<Option<Order>>;
}

/// Read-mostly catalog access. `insert_product` exists for seeding and tests.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Adds a product to the catalog.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Fetches a product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists products matching the filter.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;

    /// Returns up to `limit` other products from the same category, in
    /// stable id order. Fails with `NotFound` when the base product is
    /// missing.
    async fn related_products(&self, id: ProductId, limit: usize) -> Result<Vec<Product>>;
}

/// Favorites operations. The `(owner, product)` pair is unique.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Lists the owner's favorites, newest first.
    async fn list_favorites(&self, owner: OwnerId) -> Result<Vec<Favorite>>;

    /// Adds a favorite; `Conflict` on a duplicate pair.
    async fn add_favorite(&self, favorite: Favorite) -> Result<()>;

    /// Removes a favorite. Returns true if one existed.
    async fn remove_favorite(&self, owner: OwnerId, product: ProductId) -> Result<bool>;
}

/// Everything the API needs from persistence.
pub trait Store: AddressStore + OrderStore + ProductCatalog + FavoriteStore {}

impl<T: AddressStore + OrderStore + ProductCatalog + FavoriteStore> Store for T {}
