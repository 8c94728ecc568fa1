use std::sync::Arc;

use async_trait::async_trait;
use common::{AddressId, OrderId, OwnerId, ProductId};
use domain::{Address, Favorite, Order, OrderTransition, Product};
use tokio::sync::RwLock;

use crate::{
    ProductFilter, Result, StoreError,
    store::{AddressStore, FavoriteStore, OrderStore, ProductCatalog},
};

#[derive(Default)]
struct State {
    addresses: Vec<Address>,
    orders: Vec<Order>,
    products: Vec<Product>,
    favorites: Vec<Favorite>,
}

/// In-memory store implementation for tests and single-process development.
///
/// All four collections live behind one `RwLock`, so every multi-step
/// invariant (default-address clear-then-set, transition guards) runs inside
/// a single write-lock critical section and provides the same atomicity the
/// PostgreSQL implementation gets from transactions and conditional updates.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Replaces a product in place, keeping its id. Returns false when the
    /// product is unknown. Catalog edits happen out-of-band in production;
    /// this exists so tests can change prices under existing orders.
    pub async fn replace_product(&self, product: Product) -> bool {
        let mut state = self.state.write().await;
        match state.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => {
                *existing = product;
                true
            }
            None => false,
        }
    }

    /// Clears all collections.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.addresses.clear();
        state.orders.clear();
        state.products.clear();
        state.favorites.clear();
    }
}

#[async_trait]
impl AddressStore for InMemoryStore {
    async fn list_addresses(&self, owner: OwnerId) -> Result<Vec<Address>> {
        let state = self.state.read().await;
        let mut addresses: Vec<_> = state
            .addresses
            .iter()
            .filter(|a| a.owner_id == owner)
            .cloned()
            .collect();
        addresses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(addresses)
    }

    async fn insert_address(&self, mut address: Address) -> Result<Address> {
        let mut state = self.state.write().await;

        let owner = address.owner_id;
        let is_first = !state.addresses.iter().any(|a| a.owner_id == owner);
        if is_first {
            address.is_default = true;
        } else if address.is_default {
            for existing in state.addresses.iter_mut().filter(|a| a.owner_id == owner) {
                existing.is_default = false;
            }
        }

        state.addresses.push(address.clone());
        Ok(address)
    }

    async fn get_address(&self, owner: OwnerId, id: AddressId) -> Result<Option<Address>> {
        let state = self.state.read().await;
        Ok(state
            .addresses
            .iter()
            .find(|a| a.owner_id == owner && a.id == id)
            .cloned())
    }

    async fn delete_address(&self, owner: OwnerId, id: AddressId) -> Result<()> {
        let mut state = self.state.write().await;

        let position = state
            .addresses
            .iter()
            .position(|a| a.owner_id == owner && a.id == id)
            .ok_or(StoreError::NotFound)?;
        let removed = state.addresses.remove(position);

        if removed.is_default
            && let Some(promoted) = state
                .addresses
                .iter_mut()
                .filter(|a| a.owner_id == owner)
                .max_by_key(|a| a.created_at)
        {
            promoted.is_default = true;
        }

        Ok(())
    }

    async fn set_default_address(&self, owner: OwnerId, id: AddressId) -> Result<Address> {
        let mut state = self.state.write().await;

        if !state
            .addresses
            .iter()
            .any(|a| a.owner_id == owner && a.id == id)
        {
            return Err(StoreError::NotFound);
        }

        for address in state.addresses.iter_mut().filter(|a| a.owner_id == owner) {
            address.is_default = address.id == id;
        }

        state
            .addresses
            .iter()
            .find(|a| a.owner_id == owner && a.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.push(order.clone());
        Ok(())
    }

    async fn get_order(&self, owner: OwnerId, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.owner_id == owner && o.id == id)
            .cloned())
    }

    async fn list_orders(&self, owner: OwnerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .iter()
            .filter(|o| o.owner_id == owner)
            .cloned()
            .collect();
        orders.reverse();
        Ok(orders)
    }

    async fn latest_order(&self, owner: OwnerId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .find(|o| o.owner_id == owner)
            .cloned())
    }

    async fn find_by_gateway_session(&self, session_id: &str) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.gateway_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn claim_gateway_session(&self, id: OrderId, session_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::NotFound)?;

        if order.gateway_session_id.is_some() {
            return Ok(false);
        }
        order.gateway_session_id = Some(session_id.to_string());
        Ok(true)
    }

    async fn apply_transition(
        &self,
        id: OrderId,
        transition: &OrderTransition,
    ) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::NotFound)?;

        if !transition.guard(order.payment_state, order.order_state) {
            return Ok(None);
        }
        order.apply(transition);
        Ok(Some(order.clone()))
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        state.products.push(product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn related_products(&self, id: ProductId, limit: usize) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let base = state
            .products
            .iter()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;

        let mut related: Vec<_> = state
            .products
            .iter()
            .filter(|p| p.category == base.category && p.id != id)
            .cloned()
            .collect();
        related.sort_by_key(|p| p.id.as_uuid());
        related.truncate(limit);
        Ok(related)
    }
}

#[async_trait]
impl FavoriteStore for InMemoryStore {
    async fn list_favorites(&self, owner: OwnerId) -> Result<Vec<Favorite>> {
        let state = self.state.read().await;
        let mut favorites: Vec<_> = state
            .favorites
            .iter()
            .filter(|f| f.owner_id == owner)
            .cloned()
            .collect();
        favorites.reverse();
        Ok(favorites)
    }

    async fn add_favorite(&self, favorite: Favorite) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .favorites
            .iter()
            .any(|f| f.owner_id == favorite.owner_id && f.product_id == favorite.product_id)
        {
            return Err(StoreError::Conflict("already in favorites".to_string()));
        }
        state.favorites.push(favorite);
        Ok(())
    }

    async fn remove_favorite(&self, owner: OwnerId, product: ProductId) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.favorites.len();
        state
            .favorites
            .retain(|f| !(f.owner_id == owner && f.product_id == product));
        Ok(state.favorites.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{
        AddressKind, AddressSnapshot, Category, LineItem, Money, NewAddress, OrderState,
        PaymentMethod, PaymentState, Pricing,
    };

    fn new_address(is_default: bool) -> NewAddress {
        NewAddress {
            kind: AddressKind::Home,
            street: "12 Market Road".into(),
            city: "Pune".into(),
            region: "Maharashtra".into(),
            postal_code: "411001".into(),
            is_default,
        }
    }

    fn default_count(addresses: &[Address]) -> usize {
        addresses.iter().filter(|a| a.is_default).count()
    }

    fn gateway_order(owner: OwnerId) -> Order {
        let items = vec![LineItem::new(
            ProductId::new(),
            "Basmati Rice",
            2,
            Money::from_paise(12000),
            domain::UnitKind::Weight,
        )];
        let shipping = AddressSnapshot {
            street: "12 Market Road".into(),
            city: "Pune".into(),
            region: "Maharashtra".into(),
            postal_code: "411001".into(),
        };
        Order::create(owner, items, shipping, PaymentMethod::Gateway).unwrap()
    }

    #[tokio::test]
    async fn first_address_becomes_default() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();

        let address = Address::new(owner, new_address(false)).unwrap();
        let stored = store.insert_address(address).await.unwrap();
        assert!(stored.is_default);
    }

    #[tokio::test]
    async fn requested_default_clears_previous() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();

        let first = store
            .insert_address(Address::new(owner, new_address(false)).unwrap())
            .await
            .unwrap();
        let second = store
            .insert_address(Address::new(owner, new_address(true)).unwrap())
            .await
            .unwrap();

        let addresses = store.list_addresses(owner).await.unwrap();
        assert_eq!(default_count(&addresses), 1);
        let default = addresses.iter().find(|a| a.is_default).unwrap();
        assert_eq!(default.id, second.id);
        assert_ne!(default.id, first.id);
    }

    #[tokio::test]
    async fn set_default_swaps_exactly_one_flag() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();

        let a = store
            .insert_address(Address::new(owner, new_address(false)).unwrap())
            .await
            .unwrap();
        let b = store
            .insert_address(Address::new(owner, new_address(false)).unwrap())
            .await
            .unwrap();
        assert!(a.is_default);
        assert!(!b.is_default);

        let updated = store.set_default_address(owner, b.id).await.unwrap();
        assert!(updated.is_default);

        let addresses = store.list_addresses(owner).await.unwrap();
        assert_eq!(default_count(&addresses), 1);
        assert!(!addresses.iter().find(|x| x.id == a.id).unwrap().is_default);
    }

    #[tokio::test]
    async fn set_default_for_foreign_address_is_not_found() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();
        let intruder = OwnerId::new();

        let victim_default = store
            .insert_address(Address::new(owner, new_address(false)).unwrap())
            .await
            .unwrap();

        let result = store.set_default_address(intruder, victim_default.id).await;
        assert!(matches!(result, Err(StoreError::NotFound)));

        let addresses = store.list_addresses(owner).await.unwrap();
        assert!(addresses[0].is_default);
    }

    #[tokio::test]
    async fn deleting_default_promotes_most_recent() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();

        let a = store
            .insert_address(Address::new(owner, new_address(false)).unwrap())
            .await
            .unwrap();
        let b = store
            .insert_address(Address::new(owner, new_address(false)).unwrap())
            .await
            .unwrap();
        let c = store
            .insert_address(Address::new(owner, new_address(false)).unwrap())
            .await
            .unwrap();

        store.delete_address(owner, a.id).await.unwrap();

        let addresses = store.list_addresses(owner).await.unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(default_count(&addresses), 1);
        // c was created after b, so c is promoted.
        assert!(addresses.iter().find(|x| x.id == c.id).unwrap().is_default);
        assert!(!addresses.iter().find(|x| x.id == b.id).unwrap().is_default);
    }

    #[tokio::test]
    async fn default_invariant_holds_across_operation_sequences() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();

        let mut ids = Vec::new();
        for requested_default in [false, true, false, true, false] {
            let stored = store
                .insert_address(Address::new(owner, new_address(requested_default)).unwrap())
                .await
                .unwrap();
            ids.push(stored.id);
        }

        store.set_default_address(owner, ids[0]).await.unwrap();
        store.delete_address(owner, ids[0]).await.unwrap();
        store.delete_address(owner, ids[4]).await.unwrap();
        store.set_default_address(owner, ids[2]).await.unwrap();

        let addresses = store.list_addresses(owner).await.unwrap();
        assert_eq!(default_count(&addresses), addresses.len().min(1));

        // Drain to zero: invariant becomes min(1, 0) = 0.
        for address in store.list_addresses(owner).await.unwrap() {
            store.delete_address(owner, address.id).await.unwrap();
        }
        assert!(store.list_addresses(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn capture_transition_applies_once() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();
        let order = gateway_order(owner);
        store.insert_order(&order).await.unwrap();

        let capture = OrderTransition::PaymentCaptured {
            payment_ref: "pay_1".into(),
        };

        let first = store.apply_transition(order.id, &capture).await.unwrap();
        let updated = first.expect("guard should match a pending order");
        assert_eq!(updated.payment_state, PaymentState::Completed);
        assert_eq!(updated.order_state, OrderState::Processing);

        // Second delivery loses the compare-and-set.
        let second = store.apply_transition(order.id, &capture).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn transition_on_unknown_order_is_not_found() {
        let store = InMemoryStore::new();
        let result = store
            .apply_transition(OrderId::new(), &OrderTransition::PaymentFailed)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn gateway_session_claimed_once() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();
        let order = gateway_order(owner);
        store.insert_order(&order).await.unwrap();

        assert!(store
            .claim_gateway_session(order.id, "sess_1")
            .await
            .unwrap());
        assert!(!store
            .claim_gateway_session(order.id, "sess_2")
            .await
            .unwrap());

        let stored = store
            .find_by_gateway_session("sess_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, order.id);
        assert!(store
            .find_by_gateway_session("sess_2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn orders_list_newest_first() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();

        let first = gateway_order(owner);
        let second = gateway_order(owner);
        store.insert_order(&first).await.unwrap();
        store.insert_order(&second).await.unwrap();
        store.insert_order(&gateway_order(OwnerId::new())).await.unwrap();

        let orders = store.list_orders(owner).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second.id);
        assert_eq!(orders[1].id, first.id);

        let latest = store.latest_order(owner).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn duplicate_favorite_conflicts() {
        let store = InMemoryStore::new();
        let owner = OwnerId::new();
        let product = ProductId::new();

        store
            .add_favorite(Favorite::new(owner, product))
            .await
            .unwrap();
        let result = store.add_favorite(Favorite::new(owner, product)).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        assert!(store.remove_favorite(owner, product).await.unwrap());
        assert!(!store.remove_favorite(owner, product).await.unwrap());
    }

    #[tokio::test]
    async fn related_products_same_category_excluding_base() {
        let store = InMemoryStore::new();

        let base = Product::new(
            "Basmati Rice",
            "Long-grain aromatic rice",
            Pricing::PerKg(Money::from_paise(12000)),
            "/images/basmati.jpg",
            Category::Rice,
        );
        store.insert_product(&base).await.unwrap();
        for name in ["Sona Masoori", "Brown Rice", "Idli Rice", "Poha", "Jeera Rice"] {
            let product = Product::new(
                name,
                "Rice aisle",
                Pricing::PerKg(Money::from_paise(9000)),
                "/images/rice.jpg",
                Category::Rice,
            );
            store.insert_product(&product).await.unwrap();
        }
        let oil = Product::new(
            "Sunflower Oil",
            "Refined oil",
            Pricing::PerPiece(Money::from_paise(19900)),
            "/images/oil.jpg",
            Category::Oil,
        );
        store.insert_product(&oil).await.unwrap();

        let related = store.related_products(base.id, 4).await.unwrap();
        assert_eq!(related.len(), 4);
        assert!(related.iter().all(|p| p.category == Category::Rice));
        assert!(related.iter().all(|p| p.id != base.id));

        let missing = store.related_products(ProductId::new(), 4).await;
        assert!(matches!(missing, Err(StoreError::NotFound)));
    }
}
