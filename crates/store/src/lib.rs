//! Persistence layer for the storefront.
//!
//! Each collection (addresses, orders, products, favorites) is exposed
//! through an async trait, with two implementations: [`InMemoryStore`] for
//! tests and single-process development, and [`PostgresStore`] for
//! production. Both keep the cross-request invariants atomic: the
//! default-address clear-then-set runs as one critical section or
//! transaction, and order state transitions are compare-and-set updates
//! guarded on the pre-transition state.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::ProductFilter;
pub use store::{AddressStore, FavoriteStore, OrderStore, ProductCatalog, Store};
