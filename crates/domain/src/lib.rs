//! Domain layer for the storefront.
//!
//! This crate provides the persistent record types and the rules that govern
//! them:
//! - Address book records with the single-default invariant helpers
//! - Catalog products with tagged per-weight/per-piece pricing
//! - Orders with immutable line-item snapshots and a server-computed total
//! - The order/payment state machine and its transition guards

pub mod address;
pub mod favorite;
pub mod order;
pub mod product;

pub use address::{Address, AddressError, AddressKind, NewAddress, POSTAL_CODE_LEN};
pub use favorite::Favorite;
pub use order::{
    AddressSnapshot, LineItem, Money, Order, OrderError, OrderState, OrderTransition,
    PaymentMethod, PaymentState, UnitKind,
};
pub use product::{Category, Pricing, Product};
