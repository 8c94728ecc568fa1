//! Payment gateway adapter.
//!
//! Three pieces:
//! - [`PaymentGateway`]: the outbound side, opening remote payment sessions
//!   with a bounded timeout ([`HttpPaymentGateway`] for the real gateway,
//!   [`MockPaymentGateway`] for tests and keyless development).
//! - [`signature`]: HMAC-SHA256 verification of webhook payloads over the
//!   exact raw bytes received, compared in constant time.
//! - [`CheckoutFlow`]: the orchestration between the order ledger and the
//!   gateway — open-session with session reuse on retry, and
//!   verify-and-apply with idempotent handling of redelivered events.

pub mod client;
pub mod error;
pub mod flow;
pub mod signature;

pub use client::{CURRENCY, GatewaySession, HttpPaymentGateway, MockPaymentGateway, PaymentGateway};
pub use error::GatewayError;
pub use flow::CheckoutFlow;
pub use signature::{sign, verify_signature};
