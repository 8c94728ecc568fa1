//! Outbound payment gateway client.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;
use domain::Money;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Currency for all gateway sessions.
pub const CURRENCY: &str = "INR";

/// A remote payment session the client is redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
    /// The gateway's id for the session; webhooks reference it.
    pub session_id: String,

    /// Amount in minor units, as confirmed by the gateway.
    pub amount: Money,

    /// ISO currency code.
    pub currency: String,
}

/// Trait for opening remote payment sessions.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment session for the given amount.
    ///
    /// Implementations must bound the call with a timeout and surface
    /// failures as [`GatewayError::Unavailable`] rather than hang; the
    /// caller keeps the order pending and retries.
    async fn create_session(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<GatewaySession, GatewayError>;
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: String,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    id: String,
    amount: i64,
    currency: String,
}

/// HTTP client for the hosted payment gateway.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    /// Creates a client with bounded connect and request timeouts.
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self))]
    async fn create_session(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<GatewaySession, GatewayError> {
        let request = CreateSessionRequest {
            amount: amount.paise(),
            currency: CURRENCY,
            receipt: format!("order_{order_id}"),
        };

        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        let body: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Ok(GatewaySession {
            session_id: body.id,
            amount: Money::from_paise(body.amount),
            currency: body.currency,
        })
    }
}

#[derive(Debug, Default)]
struct MockGatewayState {
    sessions: Vec<(String, OrderId, Money)>,
    next_id: u32,
    fail: bool,
}

/// In-memory payment gateway for tests and keyless development.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    state: Arc<RwLock<MockGatewayState>>,
}

impl MockPaymentGateway {
    /// Creates a new mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail the next calls.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    /// Returns the number of sessions opened.
    pub fn session_count(&self) -> usize {
        self.state.read().unwrap().sessions.len()
    }

    /// Returns true if a session exists with the given id.
    pub fn has_session(&self, session_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .sessions
            .iter()
            .any(|(id, _, _)| id == session_id)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_session(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<GatewaySession, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail {
            return Err(GatewayError::Unavailable("gateway offline".to_string()));
        }

        state.next_id += 1;
        let session_id = format!("sess_{:04}", state.next_id);
        state.sessions.push((session_id.clone(), order_id, amount));

        Ok(GatewaySession {
            session_id,
            amount,
            currency: CURRENCY.to_string(),
        })
    }
}
