//! Application configuration loaded from environment variables.

/// Payment gateway configuration.
///
/// Without `GATEWAY_KEY_ID` the server falls back to the mock gateway, so
/// local development works without credentials.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub key_id: Option<String>,
    pub key_secret: String,
    pub webhook_secret: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL URL; in-memory store when unset
/// - `GATEWAY_URL` — payment gateway base URL
/// - `GATEWAY_KEY_ID` / `GATEWAY_KEY_SECRET` — gateway API credentials
/// - `GATEWAY_WEBHOOK_SECRET` — shared secret for webhook signatures
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub gateway: GatewayConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            gateway: GatewayConfig {
                url: std::env::var("GATEWAY_URL")
                    .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
                key_id: std::env::var("GATEWAY_KEY_ID").ok(),
                key_secret: std::env::var("GATEWAY_KEY_SECRET").unwrap_or_default(),
                webhook_secret: std::env::var("GATEWAY_WEBHOOK_SECRET")
                    .unwrap_or_else(|_| "dev-webhook-secret".to_string()),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            gateway: GatewayConfig {
                url: "https://api.razorpay.com".to_string(),
                key_id: None,
                key_secret: String::new(),
                webhook_secret: "dev-webhook-secret".to_string(),
            },
        }
    }
}
