//! Billing configuration

use std::fmt;

use crate::error::{Error, Result};

use super::signature::DEFAULT_TOLERANCE_SECS;

/// Environment variable holding the webhook signing secret (`whsec_...`)
pub const WEBHOOK_SECRET_ENV: &str = "STRIPE_WEBHOOK_SECRET";

/// Environment variable holding the billing API credential (`sk_...`)
pub const API_KEY_ENV: &str = "STRIPE_SECRET_KEY";

/// Environment variable overriding the signature timestamp tolerance
pub const TOLERANCE_ENV: &str = "STRIPE_WEBHOOK_TOLERANCE_SECS";

/// Billing configuration, loaded once at startup and injected into the
/// reconciler. Both secrets are mandatory.
#[derive(Clone)]
pub struct BillingConfig {
    /// Shared secret used to sign webhook payloads
    pub webhook_secret: String,
    /// Billing API credential
    pub api_key: String,
    /// Maximum accepted age of a signature timestamp, in seconds
    pub tolerance_secs: i64,
}

impl BillingConfig {
    /// Create a new billing config
    ///
    /// Fails if either secret is empty.
    pub fn new(webhook_secret: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let webhook_secret = webhook_secret.into();
        let api_key = api_key.into();

        if webhook_secret.trim().is_empty() {
            return Err(Error::Config(format!("{} must not be empty", WEBHOOK_SECRET_ENV)));
        }
        if api_key.trim().is_empty() {
            return Err(Error::Config(format!("{} must not be empty", API_KEY_ENV)));
        }

        Ok(Self {
            webhook_secret,
            api_key,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        })
    }

    /// Override the timestamp tolerance
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Load from environment variables
    ///
    /// Required: `STRIPE_WEBHOOK_SECRET`, `STRIPE_SECRET_KEY`
    /// Optional: `STRIPE_WEBHOOK_TOLERANCE_SECS` (default: 300)
    pub fn from_env() -> Result<Self> {
        let webhook_secret = std::env::var(WEBHOOK_SECRET_ENV)
            .map_err(|_| Error::Config(format!("{} is not set", WEBHOOK_SECRET_ENV)))?;
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::Config(format!("{} is not set", API_KEY_ENV)))?;

        let config = Self::new(webhook_secret, api_key)?;

        match std::env::var(TOLERANCE_ENV) {
            Ok(raw) => {
                let tolerance: i64 = raw.trim().parse().map_err(|_| {
                    Error::Config(format!("{} must be a number of seconds", TOLERANCE_ENV))
                })?;
                if tolerance <= 0 {
                    return Err(Error::Config(format!("{} must be positive", TOLERANCE_ENV)));
                }
                Ok(config.with_tolerance(tolerance))
            }
            Err(_) => Ok(config),
        }
    }
}

// Secrets never reach logs
impl fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BillingConfig")
            .field("webhook_secret", &"<redacted>")
            .field("api_key", &"<redacted>")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}
