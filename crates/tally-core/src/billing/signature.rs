//! Stripe webhook signature scheme
//!
//! The `stripe-signature` header looks like `t=1700000000,v1=5257a8...,v0=...`.
//! Each `v1` entry is a hex HMAC-SHA256 of `"{t}.{raw body}"` keyed with the
//! endpoint's signing secret. Several `v1` entries may be present while a
//! secret is being rolled; one match is enough.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::config::BillingConfig;
use super::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// HTTP header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Default maximum age of a signed timestamp (5 minutes)
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verifies (and, for tooling, produces) webhook signatures
#[derive(Clone)]
pub struct SignatureVerifier {
    mac: HmacSha256,
    tolerance_secs: i64,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

/// Parsed `stripe-signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

impl SignatureVerifier {
    /// Create a verifier keyed with the signing secret
    pub fn new(secret: &str, tolerance_secs: i64) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid webhook secret: {}", e)))?;
        Ok(Self {
            mac,
            tolerance_secs,
        })
    }

    /// Create a verifier from the billing configuration
    pub fn from_config(config: &BillingConfig) -> Result<Self> {
        Self::new(&config.webhook_secret, config.tolerance_secs)
    }

    /// Verify a header against the untouched request body, using the current time
    ///
    /// Returns the signed timestamp on success.
    pub fn verify(
        &self,
        payload: &[u8],
        header: Option<&str>,
    ) -> std::result::Result<i64, SignatureError> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    /// Verify a header against the untouched request body at a given time
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> std::result::Result<i64, SignatureError> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SignatureError::MissingHeader)?;

        let parsed = parse_header(header)?;

        let matched = parsed.signatures.iter().any(|candidate| {
            let Ok(expected) = hex::decode(candidate) else {
                debug!("Skipping non-hex v1 signature");
                return false;
            };
            self.keyed(parsed.timestamp, payload)
                .verify_slice(&expected)
                .is_ok()
        });

        if !matched {
            warn!("Webhook signature verification failed");
            return Err(SignatureError::Mismatch);
        }

        // Only stale timestamps are rejected; clock skew into the future is tolerated
        if self.tolerance_secs > 0 && parsed.timestamp < now - self.tolerance_secs {
            warn!(
                timestamp = parsed.timestamp,
                now = now,
                "Webhook timestamp outside tolerance"
            );
            return Err(SignatureError::TimestampOutsideTolerance {
                timestamp: parsed.timestamp,
                now,
            });
        }

        Ok(parsed.timestamp)
    }

    /// Produce a header value for `payload` signed at `timestamp`
    ///
    /// Used by the CLI and tests to emit events the way the billing system does.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        let signature = hex::encode(self.keyed(timestamp, payload).finalize().into_bytes());
        format!("t={},v1={}", timestamp, signature)
    }

    fn keyed(&self, timestamp: i64, payload: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    }
}

/// Parse `t=...,v1=...,v1=...`; unknown schemes (e.g. `v0`) are ignored
fn parse_header(header: &str) -> std::result::Result<SignatureHeader<'_>, SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim() {
            "t" => {
                let ts = value.trim().parse::<i64>().map_err(|_| {
                    SignatureError::MalformedHeader(format!("invalid timestamp '{}'", value))
                })?;
                timestamp = Some(ts);
            }
            "v1" => signatures.push(value.trim()),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| SignatureError::MalformedHeader("missing timestamp".into()))?;

    if signatures.is_empty() {
        return Err(SignatureError::NoSignatures);
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}
