//! Billing webhook errors

use thiserror::Error;

/// Reasons a `stripe-signature` header fails verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,

    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    #[error("no v1 signature in header")]
    NoSignatures,

    #[error("no signature matches the payload")]
    Mismatch,

    #[error("timestamp {timestamp} is outside the tolerance window (now: {now})")]
    TimestampOutsideTolerance { timestamp: i64, now: i64 },
}

/// Failure while handling a billing webhook
///
/// Every variant results in a failure acknowledgement; the billing system
/// redelivers according to its own retry policy.
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Signature missing or invalid. Nothing was mutated.
    #[error("webhook authentication failed: {0}")]
    Authentication(#[from] SignatureError),

    /// Envelope unparseable or correlation fields absent. Nothing was mutated.
    #[error("malformed billing event: {0}")]
    MalformedEvent(String),

    /// The identity store rejected the entitlement update.
    #[error("entitlement update failed: {0}")]
    DownstreamMutation(#[source] crate::error::Error),
}

impl WebhookError {
    /// Whether the failure is the sender's fault (bad signature or payload)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::MalformedEvent(_))
    }
}
