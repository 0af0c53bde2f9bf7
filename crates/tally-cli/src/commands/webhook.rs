//! Billing webhook tools
//!
//! `sign` produces the header the billing system would send for a payload,
//! so the `serve` endpoint can be exercised with curl. `verify` runs the same
//! checks as the endpoint without touching the identity store.

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::billing::{
    config::WEBHOOK_SECRET_ENV, BillingConfig, BillingEvent, BillingEventKind, SignatureVerifier,
};

/// The signing secret from `--secret` or the environment
pub fn webhook_secret(arg: Option<String>) -> Result<String> {
    arg.or_else(|| std::env::var(WEBHOOK_SECRET_ENV).ok())
        .filter(|s| !s.is_empty())
        .with_context(|| format!("Pass --secret or set {}", WEBHOOK_SECRET_ENV))
}

pub fn cmd_webhook_sign(file: &Path, secret: &str, timestamp: i64) -> Result<String> {
    let payload = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let verifier = SignatureVerifier::new(secret, 0)?;
    Ok(verifier.sign(&payload, timestamp))
}

pub fn cmd_webhook_verify(file: &Path, header: &str, secret: &str, tolerance: i64) -> Result<BillingEvent> {
    let payload = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let verifier = SignatureVerifier::new(secret, tolerance)?;
    let timestamp = verifier
        .verify(&payload, Some(header))
        .context("Signature verification failed")?;
    println!("✅ Signature valid (signed at {})", timestamp);

    let event = BillingEvent::from_slice(&payload).context("Event would be rejected")?;
    println!("   Event: {} ({})", event.id, event.kind.name());
    match &event.kind {
        BillingEventKind::PaymentSucceeded {
            user_id,
            customer_id,
            subscription_id,
        } => {
            println!(
                "   Would grant premium to {} (customer {}, subscription {})",
                user_id, customer_id, subscription_id
            );
        }
        BillingEventKind::SubscriptionDeleted { user_id } => {
            println!("   Would clear the plan of {}", user_id);
        }
        BillingEventKind::Other(_) => {
            println!("   Would be acknowledged without changes");
        }
    }

    Ok(event)
}

/// Load billing configuration, failing with the missing variable's name
pub fn load_billing_config() -> Result<BillingConfig> {
    BillingConfig::from_env().context("Billing webhook configuration is incomplete")
}
