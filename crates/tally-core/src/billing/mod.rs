//! Billing integration (Stripe)
//!
//! - `config` - Signing secret and API credential, loaded once at startup
//! - `signature` - `stripe-signature` header verification and generation
//! - `event` - Typed billing events parsed from the signed envelope
//! - `error` - Signature and webhook processing errors

pub mod config;
pub mod error;
pub mod event;
pub mod signature;

pub use config::BillingConfig;
pub use error::{SignatureError, WebhookError};
pub use event::{BillingEvent, BillingEventKind, PAYMENT_SUCCEEDED, SUBSCRIPTION_DELETED};
pub use signature::{SignatureVerifier, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};
