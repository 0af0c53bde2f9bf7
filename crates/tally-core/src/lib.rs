//! Tally Core Library
//!
//! Shared functionality for the Tally personal finance dashboard:
//! - Billing webhook verification and typed billing events
//! - Entitlement reconciler mirroring subscriptions into the identity store
//! - Identity store backends (Clerk, in-memory)
//! - Transaction storage and monthly dashboards (SQLite)
//! - Premium AI reports over an OpenAI-compatible completion API

pub mod ai;
pub mod billing;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod reconciler;

/// Test utilities including mock Clerk and completion servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AiReport, MockBackend, OpenAICompatibleBackend, ReportGenerator};
pub use billing::{
    BillingConfig, BillingEvent, BillingEventKind, SignatureError, SignatureVerifier,
    WebhookError,
};
pub use db::Database;
pub use error::{Error, Result};
pub use identity::{
    ClerkClient, EntitlementUpdate, IdentityStore, InMemoryIdentityStore, SubscriptionPlan,
    UserEntitlement,
};
pub use reconciler::{Acknowledgement, EntitlementReconciler};
