//! Identity store abstraction
//!
//! User entitlements (premium or not, plus the billing references that link a
//! user to a billing customer and subscription) live in an external identity
//! provider. This module defines the capability the rest of the crate needs
//! from that provider.
//!
//! - `IdentityStore` trait: read and overwrite a user's entitlement
//! - `ClerkClient`: Clerk backend API implementation (user metadata)
//! - `InMemoryIdentityStore`: process-local implementation for development and tests

mod clerk;
mod memory;

pub use clerk::ClerkClient;
pub use memory::InMemoryIdentityStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Paid plan attached to a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Premium,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Premium => "premium",
        }
    }
}

impl std::str::FromStr for SubscriptionPlan {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "premium" => Ok(Self::Premium),
            _ => Err(format!("Unknown subscription plan: {}", s)),
        }
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether `user_id` fits the identity provider's id alphabet (`[A-Za-z0-9_-]`, at most 128 chars)
pub fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id.len() <= 128
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A user's entitlement record as stored by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntitlement {
    pub user_id: String,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,
}

impl UserEntitlement {
    /// A user with no plan and no billing references
    pub fn free(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            subscription_plan: None,
            billing_customer_id: None,
            billing_subscription_id: None,
        }
    }

    pub fn is_premium(&self) -> bool {
        self.subscription_plan == Some(SubscriptionPlan::Premium)
    }
}

/// Full overwrite of a user's entitlement fields
///
/// `None` clears the field. Applying the same update twice is the same as
/// applying it once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementUpdate {
    pub subscription_plan: Option<SubscriptionPlan>,
    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,
}

impl EntitlementUpdate {
    /// Grant premium and remember the billing references
    pub fn premium(customer_id: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_plan: Some(SubscriptionPlan::Premium),
            billing_customer_id: Some(customer_id.into()),
            billing_subscription_id: Some(subscription_id.into()),
        }
    }

    /// Revoke the plan and forget the billing references
    pub fn cleared() -> Self {
        Self {
            subscription_plan: None,
            billing_customer_id: None,
            billing_subscription_id: None,
        }
    }

    /// The record that results from applying this update to `user_id`
    pub fn apply_to(&self, user_id: &str) -> UserEntitlement {
        UserEntitlement {
            user_id: user_id.to_string(),
            subscription_plan: self.subscription_plan,
            billing_customer_id: self.billing_customer_id.clone(),
            billing_subscription_id: self.billing_subscription_id.clone(),
        }
    }
}

/// Capability to read and overwrite user entitlements in the identity provider
///
/// Implementations must be Send + Sync; one instance is shared by all
/// request handlers. Writes are last-write-wins.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Overwrite the entitlement fields of `user_id`
    async fn update_user_entitlement(&self, user_id: &str, update: &EntitlementUpdate)
        -> Result<()>;

    /// Read the entitlement of `user_id`; `None` if the user does not exist
    async fn get_user_entitlement(&self, user_id: &str) -> Result<Option<UserEntitlement>>;
}
