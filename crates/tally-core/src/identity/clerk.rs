//! Clerk backend API implementation of `IdentityStore`
//!
//! Entitlements are kept in user metadata:
//! - `public_metadata.subscriptionPlan`: `"premium"` or absent (readable by the front end)
//! - `private_metadata.stripeCustomerId` / `stripeSubscriptionId`: billing references
//!
//! Clerk merges metadata patches and deletes keys set to `null`, so an update
//! is a full overwrite of exactly these three keys.
//!
//! # Configuration
//!
//! Environment variables:
//! - `CLERK_SECRET_KEY`: Backend API secret key (required)
//! - `CLERK_API_URL`: API base URL (default: https://api.clerk.com)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::{is_valid_user_id, EntitlementUpdate, IdentityStore, SubscriptionPlan, UserEntitlement};

/// Default Clerk backend API URL
pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ClerkClient {
    http_client: Client,
    base_url: String,
    secret_key: String,
}

impl std::fmt::Debug for ClerkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkClient")
            .field("base_url", &self.base_url)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl ClerkClient {
    /// Create a client against the public Clerk API
    pub fn new(secret_key: &str) -> Self {
        Self::with_base_url(DEFAULT_CLERK_API_URL, secret_key)
    }

    /// Create a client against a specific API base URL
    pub fn with_base_url(base_url: &str, secret_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// Create from environment variables
    ///
    /// Required: `CLERK_SECRET_KEY`
    /// Optional: `CLERK_API_URL` (default: https://api.clerk.com)
    pub fn from_env() -> Option<Self> {
        let secret_key = std::env::var("CLERK_SECRET_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())?;
        let base_url =
            std::env::var("CLERK_API_URL").unwrap_or_else(|_| DEFAULT_CLERK_API_URL.to_string());
        Some(Self::with_base_url(&base_url, &secret_key))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn user_url(&self, user_id: &str) -> Result<String> {
        validate_user_id(user_id)?;
        Ok(format!("{}/v1/users/{}", self.base_url, user_id))
    }
}

/// User ids are interpolated into URL paths; only accept Clerk's id alphabet
fn validate_user_id(user_id: &str) -> Result<()> {
    if is_valid_user_id(user_id) {
        Ok(())
    } else {
        Err(Error::InvalidData(format!("Invalid user id: {:?}", user_id)))
    }
}

#[async_trait]
impl IdentityStore for ClerkClient {
    async fn update_user_entitlement(
        &self,
        user_id: &str,
        update: &EntitlementUpdate,
    ) -> Result<()> {
        let url = format!("{}/metadata", self.user_url(user_id)?);

        let body = json!({
            "public_metadata": {
                "subscriptionPlan": update.subscription_plan.map(|p| p.as_str()),
            },
            "private_metadata": {
                "stripeCustomerId": update.billing_customer_id,
                "stripeSubscriptionId": update.billing_subscription_id,
            },
        });

        debug!(user_id, plan = ?update.subscription_plan, "Updating Clerk user metadata");

        let response = self
            .http_client
            .patch(&url)
            .bearer_auth(&self.secret_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(user_id, %status, "Clerk rejected metadata update");
            return Err(Error::Identity(format!(
                "Clerk API error {}: {}",
                status, body
            )));
        }

        info!(user_id, plan = ?update.subscription_plan, "Clerk entitlement updated");
        Ok(())
    }

    async fn get_user_entitlement(&self, user_id: &str) -> Result<Option<UserEntitlement>> {
        let url = self.user_url(user_id)?;

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Identity(format!(
                "Clerk API error {}: {}",
                status, body
            )));
        }

        let user: ClerkUser = response.json().await?;
        Ok(Some(user.into_entitlement()))
    }
}

/// The subset of a Clerk user object we read
#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    #[serde(default)]
    public_metadata: PublicMetadata,
    #[serde(default)]
    private_metadata: PrivateMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicMetadata {
    subscription_plan: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivateMetadata {
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
}

impl ClerkUser {
    fn into_entitlement(self) -> UserEntitlement {
        // Unknown plan names are treated as no plan
        let subscription_plan = self
            .public_metadata
            .subscription_plan
            .and_then(|p| p.parse::<SubscriptionPlan>().ok());

        UserEntitlement {
            user_id: self.id,
            subscription_plan,
            billing_customer_id: self.private_metadata.stripe_customer_id,
            billing_subscription_id: self.private_metadata.stripe_subscription_id,
        }
    }
}
