//! Typed billing events
//!
//! The signed envelope is `{ id, type, created, data: { object } }`. Only two
//! event types affect entitlements; their required fields are validated here
//! so nothing downstream deals with missing values.

use serde::Deserialize;

use crate::identity::is_valid_user_id;

use super::error::WebhookError;

/// An invoice was paid (first payment or renewal)
pub const PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";

/// A subscription ended (cancelled or expired)
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// A billing event that passed signature verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEvent {
    /// Billing-system event id (`evt_...`)
    pub id: String,
    /// When the billing system created the event (Unix seconds)
    pub created: i64,
    pub kind: BillingEventKind,
}

/// What happened, with the fields each kind requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    PaymentSucceeded {
        user_id: String,
        customer_id: String,
        subscription_id: String,
    },
    SubscriptionDeleted {
        user_id: String,
    },
    /// Any other event type; acknowledged and ignored
    Other(String),
}

impl BillingEventKind {
    /// The billing-system event type name
    pub fn name(&self) -> &str {
        match self {
            Self::PaymentSucceeded { .. } => PAYMENT_SUCCEEDED,
            Self::SubscriptionDeleted { .. } => SUBSCRIPTION_DELETED,
            Self::Other(name) => name,
        }
    }
}

impl BillingEvent {
    /// Parse a verified payload into a typed event
    ///
    /// Only the event type is needed to classify a payload. Other kinds are
    /// returned as `Other` whatever the rest of the envelope holds; the two
    /// relevant kinds fail with `MalformedEvent` when the id or any of their
    /// correlation fields is missing.
    pub fn from_slice(payload: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::MalformedEvent(format!("invalid envelope: {}", e)))?;

        let created = raw.created.unwrap_or_default();
        let object = raw
            .data
            .get("object")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let kind = match raw.event_type.as_str() {
            PAYMENT_SUCCEEDED => parse_payment_succeeded(object)?,
            SUBSCRIPTION_DELETED => parse_subscription_deleted(object)?,
            other => {
                return Ok(Self {
                    id: raw.id.unwrap_or_default(),
                    created,
                    kind: BillingEventKind::Other(other.to_string()),
                })
            }
        };

        let id = non_empty(raw.id).ok_or_else(|| {
            WebhookError::MalformedEvent(format!("{} missing: id", kind.name()))
        })?;

        Ok(Self { id, created, kind })
    }
}

fn parse_payment_succeeded(object: serde_json::Value) -> Result<BillingEventKind, WebhookError> {
    let invoice: RawInvoice = serde_json::from_value(object)
        .map_err(|e| WebhookError::MalformedEvent(format!("invalid invoice: {}", e)))?;

    let details = invoice.parent.and_then(|p| p.subscription_details);
    let (subscription, metadata) = match details {
        Some(d) => (d.subscription, d.metadata),
        None => (None, None),
    };

    let subscription_id = non_empty(subscription.map(ObjectRef::into_id));
    let customer_id = non_empty(invoice.customer.map(ObjectRef::into_id));
    let user_id = non_empty(metadata.and_then(|m| m.clerk_user_id));

    match (user_id, customer_id, subscription_id) {
        (Some(user_id), Some(customer_id), Some(subscription_id)) => {
            Ok(BillingEventKind::PaymentSucceeded {
                user_id: checked_user_id(PAYMENT_SUCCEEDED, user_id)?,
                customer_id,
                subscription_id,
            })
        }
        (user_id, customer_id, subscription_id) => {
            let missing: Vec<&str> = [
                ("clerk_user_id", user_id.is_none()),
                ("customer", customer_id.is_none()),
                ("subscription", subscription_id.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            Err(WebhookError::MalformedEvent(format!(
                "{} missing: {}",
                PAYMENT_SUCCEEDED,
                missing.join(", ")
            )))
        }
    }
}

fn parse_subscription_deleted(object: serde_json::Value) -> Result<BillingEventKind, WebhookError> {
    let subscription: RawSubscription = serde_json::from_value(object)
        .map_err(|e| WebhookError::MalformedEvent(format!("invalid subscription: {}", e)))?;

    let user_id = non_empty(subscription.metadata.and_then(|m| m.clerk_user_id)).ok_or_else(|| {
        WebhookError::MalformedEvent(format!("{} missing: clerk_user_id", SUBSCRIPTION_DELETED))
    })?;

    Ok(BillingEventKind::SubscriptionDeleted {
        user_id: checked_user_id(SUBSCRIPTION_DELETED, user_id)?,
    })
}

/// The user id ends up in identity provider URLs; reject it here as a bad payload
fn checked_user_id(event_type: &str, user_id: String) -> Result<String, WebhookError> {
    if is_valid_user_id(&user_id) {
        Ok(user_id)
    } else {
        Err(WebhookError::MalformedEvent(format!(
            "{} has an invalid clerk_user_id: {:?}",
            event_type, user_id
        )))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    data: serde_json::Value,
}

/// A reference that is either an id or an expanded object carrying one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ObjectRef {
    Id(String),
    Expanded { id: String },
}

impl ObjectRef {
    fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Expanded { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInvoice {
    customer: Option<ObjectRef>,
    parent: Option<RawInvoiceParent>,
}

#[derive(Debug, Deserialize)]
struct RawInvoiceParent {
    subscription_details: Option<RawSubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
struct RawSubscriptionDetails {
    subscription: Option<ObjectRef>,
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    clerk_user_id: Option<String>,
}
