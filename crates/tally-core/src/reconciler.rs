//! Entitlement reconciler
//!
//! Mirrors the billing system's subscription state into the identity store.
//! Each delivery is verified, classified, and turned into at most one
//! entitlement update. Nothing is persisted locally: the billing system
//! redelivers on failure and the identity store keeps the last write.
//!
//! Event ordering is not enforced. The event id and `created` timestamp are
//! logged with every outcome so out-of-order deliveries can be traced.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::billing::{
    BillingConfig, BillingEvent, BillingEventKind, SignatureVerifier, WebhookError,
};
use crate::error::Result;
use crate::identity::{EntitlementUpdate, IdentityStore, SubscriptionPlan};

/// Outcome of a successfully handled delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    /// The identity store accepted an entitlement update
    Applied {
        event_id: String,
        user_id: String,
        plan: Option<SubscriptionPlan>,
    },
    /// The event kind does not affect entitlements
    Ignored { event_id: String, kind: String },
}

impl Acknowledgement {
    pub fn event_id(&self) -> &str {
        match self {
            Self::Applied { event_id, .. } | Self::Ignored { event_id, .. } => event_id,
        }
    }
}

/// Verifies billing webhooks and applies them to an identity store
///
/// Cheap to clone; holds no mutable state.
#[derive(Clone)]
pub struct EntitlementReconciler {
    verifier: SignatureVerifier,
    store: Arc<dyn IdentityStore>,
}

impl std::fmt::Debug for EntitlementReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementReconciler")
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

impl EntitlementReconciler {
    pub fn new(config: &BillingConfig, store: Arc<dyn IdentityStore>) -> Result<Self> {
        Ok(Self {
            verifier: SignatureVerifier::from_config(config)?,
            store,
        })
    }

    /// The verifier used for incoming signatures
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Handle one webhook delivery
    ///
    /// `raw_body` must be the exact bytes received; the signature covers them.
    #[instrument(skip_all, fields(event_id = tracing::field::Empty, kind = tracing::field::Empty))]
    pub async fn handle_billing_event(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> std::result::Result<Acknowledgement, WebhookError> {
        self.handle_billing_event_at(raw_body, signature_header, Utc::now().timestamp())
            .await
    }

    /// Handle one webhook delivery, checking the signature timestamp against `now`
    pub async fn handle_billing_event_at(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
        now: i64,
    ) -> std::result::Result<Acknowledgement, WebhookError> {
        self.verifier.verify_at(raw_body, signature_header, now)?;

        let event = BillingEvent::from_slice(raw_body)?;

        let span = tracing::Span::current();
        span.record("event_id", event.id.as_str());
        span.record("kind", event.kind.name());

        let (user_id, update) = match event.kind {
            BillingEventKind::PaymentSucceeded {
                user_id,
                customer_id,
                subscription_id,
            } => (user_id, EntitlementUpdate::premium(customer_id, subscription_id)),
            BillingEventKind::SubscriptionDeleted { user_id } => {
                (user_id, EntitlementUpdate::cleared())
            }
            BillingEventKind::Other(kind) => {
                info!(event_id = %event.id, %kind, "Ignoring billing event");
                return Ok(Acknowledgement::Ignored {
                    event_id: event.id,
                    kind,
                });
            }
        };

        if let Err(e) = self.store.update_user_entitlement(&user_id, &update).await {
            warn!(
                event_id = %event.id,
                created = event.created,
                user_id = %user_id,
                error = %e,
                "Entitlement update failed"
            );
            return Err(WebhookError::DownstreamMutation(e));
        }

        info!(
            event_id = %event.id,
            created = event.created,
            user_id = %user_id,
            plan = ?update.subscription_plan,
            "Entitlement reconciled"
        );

        Ok(Acknowledgement::Applied {
            event_id: event.id,
            user_id,
            plan: update.subscription_plan,
        })
    }
}
