//! Billing webhook handler

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::{AppError, AppState};
use tally_core::billing::SIGNATURE_HEADER;

#[derive(Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

/// POST /api/webhooks/stripe - Reconcile entitlements from a billing event
///
/// The body is taken as raw bytes; the signature covers them exactly.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let reconciler = state
        .reconciler
        .as_ref()
        .ok_or_else(|| AppError::not_found("Billing webhooks are not configured"))?;

    // A non-UTF-8 header cannot match; treat it as absent
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match reconciler.handle_billing_event(&body, signature).await {
        Ok(_) => Ok(Json(WebhookResponse { received: true })),
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "Rejected billing webhook");
            Err(AppError::bad_request("Invalid webhook request"))
        }
        Err(e) => {
            error!(error = %e, "Billing webhook processing failed");
            Err(AppError::internal("Webhook processing failed"))
        }
    }
}
