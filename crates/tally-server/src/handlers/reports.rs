//! AI report handler

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use super::dashboard::resolve_month;
use crate::{AppError, AppState, AuthenticatedUser};
use tally_core::ai::AiReport;

#[derive(Debug, Default, Deserialize)]
pub struct AiReportRequest {
    /// `MM` or `YYYY-MM`; defaults to the current month
    pub month: Option<String>,
    pub year: Option<i32>,
}

/// POST /api/reports/ai - Generate a premium AI report for a month
pub async fn generate_ai_report(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<AiReportRequest>,
) -> Result<Json<AiReport>, AppError> {
    let reports = state
        .reports
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("AI reports are not configured"))?;

    let period = resolve_month(body.month.as_deref(), body.year)?;

    let report = reports
        .generate(&user_id, period)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(report))
}
