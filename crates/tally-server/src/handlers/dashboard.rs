//! Dashboard handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::current_plan;
use crate::{AppError, AppState, AuthenticatedUser};
use tally_core::identity::SubscriptionPlan;
use tally_core::models::{Dashboard, MonthPeriod};

/// Query parameters for the dashboard
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// `MM` or `YYYY-MM`; defaults to the current month
    pub month: Option<String>,
    /// Year for a bare `MM` month; defaults to the current year
    pub year: Option<i32>,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    pub is_premium: bool,
    pub user_can_add_transaction: bool,
}

/// Resolve `month`/`year` query parameters into a period
pub(crate) fn resolve_month(month: Option<&str>, year: Option<i32>) -> Result<MonthPeriod, AppError> {
    let default_year = year.unwrap_or_else(|| Utc::now().year());
    match month {
        Some(month) => MonthPeriod::parse(month, default_year).map_err(AppError::from_core),
        None => match year {
            Some(year) => MonthPeriod::new(year, Utc::now().month()).map_err(AppError::from_core),
            None => Ok(MonthPeriod::current()),
        },
    }
}

/// GET /api/dashboard - Monthly summary for the current user
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    let period = resolve_month(params.month.as_deref(), params.year)?;

    let plan = current_plan(&state, &user_id).await?;
    let dashboard = state.db.get_dashboard(&user_id, period)?;
    let user_can_add_transaction =
        state
            .db
            .can_user_add_transaction(&user_id, plan, Utc::now().date_naive())?;

    Ok(Json(DashboardResponse {
        dashboard,
        is_premium: plan == Some(SubscriptionPlan::Premium),
        user_can_add_transaction,
    }))
}
