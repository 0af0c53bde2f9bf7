//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use super::current_plan;
use crate::{AppError, AppState, AuthenticatedUser};
use tally_core::identity::SubscriptionPlan;

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    /// The identity provider's user id
    pub user_id: String,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub is_premium: bool,
}

/// Get the currently authenticated user and their plan
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> Result<Json<MeResponse>, AppError> {
    let subscription_plan = current_plan(&state, &user_id).await?;

    Ok(Json(MeResponse {
        user_id,
        subscription_plan,
        is_premium: subscription_plan == Some(SubscriptionPlan::Premium),
    }))
}
