//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod dashboard;
pub mod reports;
pub mod transactions;
pub mod webhooks;

// Re-export all handlers for use in router
pub use auth::*;
pub use dashboard::*;
pub use reports::*;
pub use transactions::*;
pub use webhooks::*;

use tally_core::identity::SubscriptionPlan;

use crate::{AppError, AppState};

/// The user's current plan according to the identity store
///
/// Users the store does not know are on the free plan.
pub(crate) async fn current_plan(
    state: &AppState,
    user_id: &str,
) -> Result<Option<SubscriptionPlan>, AppError> {
    let entitlement = state
        .identity
        .get_user_entitlement(user_id)
        .await
        .map_err(AppError::from_core)?;
    Ok(entitlement.and_then(|e| e.subscription_plan))
}
