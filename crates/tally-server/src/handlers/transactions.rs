//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::current_plan;
use crate::{AppError, AppState, AuthenticatedUser, SuccessResponse, MAX_PAGE_LIMIT};
use tally_core::models::{NewTransaction, Transaction};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transactions: Vec<Transaction>,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/transactions - List the user's transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<TransactionResponse>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let transactions = state.db.list_transactions(&user_id, limit, offset)?;

    Ok(Json(TransactionResponse {
        transactions,
        limit,
        offset,
    }))
}

/// POST /api/transactions - Record a transaction
///
/// Free-plan users are limited per calendar month.
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<NewTransaction>,
) -> Result<Json<Transaction>, AppError> {
    let plan = current_plan(&state, &user_id).await?;
    let id = state
        .db
        .insert_transaction_for_plan(&user_id, plan, Utc::now().date_naive(), &body)
        .map_err(AppError::from_core)?;
    info!(user_id = %user_id, id, "Transaction created");

    let transaction = state
        .db
        .get_transaction(&user_id, id)?
        .ok_or_else(|| AppError::internal("Transaction vanished after insert"))?;

    Ok(Json(transaction))
}

/// GET /api/transactions/:id - Get a single transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state
        .db
        .get_transaction(&user_id, id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    Ok(Json(transaction))
}

/// PUT /api/transactions/:id - Replace a transaction
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(body): Json<NewTransaction>,
) -> Result<Json<Transaction>, AppError> {
    let updated = state
        .db
        .update_transaction(&user_id, id, &body)
        .map_err(AppError::from_core)?;
    if !updated {
        return Err(AppError::not_found("Transaction not found"));
    }

    let transaction = state
        .db
        .get_transaction(&user_id, id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    Ok(Json(transaction))
}

/// DELETE /api/transactions/:id - Delete a transaction
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_transaction(&user_id, id)? {
        return Err(AppError::not_found("Transaction not found"));
    }

    Ok(Json(SuccessResponse { success: true }))
}
