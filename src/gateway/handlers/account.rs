//! Account handlers (lookup, creation)

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use super::super::state::AppState;
use super::super::types::{
    AccountResponse, ApiResult, CreateAccountRequest, CreatedAccountResponse, MessageResponse,
};

/// Get an account balance
///
/// Reads take no lock and may observe a transfer mid-flight.
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}",
    params(
        ("account_id" = String, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account balance", body = AccountResponse),
        (status = 404, description = "Account not found (or malformed id)", body = MessageResponse)
    ),
    tag = "Account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> ApiResult<AccountResponse> {
    let account = state.accounts.get(&account_id).await?;
    Ok((StatusCode::OK, Json(AccountResponse::from(&account))))
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = CreatedAccountResponse),
        (status = 400, description = "Invalid id or balance", body = MessageResponse),
        (status = 500, description = "Account exists or store failure", body = MessageResponse)
    ),
    tag = "Account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<CreatedAccountResponse> {
    let Json(req) = payload?;
    let account = state
        .accounts
        .create(&req.account_id, req.initial_balance)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedAccountResponse {
            message: "Account created successfully".to_string(),
            account_id: account.account_id.to_string(),
            balance: account.balance,
        }),
    ))
}
