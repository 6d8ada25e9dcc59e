//! Transfer handler

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use super::super::state::AppState;
use super::super::types::{ApiResult, MessageResponse, TransferRequest};

/// Transfer money between two accounts
///
/// Completed and insufficient-balance results are both 200; tell them apart by
/// `code`. 503 means lock contention and is safe to retry.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer completed or declined for insufficient balance", body = MessageResponse),
        (status = 400, description = "Invalid request", body = MessageResponse),
        (status = 404, description = "Source or destination account not found", body = MessageResponse),
        (status = 500, description = "Transfer failed", body = MessageResponse),
        (status = 503, description = "Lock contention, retry", body = MessageResponse)
    ),
    tag = "Transfer"
)]
pub async fn transfer_money(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(req) = payload?;

    // Dropped with the request if the client goes away; cancelled on shutdown.
    let cancel = state.shutdown.child_token();
    let outcome = state
        .transfers
        .transfer_with_cancel(
            &req.account_id,
            &req.destination_account_id,
            req.amount,
            &cancel,
        )
        .await?;

    let status = StatusCode::from_u16(outcome.http_status()).unwrap_or(StatusCode::OK);
    Ok((status, Json(MessageResponse::from(&outcome))))
}
