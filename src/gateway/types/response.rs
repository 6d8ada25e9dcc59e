//! Response bodies and error mapping
//!
//! Every non-2xx body, and every transfer result, is `{message, code}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::account::{Account, AccountError};
use crate::money::Money;
use crate::transfer::{TransferError, TransferOutcome};

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    #[schema(example = "acc_1001")]
    pub account_id: String,
    #[schema(value_type = String, example = "800.00")]
    pub balance: Money,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id.to_string(),
            balance: account.balance,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedAccountResponse {
    #[schema(example = "Account created successfully")]
    pub message: String,
    #[schema(example = "acc_1001")]
    pub account_id: String,
    #[schema(value_type = String, example = "1000.00")]
    pub balance: Money,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Transaction completed successfully")]
    pub message: String,
    #[schema(example = "SUCCESS")]
    pub code: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }
}

impl From<&TransferOutcome> for MessageResponse {
    fn from(outcome: &TransferOutcome) -> Self {
        Self::new(outcome.message(), outcome.code())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// UP or DOWN
    #[schema(example = "UP")]
    pub status: String,
    #[schema(example = "UP")]
    pub account_store: String,
    #[schema(example = "UP")]
    pub lock_store: String,
    /// Build revision
    #[schema(example = "a1b2c3d")]
    pub version: String,
}

// ============================================================================
// Errors
// ============================================================================

pub type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;

/// Error response: status plus `{message, code}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let message = match &e {
            TransferError::LockContention(_) => "Failed to acquire lock for transaction".to_string(),
            TransferError::Persistence(_) => "Transaction failed during database update".to_string(),
            // Internal detail stays in the logs.
            TransferError::LockStore(_) | TransferError::Cancelled | TransferError::Overflow => {
                "Transaction failed".to_string()
            }
            _ => e.to_string(),
        };
        Self::new(status_from(e.http_status()), e.code(), message)
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        let message = match &e {
            AccountError::NotFound(_) => "Account not found".to_string(),
            AccountError::AlreadyExists(_) | AccountError::Store(_) => {
                "Failed to create account".to_string()
            }
            AccountError::InvalidRequest(_) => e.to_string(),
        };
        Self::new(status_from(e.http_status()), e.code(), message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = MessageResponse::new(self.message, self.code);
        (self.status, Json(body)).into_response()
    }
}
