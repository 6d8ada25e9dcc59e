//! Gateway types module
//!
//! ## Input Types
//! - [`CreateAccountRequest`], [`TransferRequest`]: JSON bodies
//!
//! ## Output Types
//! - [`AccountResponse`], [`MessageResponse`], [`HealthResponse`]
//! - [`ApiError`]: error body + status, rendered as `{message, code}`
//!
//! ## Submodules
//! - [`request`]: request bodies
//! - [`response`]: response bodies and error mapping

pub mod request;
pub mod response;

pub use request::{CreateAccountRequest, TransferRequest};
pub use response::{
    AccountResponse, ApiError, ApiResult, CreatedAccountResponse, HealthResponse, MessageResponse,
};
