//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`
//!
//! Paths are documented under `/api/v1`; the same routes are also served
//! without the prefix.

use utoipa::OpenApi;

use crate::gateway::types::{
    AccountResponse, CreateAccountRequest, CreatedAccountResponse, HealthResponse, MessageResponse,
    TransferRequest,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Account Transfer API",
        version = "1.0.0",
        description = "Account balances and lock-ordered transfers between accounts.",
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::account::get_account,
        crate::gateway::handlers::account::create_account,
        crate::gateway::handlers::transfer::transfer_money,
    ),
    components(
        schemas(
            AccountResponse,
            CreatedAccountResponse,
            CreateAccountRequest,
            TransferRequest,
            MessageResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "Account", description = "Account lookup and creation"),
        (name = "Transfer", description = "Transfers between accounts"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;
