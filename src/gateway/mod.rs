pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::Request,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ServerConfig;
pub use state::AppState;

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/accounts", post(handlers::create_account))
        .route("/accounts/transfer", post(handlers::transfer_money))
        .route("/accounts/{account_id}", get(handlers::get_account))
}

/// Build the HTTP application. Routes are served both at the root and under
/// `/api/v1`.
pub fn router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
        info_span!(
            "http",
            method = %request.method(),
            path = %request.uri().path(),
        )
    });

    Router::new()
        .merge(api_routes())
        .nest("/api/v1", api_routes())
        .with_state(Arc::new(state))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(trace)
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests for at
/// most `shutdown_timeout_secs`.
pub async fn run_server(
    config: &ServerConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))?;

    info!(addr = %addr, version = env!("GIT_HASH"), "gateway listening");
    info!("API docs: http://{}/docs", addr);

    let app = router(state);
    let signal = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => res?,
        _ = shutdown.cancelled() => {
            let drain = Duration::from_secs(config.shutdown_timeout_secs);
            info!(drain_secs = config.shutdown_timeout_secs, "shutdown requested, draining");
            match tokio::time::timeout(drain, &mut server).await {
                Ok(res) => res?,
                Err(_) => warn!("drain timeout elapsed, dropping remaining connections"),
            }
        }
    }

    info!("gateway stopped");
    Ok(())
}
