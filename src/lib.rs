pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod collation;
pub mod db;
pub mod jwt;
pub mod names;
pub mod password;
pub mod rate_limit;

use api::{ApiError, create_api_router};
use axum::{
    Router,
    http::Uri,
    response::{IntoResponse, Response},
};
use cli::IpSource;
use db::Database;
use jwt::{JwtConfig, TokenLifetimes};
use rate_limit::{LoginLimit, RateLimitConfig};
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info};

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens, distinct from the access secret
    pub refresh_secret: Vec<u8>,
    pub token_lifetimes: TokenLifetimes,
    /// Login attempts allowed per client address
    pub login_limit: LoginLimit,
    /// Where the client address comes from
    pub ip_source: IpSource,
    /// bcrypt cost for new password hashes
    pub password_cost: u32,
}

impl ServerConfig {
    /// Fresh login rate limiter for this configuration.
    pub fn rate_limit(&self) -> Arc<RateLimitConfig> {
        Arc::new(RateLimitConfig::new(self.login_limit, self.ip_source))
    }
}

async fn not_found(uri: Uri) -> Response {
    info!(path = %uri.path(), "No route");
    (
        axum::http::StatusCode::NOT_FOUND,
        axum::Json(api::MessageResponse::new("404 Not Found")),
    )
        .into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!(panic = detail, "Handler panicked");
    ApiError::internal("Internal server error").into_response()
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig, rate_limit: Arc<RateLimitConfig>) -> Router {
    let jwt = Arc::new(
        JwtConfig::new(&config.access_secret, &config.refresh_secret)
            .with_lifetimes(config.token_lifetimes),
    );

    create_api_router(config.db.clone(), jwt, rate_limit, config.password_cost)
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// Spawn the background housekeeping task for the rate limiter.
pub fn init_cleanup(rate_limit: &Arc<RateLimitConfig>) -> tokio::task::JoinHandle<()> {
    cleanup::spawn_cleanup_scheduler(rate_limit.clone())
}

/// Run the server on the given listener until `shutdown` resolves and
/// in-flight requests have drained.
pub async fn run_server(
    config: ServerConfig,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let rate_limit = config.rate_limit();
    let cleanup = init_cleanup(&rate_limit);

    let app = create_app(&config, rate_limit);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let result = axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown)
        .await;

    cleanup.abort();
    result
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener, std::future::pending()).await {
            error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    async fn boom() -> &'static str {
        panic!("handler exploded");
    }

    #[tokio::test]
    async fn test_panics_become_json_500() {
        let app = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(handle_panic));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"message": "Internal server error", "kind": "internal"})
        );
    }
}
