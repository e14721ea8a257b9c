//! SSE gateway: MCP over `GET /sse` + `POST /messages`, plus `GET /health`.
//!
//! When an API key is configured the MCP routes require
//! `Authorization: Bearer <key>`; `/health` stays open for container probes.
//! Graceful shutdown on Ctrl+C (SIGINT) and SIGTERM; the cancellation tokens
//! close open event streams.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::server::TelegramMcpServer;

/// Event-stream path (container health checks probe this).
pub const SSE_PATH: &str = "/sse";
/// Client-to-server message path.
pub const MESSAGES_PATH: &str = "/messages";

const SSE_KEEP_ALIVE_SECS: u64 = 15;

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` when the process is serving.
    pub status: &'static str,
    /// Active transport (`sse`).
    pub transport: &'static str,
    /// Signed-in account id, when known at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Whether the MCP routes require a bearer token.
    pub auth_required: bool,
}

#[derive(Clone)]
struct HealthState {
    user_id: Option<i64>,
    auth_required: bool,
}

#[derive(Clone)]
struct ApiKey(Arc<str>);

/// Assembled SSE application: router plus the tokens that stop the MCP
/// service loop and its transports.
pub struct SseApp {
    /// The axum router (MCP routes + `/health`).
    pub router: Router,
    /// Cancels the SSE transports.
    pub transport_ct: CancellationToken,
    /// Cancels the MCP service loop.
    pub service_ct: CancellationToken,
}

/// Build the SSE application. Split from [`run_sse`] so tests can drive the
/// router without binding a socket.
#[must_use]
pub fn build_app(
    server: TelegramMcpServer,
    bind: SocketAddr,
    api_key: Option<String>,
    user_id: Option<i64>,
) -> SseApp {
    let transport_ct = CancellationToken::new();
    let (sse_server, sse_router) = SseServer::new(SseServerConfig {
        bind,
        sse_path: SSE_PATH.to_string(),
        post_path: MESSAGES_PATH.to_string(),
        ct: transport_ct.clone(),
        sse_keep_alive: Some(Duration::from_secs(SSE_KEEP_ALIVE_SECS)),
    });
    let service_ct = sse_server.with_service(move || server.clone());

    let auth_required = api_key.is_some();
    let mcp_routes = match api_key {
        Some(key) => sse_router.layer(middleware::from_fn_with_state(
            ApiKey(Arc::from(key)),
            require_bearer,
        )),
        None => sse_router,
    };
    let router = Router::new()
        .route("/health", get(handle_health))
        .with_state(HealthState {
            user_id,
            auth_required,
        })
        .merge(mcp_routes);

    SseApp {
        router,
        transport_ct,
        service_ct,
    }
}

/// Run the SSE gateway until SIGINT/SIGTERM.
///
/// # Errors
/// Returns an error when the listen address is invalid, the bind fails, or
/// the server loop fails.
pub async fn run_sse(
    server: TelegramMcpServer,
    settings: &Settings,
    user_id: Option<i64>,
) -> Result<()> {
    let addr: SocketAddr = settings
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", settings.bind_addr()))?;
    let auth_required = settings.sse_api_key.is_some();
    let app = build_app(server, addr, settings.sse_api_key.clone(), user_id);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(
        %addr,
        auth_required,
        "SSE gateway listening (GET {SSE_PATH}, POST {MESSAGES_PATH}, GET /health; Ctrl+C/SIGTERM to stop)"
    );
    serve_sse(listener, app, shutdown_signal()).await?;
    tracing::info!("SSE gateway stopped");
    Ok(())
}

/// Serve an [`SseApp`] until `shutdown` resolves. The cancellation tokens are
/// cancelled as part of shutdown: graceful shutdown waits for in-flight
/// connections, and an open event stream only closes when its token fires.
///
/// # Errors
/// Propagates I/O errors from the server loop.
pub async fn serve_sse(
    listener: TcpListener,
    app: SseApp,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let SseApp {
        router,
        transport_ct,
        service_ct,
    } = app;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            transport_ct.cancel();
            service_ct.cancel();
        })
        .await
}

async fn handle_health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        transport: "sse",
        user_id: state.user_id,
        auth_required: state.auth_required,
    })
}

async fn require_bearer(State(key): State<ApiKey>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|value| token_matches(value, &key.0));
    if authorized {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response()
    }
}

/// `Bearer <token>` with case-insensitive scheme and exact token match.
fn token_matches(header: &str, key: &str) -> bool {
    let mut parts = header.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) => {
            scheme.eq_ignore_ascii_case("bearer") && token.trim() == key
        }
        _ => false,
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let ctrl_c = tokio::signal::ctrl_c();
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(_) => {
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::token_matches;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert!(token_matches("Bearer secret", "secret"));
        assert!(token_matches("bearer secret", "secret"));
        assert!(token_matches("BEARER secret", "secret"));
    }

    #[test]
    fn wrong_token_or_scheme_is_rejected() {
        assert!(!token_matches("Bearer other", "secret"));
        assert!(!token_matches("Basic secret", "secret"));
        assert!(!token_matches("secret", "secret"));
        assert!(!token_matches("", "secret"));
    }

    #[test]
    fn token_is_matched_exactly() {
        assert!(!token_matches("Bearer secre", "secret"));
        assert!(!token_matches("Bearer secrets", "secret"));
        assert!(token_matches("Bearer  secret", "secret"), "extra space trims");
    }
}
