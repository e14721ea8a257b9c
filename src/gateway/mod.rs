//! Gateway namespace: SSE (HTTP) and stdio transports.

mod sse;
mod stdio;

pub use sse::{HealthResponse, MESSAGES_PATH, SSE_PATH, SseApp, build_app, run_sse, serve_sse};
pub use stdio::run_stdio;
