//! Stdio gateway: MCP over stdin/stdout. Exits when the client disconnects.
//!
//! Logs go to stderr (see `main`), keeping stdout clean for the protocol.

use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;

use crate::server::TelegramMcpServer;

/// Serve MCP over stdin/stdout until the client closes the stream.
///
/// # Errors
/// Returns an error when the MCP handshake fails or the service task panics.
pub async fn run_stdio(server: TelegramMcpServer) -> Result<()> {
    tracing::info!("stdio gateway running (MCP over stdin/stdout)");
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    tracing::info!("stdio gateway stopped");
    Ok(())
}
