//! telegram-mcp: MCP server exposing a signed-in Telegram account as tools.
//!
//! Stdio transport by default; `-t sse` serves HTTP. Logs go to stderr so
//! stdout stays clean for the protocol; set `RUST_LOG=telegram_mcp=debug`
//! (or `warn`) to change verbosity.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use telegram_mcp::{
    LoginPrompt, Settings, TelegramClient, TelegramError, TelegramMcpServer, run_sse, run_stdio,
};

use crate::cli::{Cli, Command, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("telegram_mcp=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Some(Command::Login { phone }) = cli.command {
        return run_login(phone).await;
    }

    let mut settings = Settings::from_env().context("configuration")?;
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }

    let client = TelegramClient::connect(&settings).await?;
    let user_id = client.user_id().await.ok();
    tracing::info!(?user_id, "Telegram session verified");
    let server = TelegramMcpServer::new(Arc::new(client));

    match cli.transport {
        Transport::Sse => run_sse(server, &settings, user_id).await,
        Transport::Stdio => run_stdio(server).await,
    }
}

async fn run_login(phone: Option<String>) -> anyhow::Result<()> {
    let (api_id, api_hash) = Settings::login_credentials_from_env().context("configuration")?;
    let session =
        TelegramClient::generate_session_string(api_id, &api_hash, phone, &StdinPrompt).await?;
    // The one thing login prints on stdout, ready to paste into an env file.
    println!("TELEGRAM_SESSION_STRING={session}");
    Ok(())
}

struct StdinPrompt;

#[async_trait::async_trait]
impl LoginPrompt for StdinPrompt {
    async fn phone(&self) -> Result<String, TelegramError> {
        read_line("Phone number (international format, e.g. +15551234567): ").await
    }

    async fn code(&self) -> Result<String, TelegramError> {
        read_line("Login code: ").await
    }

    async fn password(&self, hint: Option<String>) -> Result<String, TelegramError> {
        let prompt = match hint {
            Some(hint) => format!("2FA password (hint: {hint}): "),
            None => "2FA password: ".to_string(),
        };
        read_line(&prompt).await
    }
}

async fn read_line(prompt: &str) -> Result<String, TelegramError> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let io_err = |e: std::io::Error| TelegramError::Rpc(format!("terminal i/o: {e}"));
    let mut stderr = tokio::io::stderr();
    stderr.write_all(prompt.as_bytes()).await.map_err(io_err)?;
    stderr.flush().await.map_err(io_err)?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(io_err)?;
    Ok(line.trim().to_string())
}
