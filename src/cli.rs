use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "telegram-mcp")]
#[command(about = "MCP server for a signed-in Telegram account. SSE or stdio transport.")]
pub(crate) struct Cli {
    /// Transport to serve MCP over.
    #[arg(short = 't', long, value_enum, default_value_t = Transport::Stdio)]
    pub(crate) transport: Transport,

    /// Override the SSE listen host (else TELEGRAM_MCP_HOST, default 0.0.0.0).
    #[arg(long)]
    pub(crate) host: Option<String>,

    /// Override the SSE listen port (else TELEGRAM_MCP_PORT, default 3001).
    #[arg(long)]
    pub(crate) port: Option<u16>,

    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Transport {
    /// HTTP server: GET /sse + POST /messages, plus GET /health.
    Sse,
    /// MCP over stdin/stdout.
    Stdio,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Interactive sign-in; prints a fresh TELEGRAM_SESSION_STRING and exits.
    /// Needs only TELEGRAM_API_ID and TELEGRAM_API_HASH.
    Login {
        /// Phone number in international format (prompted when omitted).
        #[arg(long)]
        phone: Option<String>,
    },
}
