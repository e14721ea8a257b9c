//! MCP server for a signed-in Telegram account.
//!
//! Exposes account actions as MCP tools: list dialogs, read/search chat
//! history, send/edit/delete/forward messages, resolve usernames. Served over
//! SSE (`GET /sse` + `POST /messages`, optional bearer auth, `GET /health`)
//! or stdio. Credentials come from the environment; the session string is
//! held in memory only.

mod config;
mod gateway;
mod server;
mod telegram;
#[doc(hidden)]
pub mod test_support;

pub use config::{ConfigError, Settings};
pub use gateway::{
    HealthResponse, MESSAGES_PATH, SSE_PATH, SseApp, build_app, run_sse, run_stdio, serve_sse,
};
pub use server::TelegramMcpServer;
pub use telegram::{
    ChatInfo, ChatRef, DialogInfo, LoginPrompt, MessageInfo, TelegramApi, TelegramClient,
    TelegramError, UserInfo, decode_session, encode_session,
};
