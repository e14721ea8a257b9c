//! Telegram access layer.
//!
//! The MCP dispatch code talks to [`TelegramApi`], a narrow trait over the
//! account operations the tool surface needs. [`TelegramClient`] implements it
//! with the grammers MTProto stack; tests substitute an in-memory fake.

mod client;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use client::{LoginPrompt, TelegramClient, decode_session, encode_session};

/// Errors from the Telegram layer. Mapped to tool errors at the MCP boundary.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The session string is not valid base64 or does not decode to a session.
    #[error("invalid session string: {0}")]
    InvalidSession(String),
    /// Connected but the session is expired or revoked; regenerate it.
    #[error("session is not authorized; regenerate the session string")]
    Unauthorized,
    /// Could not reach Telegram within the configured attempts.
    #[error("could not connect to Telegram after {attempts} attempts: {last_error}")]
    ConnectFailed {
        /// Attempts made before giving up.
        attempts: u32,
        /// Error from the final attempt.
        last_error: String,
    },
    /// A chat reference resolved to nothing.
    #[error("chat not found: {0}")]
    ChatNotFound(String),
    /// Any other RPC-level failure reported by the client library.
    #[error("telegram request failed: {0}")]
    Rpc(String),
}

/// Reference to a chat as supplied in tool arguments: numeric id or username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    /// Numeric chat id (negative for groups/channels).
    Id(i64),
    /// Public username, stored without the leading `@`.
    Username(String),
}

impl ChatRef {
    /// Parse a tool-supplied chat reference. Numeric strings are ids,
    /// everything else (with or without a leading `@`) is a username.
    ///
    /// # Errors
    /// Returns `TelegramError::ChatNotFound` for an empty reference.
    pub fn parse(raw: &str) -> Result<Self, TelegramError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TelegramError::ChatNotFound(raw.to_string()));
        }
        if let Some(stripped) = raw.strip_prefix('@') {
            if stripped.is_empty() {
                return Err(TelegramError::ChatNotFound(raw.to_string()));
            }
            return Ok(Self::Username(stripped.to_string()));
        }
        match raw.parse::<i64>() {
            Ok(id) => Ok(Self::Id(id)),
            Err(_) => Ok(Self::Username(raw.to_string())),
        }
    }
}

impl std::fmt::Display for ChatRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "@{name}"),
        }
    }
}

/// The signed-in account.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    /// Telegram user id.
    pub id: i64,
    /// Display name (first + last).
    pub name: String,
    /// Public username, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A chat (user, group, or channel).
#[derive(Debug, Clone, Serialize)]
pub struct ChatInfo {
    /// Chat id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Public username, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// `user`, `group`, or `channel`.
    pub kind: &'static str,
}

/// One entry from the dialog list.
#[derive(Debug, Clone, Serialize)]
pub struct DialogInfo {
    /// The chat this dialog is with.
    pub chat: ChatInfo,
    /// Text of the most recent message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

/// One message in a chat.
#[derive(Debug, Clone, Serialize)]
pub struct MessageInfo {
    /// Message id within the chat.
    pub id: i32,
    /// Chat id the message belongs to.
    pub chat_id: i64,
    /// Message text (empty for pure media messages).
    pub text: String,
    /// Sender display name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// RFC 3339 timestamp.
    pub date: String,
    /// True when the signed-in account sent the message.
    pub outgoing: bool,
}

/// Telegram operations backing the MCP tools.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// Info about the signed-in account.
    async fn me(&self) -> Result<UserInfo, TelegramError>;

    /// Most recent open dialogs, newest first.
    async fn dialogs(&self, limit: usize) -> Result<Vec<DialogInfo>, TelegramError>;

    /// Most recent messages in a chat, newest first.
    async fn history(&self, chat: &ChatRef, limit: usize)
    -> Result<Vec<MessageInfo>, TelegramError>;

    /// Full-text search within a chat.
    async fn search(
        &self,
        chat: &ChatRef,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MessageInfo>, TelegramError>;

    /// Send a text message; optionally reply to an existing message.
    async fn send(
        &self,
        chat: &ChatRef,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<MessageInfo, TelegramError>;

    /// Edit a previously sent message.
    async fn edit(
        &self,
        chat: &ChatRef,
        message_id: i32,
        text: &str,
    ) -> Result<(), TelegramError>;

    /// Delete messages by id; returns how many were deleted.
    async fn delete(&self, chat: &ChatRef, message_ids: &[i32]) -> Result<usize, TelegramError>;

    /// Forward messages from one chat to another; returns new message ids.
    async fn forward(
        &self,
        from: &ChatRef,
        to: &ChatRef,
        message_ids: &[i32],
    ) -> Result<Vec<i32>, TelegramError>;

    /// Resolve a public username to a chat, if it exists.
    async fn resolve(&self, username: &str) -> Result<Option<ChatInfo>, TelegramError>;
}
