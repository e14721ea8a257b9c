//! grammers-backed implementation of [`TelegramApi`].
//!
//! Connection management, reconnects, and MTProto framing live in the
//! grammers stack; this module decodes the session string, applies the
//! configured connect timeout/retry policy, and maps library types to the
//! DTOs the tool surface returns.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use grammers_client::types::{Chat, Message};
use grammers_client::{Client, Config, InitParams, InputMessage, SignInError};
use grammers_session::Session;

use crate::config::Settings;

use super::{ChatInfo, ChatRef, DialogInfo, MessageInfo, TelegramApi, TelegramError, UserInfo};

/// Decode a session string (base64 of the grammers session blob).
///
/// # Errors
/// Returns `TelegramError::InvalidSession` when the input is not valid base64
/// or the decoded bytes are not a session.
pub fn decode_session(raw: &str) -> Result<Session, TelegramError> {
    let bytes = BASE64
        .decode(raw.trim())
        .map_err(|e| TelegramError::InvalidSession(e.to_string()))?;
    Session::load(&bytes).map_err(|e| TelegramError::InvalidSession(e.to_string()))
}

/// Encode a session as the string form passed through `TELEGRAM_SESSION_STRING`.
#[must_use]
pub fn encode_session(session: &Session) -> String {
    BASE64.encode(session.save())
}

fn rpc(e: impl std::fmt::Display) -> TelegramError {
    TelegramError::Rpc(e.to_string())
}

fn chat_info(chat: &Chat) -> ChatInfo {
    ChatInfo {
        id: chat.id(),
        name: chat.name().to_string(),
        username: chat.username().map(str::to_string),
        kind: match chat {
            Chat::User(_) => "user",
            Chat::Group(_) => "group",
            Chat::Channel(_) => "channel",
        },
    }
}

fn message_info(msg: &Message) -> MessageInfo {
    MessageInfo {
        id: msg.id(),
        chat_id: msg.chat().id(),
        text: msg.text().to_string(),
        sender: msg.sender().map(|s| s.name().to_string()),
        date: msg.date().to_rfc3339(),
        outgoing: msg.outgoing(),
    }
}

/// Live Telegram client for the signed-in account.
pub struct TelegramClient {
    client: Client,
}

impl TelegramClient {
    /// Connect and verify authorization, honoring the configured timeout and
    /// retry policy. The session comes from `settings.session_string`; nothing
    /// is written to disk.
    ///
    /// # Errors
    /// `InvalidSession` for an undecodable session string, `Unauthorized` when
    /// the session is expired or revoked, `ConnectFailed` when all attempts
    /// are exhausted.
    pub async fn connect(settings: &Settings) -> Result<Self, TelegramError> {
        let attempts = settings.connection_retries.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            // Config takes ownership of the session, so decode per attempt.
            let session = decode_session(&settings.session_string)?;
            let config = Config {
                session,
                api_id: settings.api_id,
                api_hash: settings.api_hash.clone(),
                params: InitParams::default(),
            };
            let connect = tokio::time::timeout(
                Duration::from_secs(settings.connect_timeout_secs),
                Client::connect(config),
            )
            .await;
            match connect {
                Ok(Ok(client)) => {
                    if !client.is_authorized().await.map_err(rpc)? {
                        return Err(TelegramError::Unauthorized);
                    }
                    tracing::info!(attempt, "connected to Telegram");
                    return Ok(Self { client });
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    tracing::warn!(attempt, error = %last_error, "telegram connect failed");
                }
                Err(_) => {
                    last_error = format!("timed out after {}s", settings.connect_timeout_secs);
                    tracing::warn!(attempt, error = %last_error, "telegram connect failed");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_secs(settings.retry_delay_secs)).await;
            }
        }
        Err(TelegramError::ConnectFailed {
            attempts,
            last_error,
        })
    }

    /// Id of the signed-in account, for the health endpoint.
    ///
    /// # Errors
    /// Propagates RPC failures.
    pub async fn user_id(&self) -> Result<i64, TelegramError> {
        Ok(self.client.get_me().await.map_err(rpc)?.id())
    }

    /// Resolve a chat reference to a grammers chat. Usernames go through
    /// `resolve_username`; numeric ids are matched against open dialogs.
    async fn resolve_chat(&self, chat: &ChatRef) -> Result<Chat, TelegramError> {
        match chat {
            ChatRef::Username(name) => self
                .client
                .resolve_username(name)
                .await
                .map_err(rpc)?
                .ok_or_else(|| TelegramError::ChatNotFound(chat.to_string())),
            ChatRef::Id(id) => {
                let mut dialogs = self.client.iter_dialogs();
                while let Some(dialog) = dialogs.next().await.map_err(rpc)? {
                    if dialog.chat().id() == *id {
                        return Ok(dialog.chat().clone());
                    }
                }
                Err(TelegramError::ChatNotFound(chat.to_string()))
            }
        }
    }
}

#[async_trait]
impl TelegramApi for TelegramClient {
    async fn me(&self) -> Result<UserInfo, TelegramError> {
        let user = self.client.get_me().await.map_err(rpc)?;
        Ok(UserInfo {
            id: user.id(),
            name: user.full_name(),
            username: user.username().map(str::to_string),
        })
    }

    async fn dialogs(&self, limit: usize) -> Result<Vec<DialogInfo>, TelegramError> {
        let mut iter = self.client.iter_dialogs().limit(limit);
        let mut out = Vec::new();
        while let Some(dialog) = iter.next().await.map_err(rpc)? {
            out.push(DialogInfo {
                chat: chat_info(dialog.chat()),
                last_message: dialog
                    .last_message
                    .as_ref()
                    .map(|m| m.text().to_string())
                    .filter(|t| !t.is_empty()),
            });
        }
        Ok(out)
    }

    async fn history(
        &self,
        chat: &ChatRef,
        limit: usize,
    ) -> Result<Vec<MessageInfo>, TelegramError> {
        let chat = self.resolve_chat(chat).await?;
        let mut iter = self.client.iter_messages(&chat).limit(limit);
        let mut out = Vec::new();
        while let Some(msg) = iter.next().await.map_err(rpc)? {
            out.push(message_info(&msg));
        }
        Ok(out)
    }

    async fn search(
        &self,
        chat: &ChatRef,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MessageInfo>, TelegramError> {
        let chat = self.resolve_chat(chat).await?;
        let mut iter = self.client.search_messages(&chat).query(query).limit(limit);
        let mut out = Vec::new();
        while let Some(msg) = iter.next().await.map_err(rpc)? {
            out.push(message_info(&msg));
        }
        Ok(out)
    }

    async fn send(
        &self,
        chat: &ChatRef,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<MessageInfo, TelegramError> {
        let chat = self.resolve_chat(chat).await?;
        let message = InputMessage::text(text).reply_to(reply_to);
        let sent = self
            .client
            .send_message(&chat, message)
            .await
            .map_err(rpc)?;
        Ok(message_info(&sent))
    }

    async fn edit(&self, chat: &ChatRef, message_id: i32, text: &str) -> Result<(), TelegramError> {
        let chat = self.resolve_chat(chat).await?;
        self.client
            .edit_message(&chat, message_id, InputMessage::text(text))
            .await
            .map_err(rpc)
    }

    async fn delete(&self, chat: &ChatRef, message_ids: &[i32]) -> Result<usize, TelegramError> {
        let chat = self.resolve_chat(chat).await?;
        self.client
            .delete_messages(&chat, message_ids)
            .await
            .map_err(rpc)
    }

    async fn forward(
        &self,
        from: &ChatRef,
        to: &ChatRef,
        message_ids: &[i32],
    ) -> Result<Vec<i32>, TelegramError> {
        let source = self.resolve_chat(from).await?;
        let destination = self.resolve_chat(to).await?;
        let forwarded = self
            .client
            .forward_messages(&destination, message_ids, &source)
            .await
            .map_err(rpc)?;
        Ok(forwarded
            .into_iter()
            .flatten()
            .map(|m| m.id())
            .collect())
    }

    async fn resolve(&self, username: &str) -> Result<Option<ChatInfo>, TelegramError> {
        let name = username.trim().trim_start_matches('@');
        if name.is_empty() {
            return Ok(None);
        }
        let chat = self.client.resolve_username(name).await.map_err(rpc)?;
        Ok(chat.as_ref().map(chat_info))
    }
}

/// Prompts used by the interactive login flow. The CLI implements this over
/// stdin; keeping it a trait keeps terminal I/O out of the client layer.
#[async_trait]
pub trait LoginPrompt: Send + Sync {
    /// Ask for the phone number in international format.
    async fn phone(&self) -> Result<String, TelegramError>;
    /// Ask for the login code Telegram sent.
    async fn code(&self) -> Result<String, TelegramError>;
    /// Ask for the 2FA password; `hint` is the account's password hint.
    async fn password(&self, hint: Option<String>) -> Result<String, TelegramError>;
}

impl TelegramClient {
    /// Sign in from scratch and return a fresh session string. Used by the
    /// `login` subcommand; only api id/hash are required up front.
    ///
    /// # Errors
    /// Propagates connect and sign-in failures; a wrong code or password
    /// surfaces as `Rpc`.
    pub async fn generate_session_string(
        api_id: i32,
        api_hash: &str,
        phone: Option<String>,
        prompt: &dyn LoginPrompt,
    ) -> Result<String, TelegramError> {
        let client = Client::connect(Config {
            session: Session::new(),
            api_id,
            api_hash: api_hash.to_string(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| TelegramError::ConnectFailed {
            attempts: 1,
            last_error: e.to_string(),
        })?;

        let phone = match phone {
            Some(p) => p,
            None => prompt.phone().await?,
        };
        let token = client
            .request_login_code(phone.trim())
            .await
            .map_err(rpc)?;
        let code = prompt.code().await?;
        match client.sign_in(&token, code.trim()).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token.hint().map(str::to_string);
                let password = prompt.password(hint).await?;
                client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(rpc)?;
            }
            Err(e) => return Err(rpc(e)),
        }
        Ok(encode_session(client.session()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_session_string_is_rejected() {
        let Err(err) = decode_session("not base64 at all!!!") else {
            panic!("expected decode to fail");
        };
        assert!(matches!(err, TelegramError::InvalidSession(_)));
    }

    #[test]
    fn fresh_session_round_trips_through_the_string_form() {
        let session = Session::new();
        let encoded = encode_session(&session);
        decode_session(&encoded).expect("round trip");
    }

    #[test]
    fn session_string_whitespace_is_tolerated() {
        let encoded = format!("  {}\n", encode_session(&Session::new()));
        decode_session(&encoded).expect("trimmed decode");
    }
}
