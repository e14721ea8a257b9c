//! Test-only Telegram backend: an in-memory [`TelegramApi`] so dispatch and
//! gateway tests run without network access or credentials.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Mutex;

use async_trait::async_trait;

use crate::telegram::{
    ChatInfo, ChatRef, DialogInfo, MessageInfo, TelegramApi, TelegramError, UserInfo,
};

const FAKE_DATE: &str = "2026-01-02T03:04:05+00:00";

/// In-memory account state. Chats are registered up front; messages accumulate
/// as tests send them.
pub struct FakeTelegram {
    me: UserInfo,
    state: Mutex<State>,
}

struct State {
    chats: Vec<ChatInfo>,
    messages: Vec<MessageInfo>,
    next_message_id: i32,
}

impl Default for FakeTelegram {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTelegram {
    /// An account with no chats.
    #[must_use]
    pub fn new() -> Self {
        Self {
            me: UserInfo {
                id: 1000,
                name: "Test Account".to_string(),
                username: Some("test_account".to_string()),
            },
            state: Mutex::new(State {
                chats: Vec::new(),
                messages: Vec::new(),
                next_message_id: 1,
            }),
        }
    }

    /// Register a chat the account can see.
    #[must_use]
    pub fn with_chat(self, id: i64, name: &str, username: Option<&str>, kind: &'static str) -> Self {
        self.state.lock().unwrap().chats.push(ChatInfo {
            id,
            name: name.to_string(),
            username: username.map(str::to_string),
            kind,
        });
        self
    }

    /// Seed an incoming message in a registered chat; returns its id.
    pub fn push_incoming(&self, chat_id: i64, sender: &str, text: &str) -> i32 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_message_id;
        state.next_message_id += 1;
        state.messages.push(MessageInfo {
            id,
            chat_id,
            text: text.to_string(),
            sender: Some(sender.to_string()),
            date: FAKE_DATE.to_string(),
            outgoing: false,
        });
        id
    }

    /// All messages currently stored in a chat, oldest first.
    #[must_use]
    pub fn messages_in(&self, chat_id: i64) -> Vec<MessageInfo> {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }
}

impl State {
    fn find_chat(&self, chat: &ChatRef) -> Result<ChatInfo, TelegramError> {
        self.chats
            .iter()
            .find(|c| match chat {
                ChatRef::Id(id) => c.id == *id,
                ChatRef::Username(name) => c
                    .username
                    .as_deref()
                    .is_some_and(|u| u.eq_ignore_ascii_case(name)),
            })
            .cloned()
            .ok_or_else(|| TelegramError::ChatNotFound(chat.to_string()))
    }
}

#[async_trait]
impl TelegramApi for FakeTelegram {
    async fn me(&self) -> Result<UserInfo, TelegramError> {
        Ok(self.me.clone())
    }

    async fn dialogs(&self, limit: usize) -> Result<Vec<DialogInfo>, TelegramError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .chats
            .iter()
            .take(limit)
            .map(|chat| DialogInfo {
                chat: chat.clone(),
                last_message: state
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.chat_id == chat.id)
                    .map(|m| m.text.clone()),
            })
            .collect())
    }

    async fn history(
        &self,
        chat: &ChatRef,
        limit: usize,
    ) -> Result<Vec<MessageInfo>, TelegramError> {
        let state = self.state.lock().unwrap();
        let chat = state.find_chat(chat)?;
        Ok(state
            .messages
            .iter()
            .rev()
            .filter(|m| m.chat_id == chat.id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        chat: &ChatRef,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MessageInfo>, TelegramError> {
        let state = self.state.lock().unwrap();
        let chat = state.find_chat(chat)?;
        let query = query.to_lowercase();
        Ok(state
            .messages
            .iter()
            .rev()
            .filter(|m| m.chat_id == chat.id && m.text.to_lowercase().contains(&query))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn send(
        &self,
        chat: &ChatRef,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<MessageInfo, TelegramError> {
        let mut state = self.state.lock().unwrap();
        let chat = state.find_chat(chat)?;
        if let Some(reply_to) = reply_to {
            let exists = state
                .messages
                .iter()
                .any(|m| m.chat_id == chat.id && m.id == reply_to);
            if !exists {
                return Err(TelegramError::Rpc(format!(
                    "reply target {reply_to} not found"
                )));
            }
        }
        let id = state.next_message_id;
        state.next_message_id += 1;
        let message = MessageInfo {
            id,
            chat_id: chat.id,
            text: text.to_string(),
            sender: Some(self.me.name.clone()),
            date: FAKE_DATE.to_string(),
            outgoing: true,
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn edit(&self, chat: &ChatRef, message_id: i32, text: &str) -> Result<(), TelegramError> {
        let mut state = self.state.lock().unwrap();
        let chat = state.find_chat(chat)?;
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.chat_id == chat.id && m.id == message_id)
            .ok_or_else(|| TelegramError::Rpc(format!("message {message_id} not found")))?;
        message.text = text.to_string();
        Ok(())
    }

    async fn delete(&self, chat: &ChatRef, message_ids: &[i32]) -> Result<usize, TelegramError> {
        let mut state = self.state.lock().unwrap();
        let chat = state.find_chat(chat)?;
        let before = state.messages.len();
        state
            .messages
            .retain(|m| m.chat_id != chat.id || !message_ids.contains(&m.id));
        Ok(before - state.messages.len())
    }

    async fn forward(
        &self,
        from: &ChatRef,
        to: &ChatRef,
        message_ids: &[i32],
    ) -> Result<Vec<i32>, TelegramError> {
        let mut state = self.state.lock().unwrap();
        let source = state.find_chat(from)?;
        let destination = state.find_chat(to)?;
        let mut copies = Vec::new();
        for id in message_ids {
            if let Some(original) = state
                .messages
                .iter()
                .find(|m| m.chat_id == source.id && m.id == *id)
            {
                let mut copy = original.clone();
                copy.chat_id = destination.id;
                copy.outgoing = true;
                copies.push(copy);
            }
        }
        let mut new_ids = Vec::with_capacity(copies.len());
        for mut copy in copies {
            copy.id = state.next_message_id;
            state.next_message_id += 1;
            new_ids.push(copy.id);
            state.messages.push(copy);
        }
        Ok(new_ids)
    }

    async fn resolve(&self, username: &str) -> Result<Option<ChatInfo>, TelegramError> {
        let name = username.trim().trim_start_matches('@');
        if name.is_empty() {
            return Ok(None);
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .chats
            .iter()
            .find(|c| {
                c.username
                    .as_deref()
                    .is_some_and(|u| u.eq_ignore_ascii_case(name))
            })
            .cloned())
    }
}
