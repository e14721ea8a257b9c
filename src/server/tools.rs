//! Tool registry: descriptors (name + JSON schema) and argument types.

use std::sync::Arc;

use rmcp::model::Tool;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// Clamp a tool-supplied limit into 1..=100.
pub(crate) fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

fn tool(name: &'static str, description: &'static str, schema: serde_json::Value) -> Tool {
    let map = schema.as_object().cloned().unwrap_or_default();
    Tool {
        name: name.into(),
        title: None,
        description: Some(description.into()),
        input_schema: Arc::new(map),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

fn chat_property() -> serde_json::Value {
    json!({
        "type": "string",
        "description": "Chat id (e.g. -1001234567890) or username (e.g. @rustlang)"
    })
}

fn limit_property() -> serde_json::Value {
    json!({
        "type": "integer",
        "description": "Max results (1-100, default 20)"
    })
}

/// All tool descriptors served by `tools/list`.
pub(crate) fn tool_descriptors() -> Vec<Tool> {
    vec![
        tool(
            "get_me",
            "Get the signed-in Telegram account (id, name, username).",
            json!({ "type": "object", "properties": {} }),
        ),
        tool(
            "list_dialogs",
            "List the most recent open chats (dialogs), newest first.",
            json!({
                "type": "object",
                "properties": { "limit": limit_property() }
            }),
        ),
        tool(
            "list_messages",
            "List the most recent messages in a chat, newest first.",
            json!({
                "type": "object",
                "properties": {
                    "chat": chat_property(),
                    "limit": limit_property()
                },
                "required": ["chat"]
            }),
        ),
        tool(
            "search_messages",
            "Search messages in a chat by text.",
            json!({
                "type": "object",
                "properties": {
                    "chat": chat_property(),
                    "query": { "type": "string", "description": "Text to search for" },
                    "limit": limit_property()
                },
                "required": ["chat", "query"]
            }),
        ),
        tool(
            "send_message",
            "Send a text message to a chat, optionally as a reply.",
            json!({
                "type": "object",
                "properties": {
                    "chat": chat_property(),
                    "message": { "type": "string", "description": "Message text" },
                    "reply_to": { "type": "integer", "description": "Message id to reply to" }
                },
                "required": ["chat", "message"]
            }),
        ),
        tool(
            "edit_message",
            "Edit a message previously sent by this account.",
            json!({
                "type": "object",
                "properties": {
                    "chat": chat_property(),
                    "message_id": { "type": "integer", "description": "Id of the message to edit" },
                    "new_message": { "type": "string", "description": "Replacement text" }
                },
                "required": ["chat", "message_id", "new_message"]
            }),
        ),
        tool(
            "delete_messages",
            "Delete messages from a chat by id.",
            json!({
                "type": "object",
                "properties": {
                    "chat": chat_property(),
                    "message_ids": {
                        "type": "array",
                        "items": { "type": "integer" },
                        "description": "Message ids to delete"
                    }
                },
                "required": ["chat", "message_ids"]
            }),
        ),
        tool(
            "forward_messages",
            "Forward messages from one chat to another.",
            json!({
                "type": "object",
                "properties": {
                    "from_chat": chat_property(),
                    "to_chat": chat_property(),
                    "message_ids": {
                        "type": "array",
                        "items": { "type": "integer" },
                        "description": "Message ids to forward"
                    }
                },
                "required": ["from_chat", "to_chat", "message_ids"]
            }),
        ),
        tool(
            "resolve_username",
            "Resolve a public @username to its chat (user, group, or channel).",
            json!({
                "type": "object",
                "properties": {
                    "username": { "type": "string", "description": "Username, with or without @" }
                },
                "required": ["username"]
            }),
        ),
    ]
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListDialogsArgs {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListMessagesArgs {
    pub chat: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchMessagesArgs {
    pub chat: String,
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessageArgs {
    pub chat: String,
    pub message: String,
    #[serde(default)]
    pub reply_to: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EditMessageArgs {
    pub chat: String,
    pub message_id: i32,
    pub new_message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteMessagesArgs {
    pub chat: String,
    pub message_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ForwardMessagesArgs {
    pub from_chat: String,
    pub to_chat: String,
    pub message_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveUsernameArgs {
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn descriptor_names_are_unique_and_complete() {
        let tools = tool_descriptors();
        let names: HashSet<_> = tools.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names.len(), tools.len(), "duplicate tool name");
        for expected in [
            "get_me",
            "list_dialogs",
            "list_messages",
            "search_messages",
            "send_message",
            "edit_message",
            "delete_messages",
            "forward_messages",
            "resolve_username",
        ] {
            assert!(names.contains(expected), "missing tool {expected}");
        }
    }

    #[test]
    fn every_schema_is_an_object() {
        for tool in tool_descriptors() {
            assert_eq!(
                tool.input_schema.get("type").and_then(|v| v.as_str()),
                Some("object"),
                "tool {} schema must be an object",
                tool.name
            );
        }
    }

    #[test]
    fn limits_clamp_into_range() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(20), 20);
        assert_eq!(clamp_limit(10_000), 100);
    }
}
