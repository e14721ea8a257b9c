//! Tool dispatch over an in-memory Telegram backend.

use std::sync::Arc;

use rmcp::model::{CallToolResult, RawContent};
use serde_json::{Value, json};

use telegram_mcp::TelegramMcpServer;
use telegram_mcp::test_support::FakeTelegram;

fn server_with_chats() -> (TelegramMcpServer, Arc<FakeTelegram>) {
    let fake = Arc::new(
        FakeTelegram::new()
            .with_chat(-1001, "Rust News", Some("rust_news"), "channel")
            .with_chat(42, "Alice", Some("alice"), "user"),
    );
    (TelegramMcpServer::new(fake.clone()), fake)
}

fn args(value: Value) -> Option<serde_json::Map<String, Value>> {
    value.as_object().cloned()
}

fn text_of(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect()
}

fn json_of(result: &CallToolResult) -> Value {
    serde_json::from_str(&text_of(result)).expect("tool result should be JSON")
}

#[tokio::test]
async fn get_me_reports_the_signed_in_account() {
    let (server, _) = server_with_chats();
    let result = server.dispatch("get_me", None).await.expect("dispatch");
    assert_ne!(result.is_error, Some(true));
    let me = json_of(&result);
    assert_eq!(me["id"], json!(1000));
    assert_eq!(me["username"], json!("test_account"));
}

#[tokio::test]
async fn sent_messages_show_up_in_history_newest_first() {
    let (server, fake) = server_with_chats();
    fake.push_incoming(42, "Alice", "hi there");

    let result = server
        .dispatch(
            "send_message",
            args(json!({ "chat": "@alice", "message": "hello back" })),
        )
        .await
        .expect("send");
    assert_ne!(result.is_error, Some(true));
    let sent = json_of(&result);
    assert_eq!(sent["text"], json!("hello back"));
    assert_eq!(sent["outgoing"], json!(true));

    let history = server
        .dispatch("list_messages", args(json!({ "chat": "42" })))
        .await
        .expect("history");
    let messages = json_of(&history);
    let texts: Vec<&str> = messages
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|m| m["text"].as_str())
        .collect();
    assert_eq!(texts, vec!["hello back", "hi there"]);
}

#[tokio::test]
async fn reply_to_missing_message_is_a_tool_error() {
    let (server, _) = server_with_chats();
    let result = server
        .dispatch(
            "send_message",
            args(json!({ "chat": "@alice", "message": "x", "reply_to": 999 })),
        )
        .await
        .expect("dispatch");
    assert_eq!(result.is_error, Some(true));
}

#[tokio::test]
async fn search_filters_by_text_case_insensitively() {
    let (server, fake) = server_with_chats();
    fake.push_incoming(-1001, "Bot", "Release 1.89 is out");
    fake.push_incoming(-1001, "Bot", "unrelated chatter");
    fake.push_incoming(-1001, "Bot", "release notes follow");

    let result = server
        .dispatch(
            "search_messages",
            args(json!({ "chat": "@rust_news", "query": "RELEASE" })),
        )
        .await
        .expect("search");
    let hits = json_of(&result);
    assert_eq!(hits.as_array().expect("array").len(), 2);
}

#[tokio::test]
async fn dialogs_carry_the_latest_message() {
    let (server, fake) = server_with_chats();
    fake.push_incoming(42, "Alice", "first");
    fake.push_incoming(42, "Alice", "second");

    let result = server.dispatch("list_dialogs", None).await.expect("dialogs");
    let dialogs = json_of(&result);
    let alice = dialogs
        .as_array()
        .expect("array")
        .iter()
        .find(|d| d["chat"]["id"] == json!(42))
        .expect("alice dialog");
    assert_eq!(alice["last_message"], json!("second"));
}

#[tokio::test]
async fn edit_rewrites_the_stored_message() {
    let (server, fake) = server_with_chats();
    let id = fake.push_incoming(42, "Alice", "typo herr");

    let result = server
        .dispatch(
            "edit_message",
            args(json!({ "chat": "42", "message_id": id, "new_message": "typo here" })),
        )
        .await
        .expect("edit");
    assert_ne!(result.is_error, Some(true));
    assert_eq!(fake.messages_in(42)[0].text, "typo here");
}

#[tokio::test]
async fn delete_reports_how_many_were_removed() {
    let (server, fake) = server_with_chats();
    let a = fake.push_incoming(42, "Alice", "one");
    let b = fake.push_incoming(42, "Alice", "two");
    fake.push_incoming(42, "Alice", "three");

    let result = server
        .dispatch(
            "delete_messages",
            args(json!({ "chat": "42", "message_ids": [a, b, 9999] })),
        )
        .await
        .expect("delete");
    let body = json_of(&result);
    assert_eq!(body["deleted"], json!(2));
    assert_eq!(fake.messages_in(42).len(), 1);
}

#[tokio::test]
async fn forward_copies_messages_into_the_destination() {
    let (server, fake) = server_with_chats();
    let id = fake.push_incoming(-1001, "Bot", "announcement");

    let result = server
        .dispatch(
            "forward_messages",
            args(json!({
                "from_chat": "@rust_news",
                "to_chat": "@alice",
                "message_ids": [id]
            })),
        )
        .await
        .expect("forward");
    let body = json_of(&result);
    assert_eq!(
        body["forwarded_message_ids"]
            .as_array()
            .expect("array")
            .len(),
        1
    );
    assert_eq!(fake.messages_in(42)[0].text, "announcement");
}

#[tokio::test]
async fn resolve_username_returns_null_for_unknown_names() {
    let (server, _) = server_with_chats();

    let found = server
        .dispatch("resolve_username", args(json!({ "username": "@alice" })))
        .await
        .expect("resolve");
    assert_eq!(json_of(&found)["id"], json!(42));

    let missing = server
        .dispatch("resolve_username", args(json!({ "username": "nobody" })))
        .await
        .expect("resolve");
    assert_eq!(json_of(&missing), Value::Null);
}

#[tokio::test]
async fn unknown_chat_is_a_tool_error_not_a_protocol_error() {
    let (server, _) = server_with_chats();
    let result = server
        .dispatch("list_messages", args(json!({ "chat": "@ghost" })))
        .await
        .expect("dispatch succeeds at the protocol level");
    assert_eq!(result.is_error, Some(true));
    assert!(text_of(&result).contains("chat not found"));
}

#[tokio::test]
async fn unknown_tool_is_rejected() {
    let (server, _) = server_with_chats();
    let err = server
        .dispatch("download_media", None)
        .await
        .expect_err("unknown tool");
    assert!(err.message.contains("unknown tool"));
}

#[tokio::test]
async fn malformed_arguments_are_rejected() {
    let (server, _) = server_with_chats();
    let err = server
        .dispatch("send_message", args(json!({ "chat": "@alice" })))
        .await
        .expect_err("missing message field");
    assert!(err.message.contains("send_message"));
}

#[tokio::test]
async fn blank_message_text_is_rejected() {
    let (server, _) = server_with_chats();
    let err = server
        .dispatch(
            "send_message",
            args(json!({ "chat": "@alice", "message": "   " })),
        )
        .await
        .expect_err("blank message");
    assert!(err.message.contains("non-empty"));
}

#[tokio::test]
async fn blank_replacement_text_is_rejected() {
    let (server, fake) = server_with_chats();
    let id = fake.push_incoming(42, "Alice", "keep me");

    let err = server
        .dispatch(
            "edit_message",
            args(json!({ "chat": "42", "message_id": id, "new_message": "  " })),
        )
        .await
        .expect_err("blank replacement");
    assert!(err.message.contains("non-empty"));
    assert_eq!(fake.messages_in(42)[0].text, "keep me");
}

#[tokio::test]
async fn empty_delete_list_is_rejected() {
    let (server, _) = server_with_chats();
    let err = server
        .dispatch(
            "delete_messages",
            args(json!({ "chat": "42", "message_ids": [] })),
        )
        .await
        .expect_err("empty id list");
    assert!(err.message.contains("message_ids"));
}
