//! MCP server handler: `tools/list` and `tools/call` over the Telegram layer.
//!
//! Dispatch is by tool name; arguments deserialize into per-tool structs.
//! Malformed requests (unknown tool, bad arguments) are protocol errors;
//! Telegram-side failures come back as tool results with `is_error` so the
//! calling model can see and react to them.

mod tools;

use std::future::Future;
use std::sync::Arc;

use rmcp::ServerHandler;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::telegram::{ChatRef, TelegramApi, TelegramError};

use tools::{
    DeleteMessagesArgs, EditMessageArgs, ForwardMessagesArgs, ListDialogsArgs, ListMessagesArgs,
    ResolveUsernameArgs, SearchMessagesArgs, SendMessageArgs, clamp_limit, tool_descriptors,
};

const INSTRUCTIONS: &str = "Exposes the signed-in Telegram account as tools: list dialogs, \
read/search chat history, send/edit/delete/forward messages, resolve usernames. Chats are \
addressed by numeric id or @username.";

/// The MCP server: a thin dispatch layer over [`TelegramApi`].
#[derive(Clone)]
pub struct TelegramMcpServer {
    telegram: Arc<dyn TelegramApi>,
}

impl TelegramMcpServer {
    /// Build the server over any Telegram backend.
    #[must_use]
    pub fn new(telegram: Arc<dyn TelegramApi>) -> Self {
        Self { telegram }
    }

    /// Dispatch one tool call by name. Public so transport-independent tests
    /// can drive the tool surface directly.
    ///
    /// # Errors
    /// `invalid_params` for unknown tools or undeserializable arguments;
    /// `internal_error` only if a result fails to serialize.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<CallToolResult, ErrorData> {
        match name {
            "get_me" => self.reply(self.telegram.me().await),
            "list_dialogs" => {
                let args: ListDialogsArgs = parse_args(name, arguments)?;
                self.reply(self.telegram.dialogs(clamp_limit(args.limit)).await)
            }
            "list_messages" => {
                let args: ListMessagesArgs = parse_args(name, arguments)?;
                let chat = match ChatRef::parse(&args.chat) {
                    Ok(chat) => chat,
                    Err(e) => return Ok(tool_error(&e)),
                };
                self.reply(self.telegram.history(&chat, clamp_limit(args.limit)).await)
            }
            "search_messages" => {
                let args: SearchMessagesArgs = parse_args(name, arguments)?;
                let chat = match ChatRef::parse(&args.chat) {
                    Ok(chat) => chat,
                    Err(e) => return Ok(tool_error(&e)),
                };
                self.reply(
                    self.telegram
                        .search(&chat, &args.query, clamp_limit(args.limit))
                        .await,
                )
            }
            "send_message" => {
                let args: SendMessageArgs = parse_args(name, arguments)?;
                if args.message.trim().is_empty() {
                    return Err(ErrorData::invalid_params(
                        "message must be non-empty",
                        None,
                    ));
                }
                let chat = match ChatRef::parse(&args.chat) {
                    Ok(chat) => chat,
                    Err(e) => return Ok(tool_error(&e)),
                };
                self.reply(
                    self.telegram
                        .send(&chat, &args.message, args.reply_to)
                        .await,
                )
            }
            "edit_message" => {
                let args: EditMessageArgs = parse_args(name, arguments)?;
                if args.new_message.trim().is_empty() {
                    return Err(ErrorData::invalid_params(
                        "new_message must be non-empty",
                        None,
                    ));
                }
                let chat = match ChatRef::parse(&args.chat) {
                    Ok(chat) => chat,
                    Err(e) => return Ok(tool_error(&e)),
                };
                self.reply(
                    self.telegram
                        .edit(&chat, args.message_id, &args.new_message)
                        .await
                        .map(|()| serde_json::json!({ "edited": args.message_id })),
                )
            }
            "delete_messages" => {
                let args: DeleteMessagesArgs = parse_args(name, arguments)?;
                if args.message_ids.is_empty() {
                    return Err(ErrorData::invalid_params(
                        "message_ids must be non-empty",
                        None,
                    ));
                }
                let chat = match ChatRef::parse(&args.chat) {
                    Ok(chat) => chat,
                    Err(e) => return Ok(tool_error(&e)),
                };
                self.reply(
                    self.telegram
                        .delete(&chat, &args.message_ids)
                        .await
                        .map(|deleted| serde_json::json!({ "deleted": deleted })),
                )
            }
            "forward_messages" => {
                let args: ForwardMessagesArgs = parse_args(name, arguments)?;
                if args.message_ids.is_empty() {
                    return Err(ErrorData::invalid_params(
                        "message_ids must be non-empty",
                        None,
                    ));
                }
                let (from, to) = match (
                    ChatRef::parse(&args.from_chat),
                    ChatRef::parse(&args.to_chat),
                ) {
                    (Ok(from), Ok(to)) => (from, to),
                    (Err(e), _) | (_, Err(e)) => return Ok(tool_error(&e)),
                };
                self.reply(
                    self.telegram
                        .forward(&from, &to, &args.message_ids)
                        .await
                        .map(|ids| serde_json::json!({ "forwarded_message_ids": ids })),
                )
            }
            "resolve_username" => {
                let args: ResolveUsernameArgs = parse_args(name, arguments)?;
                self.reply(self.telegram.resolve(&args.username).await)
            }
            other => Err(ErrorData::invalid_params(
                format!("unknown tool: {other}"),
                None,
            )),
        }
    }

    /// Render a Telegram result as a tool result: JSON text on success,
    /// `is_error` content on failure.
    fn reply<T: serde::Serialize>(
        &self,
        result: Result<T, TelegramError>,
    ) -> Result<CallToolResult, ErrorData> {
        match result {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value)
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(tool_error(&e)),
        }
    }
}

fn tool_error(e: &TelegramError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(e.to_string())])
}

fn parse_args<T: DeserializeOwned>(
    name: &str,
    arguments: Option<serde_json::Map<String, Value>>,
) -> Result<T, ErrorData> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| ErrorData::invalid_params(format!("invalid arguments for {name}: {e}"), None))
}

impl ServerHandler for TelegramMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.into()),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(tool_descriptors())))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move { self.dispatch(&request.name, request.arguments).await }
    }
}
