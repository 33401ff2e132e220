/// MCP server implementation that handles JSON-RPC communication
///
/// This module implements the actual MCP server that:
/// 1. Reads JSON-RPC requests from stdin, one per line
/// 2. Dispatches tool calls to the command handlers
/// 3. Writes JSON-RPC responses to stdout

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::context::RequestContext;
use crate::mcp::protocol::*;
use crate::storage::SqliteStorage;
use crate::tools::{self, CommandError};
use crate::{HabitTrackerServer, ServerError};

/// Arguments for tools that take none
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

/// MCP server that handles communication with the client
pub struct McpServer {
    /// The underlying habit tracker server
    habit_tracker: HabitTrackerServer,
    /// Whether the client has sent `initialized`
    initialized: bool,
}

impl McpServer {
    pub fn new(habit_tracker: HabitTrackerServer) -> Self {
        Self {
            habit_tracker,
            initialized: false,
        }
    }

    /// Run the MCP server, handling JSON-RPC over stdin/stdout
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Starting MCP server, waiting for JSON-RPC requests...");

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = tokio::io::stdout();

        let mut line = String::new();

        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("MCP server shutting down (stdin closed)");
                    break;
                }
                Ok(_) => {
                    if let Some(response) = self.process_line(&line).await {
                        let response_str = serde_json::to_string(&response)?;

                        stdout.write_all(response_str.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;

                        debug!("Sent response: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Process a single line of JSON-RPC input
    ///
    /// Returns `None` for blank lines and notifications.
    pub async fn process_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    json!(null),
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        self.handle_request(request).await
    }

    /// Whether the client has completed the initialization handshake
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                return None;
            }
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tools_call(request),
            _ => JsonRpcResponse::error(
                request.id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
                None,
            ),
        };
        Some(response)
    }

    fn handle_initialize(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        info!("MCP client connected");

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "Habit Streak Engine".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        to_response(request.id, &result)
    }

    fn handle_tools_call(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tool_params: ToolCallParams = match request.params.map(serde_json::from_value::<ToolCallParams>) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    request.id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid parameters: {}", e),
                    None,
                );
            }
            None => {
                return JsonRpcResponse::error(
                    request.id,
                    error_codes::INVALID_PARAMS,
                    "Missing parameters".to_string(),
                    None,
                );
            }
        };

        let storage = self.habit_tracker.storage();
        let ctx = self.habit_tracker.request_context();
        let args = tool_params.arguments;
        let id = request.id;

        match tool_params.name.as_str() {
            "create_habit" => call(id, storage, &ctx, args, tools::create_habit),
            "update_habit" => call(id, storage, &ctx, args, tools::update_habit),
            "archive_habit" => call(id, storage, &ctx, args, tools::archive_habit),
            "unarchive_habit" => call(id, storage, &ctx, args, tools::unarchive_habit),
            "delete_habit" => call(id, storage, &ctx, args, tools::delete_habit),
            "list_habits" => call(id, storage, &ctx, args, tools::list_habits),
            "mark_complete" => call(id, storage, &ctx, args, tools::mark_complete),
            "unmark_complete" => call(id, storage, &ctx, args, tools::unmark_complete),
            "log_habit" => call(id, storage, &ctx, args, tools::log_habit),
            "list_logs" => call(id, storage, &ctx, args, tools::list_logs),
            "habit_status" => call(id, storage, &ctx, args, tools::get_habit_status),
            "recalculate_statistics" => call(id, storage, &ctx, args, tools::recalculate_statistics),
            "create_group" => call(id, storage, &ctx, args, tools::create_group),
            "list_groups" => call(id, storage, &ctx, args, |s, c, _: NoParams| tools::list_groups(s, c)),
            "delete_group" => call(id, storage, &ctx, args, tools::delete_group),
            "export_habit" => call(id, storage, &ctx, args, tools::export_habit),
            "import_habit" => call(id, storage, &ctx, args, tools::import_habit),
            "weekly_stats" => call(id, storage, &ctx, args, |s, c, _: NoParams| tools::get_weekly_stats(s, c)),
            "monthly_stats" => call(id, storage, &ctx, args, tools::get_monthly_stats),
            "habit_progress" => call(id, storage, &ctx, args, tools::get_habit_progress),
            "owner_summary" => call(id, storage, &ctx, args, |s, c, _: NoParams| tools::get_owner_summary(s, c)),
            "subscription" => call(id, storage, &ctx, args, |s, c, _: NoParams| tools::get_subscription(s, c)),
            other => {
                warn!("Unknown tool requested: {}", other);
                to_response(id, &ToolCallResult::error(format!("Unknown tool: {}", other)))
            }
        }
    }
}

/// Deserialize the arguments, run the handler and render the outcome
fn call<P, R, F>(id: Value, storage: &SqliteStorage, ctx: &RequestContext, args: Value, handler: F) -> JsonRpcResponse
where
    P: DeserializeOwned,
    R: Serialize,
    F: FnOnce(&SqliteStorage, &RequestContext, P) -> Result<R, CommandError>,
{
    // Tools without arguments may be called with none at all
    let args = if args.is_null() { json!({}) } else { args };
    let params: P = match serde_json::from_value(args) {
        Ok(params) => params,
        Err(e) => {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, format!("Invalid arguments: {}", e), None);
        }
    };

    match handler(storage, ctx, params) {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(text) => to_response(id, &ToolCallResult::success(text)),
            Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string(), None),
        },
        Err(e) => {
            match &e {
                CommandError::Storage(inner) => error!("Command failed in storage: {}", inner),
                other => debug!("Command rejected: {}", other),
            }
            JsonRpcResponse::from_command_error(id, &e)
        }
    }
}

fn to_response<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string(), None),
    }
}

fn tool<P: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    let schema = schemars::schema_for!(P);
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" })),
    }
}

/// Every tool this server exposes
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool::<tools::CreateHabitParams>("create_habit", "Create a new habit to track"),
        tool::<tools::UpdateHabitParams>("update_habit", "Change a habit's name, description, group or schedule"),
        tool::<tools::HabitRefParams>("archive_habit", "Archive a habit, keeping its history"),
        tool::<tools::HabitRefParams>("unarchive_habit", "Bring an archived habit back"),
        tool::<tools::HabitRefParams>("delete_habit", "Delete a habit and all of its logs"),
        tool::<tools::ListHabitsParams>("list_habits", "List habits with their streaks and completion rates"),
        tool::<tools::MarkCompleteParams>("mark_complete", "Mark a habit as completed for today or a given date"),
        tool::<tools::UnmarkCompleteParams>("unmark_complete", "Remove a completion for today or a given date"),
        tool::<tools::LogHabitParams>("log_habit", "Record a habit as completed, skipped or partial on a date"),
        tool::<tools::ListLogsParams>("list_logs", "Show a habit's most recent logs"),
        tool::<tools::StatusParams>("habit_status", "Check today's status and streaks of one or all habits"),
        tool::<tools::RecalculateParams>("recalculate_statistics", "Recompute cached statistics from the log history"),
        tool::<tools::CreateGroupParams>("create_group", "Create a group to organize habits"),
        tool::<NoParams>("list_groups", "List habit groups"),
        tool::<tools::GroupRefParams>("delete_group", "Delete a group; its habits are kept"),
        tool::<tools::HabitRefParams>("export_habit", "Export a habit with its full history as JSON"),
        tool::<tools::ImportHabitParams>("import_habit", "Import a habit previously exported"),
        tool::<NoParams>("weekly_stats", "Completions per weekday over the last seven days"),
        tool::<tools::MonthlyStatsParams>("monthly_stats", "Completions per day for a calendar month"),
        tool::<tools::HabitProgressParams>("habit_progress", "Daily values and consistency for one habit"),
        tool::<NoParams>("owner_summary", "Totals and best streaks across all habits"),
        tool::<NoParams>("subscription", "Show what the current subscription includes"),
    ]
}
