/// End-to-end MCP flows through `McpServer::process_line`
use habit_streak_engine::mcp::protocol::{error_codes, JsonRpcResponse};
use habit_streak_engine::mcp::McpServer;
use habit_streak_engine::{HabitTrackerServer, ServerConfig, SubscriptionTier};
use serde_json::{json, Value};
use tempfile::TempDir;

async fn start(dir: &TempDir, tier: SubscriptionTier) -> McpServer {
    let config = ServerConfig::new(dir.path().join("habits.db")).with_tier(tier);
    let tracker = HabitTrackerServer::new(config)
        .await
        .expect("Failed to create server");
    McpServer::new(tracker)
}

async fn call(server: &mut McpServer, id: u32, name: &str, arguments: Value) -> JsonRpcResponse {
    let line = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
    .to_string();
    server.process_line(&line).await.expect("expected a response")
}

fn payload(response: &JsonRpcResponse) -> Value {
    assert!(response.error.is_none(), "unexpected error: {:?}", response.error);
    let result = response.result.as_ref().expect("missing result");
    assert_eq!(result["isError"], false);
    let text = result["content"][0]["text"].as_str().expect("missing text");
    serde_json::from_str(text).expect("tool text is not JSON")
}

fn error_code(response: &JsonRpcResponse) -> i32 {
    response.error.as_ref().expect("expected an error").code
}

#[cfg(test)]
mod server_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_habit_lifecycle_over_mcp() {
        let dir = TempDir::new().unwrap();
        let mut server = start(&dir, SubscriptionTier::Free).await;

        let created = payload(&call(&mut server, 1, "create_habit", json!({ "name": "Read" })).await);
        let habit_id = created["habit_id"].as_str().unwrap().to_string();

        let marked = payload(&call(&mut server, 2, "mark_complete", json!({ "habit_id": habit_id })).await);
        assert_eq!(marked["statistics"]["streak"], 1);
        assert_eq!(marked["already_completed"], false);

        let again = payload(&call(&mut server, 3, "mark_complete", json!({ "habit_id": habit_id })).await);
        assert_eq!(again["already_completed"], true);
        assert_eq!(again["statistics"]["total_completions"], 1);

        let status = payload(&call(&mut server, 4, "habit_status", json!({ "habit_id": habit_id })).await);
        assert_eq!(status["habits"][0]["status"], "done_today");

        let unmarked = payload(&call(&mut server, 5, "unmark_complete", json!({ "habit_id": habit_id })).await);
        assert_eq!(unmarked["statistics"]["streak"], 0);

        let listed = payload(&call(&mut server, 6, "list_habits", Value::Null).await);
        assert_eq!(listed["summary"]["total_habits"], 1);
    }

    #[tokio::test]
    async fn test_state_persists_across_restarts() {
        let dir = TempDir::new().unwrap();

        let habit_id = {
            let mut server = start(&dir, SubscriptionTier::Free).await;
            let created = payload(&call(&mut server, 1, "create_habit", json!({ "name": "Walk" })).await);
            let habit_id = created["habit_id"].as_str().unwrap().to_string();
            payload(&call(&mut server, 2, "mark_complete", json!({ "habit_id": habit_id })).await);
            habit_id
        };

        let mut server = start(&dir, SubscriptionTier::Free).await;
        let status = payload(&call(&mut server, 1, "habit_status", json!({ "habit_id": habit_id })).await);
        assert_eq!(status["habits"][0]["statistics"]["streak"], 1);
        assert_eq!(status["source"], "cached");
    }

    #[tokio::test]
    async fn test_error_codes() {
        let dir = TempDir::new().unwrap();
        let mut server = start(&dir, SubscriptionTier::Free).await;

        let missing = call(
            &mut server,
            1,
            "mark_complete",
            json!({ "habit_id": "0191d3a4-0000-7000-8000-000000000000" }),
        )
        .await;
        assert_eq!(error_code(&missing), error_codes::NOT_FOUND);

        let bad_args = call(&mut server, 2, "mark_complete", json!({ "date": "2024-01-01" })).await;
        assert_eq!(error_code(&bad_args), error_codes::INVALID_PARAMS);

        let created = payload(&call(&mut server, 3, "create_habit", json!({ "name": "Floss" })).await);
        let habit_id = created["habit_id"].as_str().unwrap();
        let bad_date = call(
            &mut server,
            4,
            "mark_complete",
            json!({ "habit_id": habit_id, "date": "2024-13-40" }),
        )
        .await;
        assert_eq!(error_code(&bad_date), error_codes::VALIDATION_ERROR);

        let gated = call(&mut server, 5, "export_habit", json!({ "habit_id": habit_id })).await;
        assert_eq!(error_code(&gated), error_codes::FEATURE_UNAVAILABLE);

        let unknown = server
            .process_line(r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(error_code(&unknown), error_codes::METHOD_NOT_FOUND);

        let garbage = server.process_line("{not json").await.unwrap();
        assert_eq!(error_code(&garbage), error_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_free_tier_habit_limit() {
        let dir = TempDir::new().unwrap();
        let mut server = start(&dir, SubscriptionTier::Free).await;
        let limit = SubscriptionTier::Free.features().max_habits;

        for i in 0..limit {
            let response = call(&mut server, i, "create_habit", json!({ "name": format!("Habit {}", i) })).await;
            payload(&response);
        }

        let over = call(&mut server, limit, "create_habit", json!({ "name": "One too many" })).await;
        assert_eq!(error_code(&over), error_codes::LIMIT_REACHED);

        let subscription = payload(&call(&mut server, limit + 1, "subscription", json!({})).await);
        assert_eq!(subscription["habits_used"], limit);
        assert_eq!(subscription["upgrade_available"], true);
    }
}
