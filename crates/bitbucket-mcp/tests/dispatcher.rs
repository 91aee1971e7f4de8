//! Dispatcher behaviour over the full tool catalog with an in-memory backend.

mod common;

use serde_json::{json, Value};

use bitbucket_mcp::types::RequestContext;
use common::*;

const TOOL_NAMES: [&str; 16] = [
    "bitbucket_create_pull_request",
    "bitbucket_get_pull_request_details",
    "bitbucket_merge_pull_request",
    "bitbucket_decline_pull_request",
    "bitbucket_add_pull_request_comment",
    "bitbucket_get_pull_request_diff",
    "bitbucket_get_pull_request_reviews",
    "bitbucket_add_pull_request_file_line_comment",
    "bitbucket_list_workspaces",
    "bitbucket_list_repositories",
    "bitbucket_list_repository_branches",
    "bitbucket_get_repository_details",
    "bitbucket_get_file_content",
    "bitbucket_create_branch",
    "bitbucket_search_content",
    "bitbucket_get_user_profile",
];

async fn send(handler: &bitbucket_mcp::ProtocolHandler, msg: Value) -> Option<Value> {
    handler.handle_message(msg, &RequestContext::default()).await
}

async fn send_unwrap(handler: &bitbucket_mcp::ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

fn error_code(response: &Value) -> i64 {
    response["error"]["code"].as_i64().expect("error code")
}

// ─────────────────────── tools/list ───────────────────────

#[tokio::test]
async fn test_tools_list_projects_every_tool_in_order() {
    let api = fake();
    let handler = open_handler(&api);

    let response = send_unwrap(&handler, request(json!(1), "tools/list", json!({}))).await;
    let tools = response["result"]["tools"].as_array().unwrap();

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, TOOL_NAMES);

    for tool in tools {
        let keys: Vec<&String> = tool.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3, "unexpected keys on {}", tool["name"]);
        assert!(tool["description"].as_str().is_some_and(|d| !d.is_empty()));
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_tools_list_ignores_params() {
    let handler = open_handler(&fake());
    let response = send_unwrap(&handler, json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" })).await;
    assert_eq!(response["result"]["tools"].as_array().unwrap().len(), 16);
}

// ─────────────────────── tools/call ───────────────────────

#[tokio::test]
async fn test_tool_call_invokes_backend_once() {
    let api = fake();
    let handler = open_handler(&api);

    let response = send_unwrap(
        &handler,
        tool_call(7, "bitbucket_get_user_profile", json!({ "username": "jdoe" })),
    )
    .await;

    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 7);
    let body: Value = serde_json::from_str(result_text(&response)).unwrap();
    assert_eq!(body["slug"], "jdoe");
    assert_eq!(api.calls(), vec!["get_user"]);
}

#[tokio::test]
async fn test_text_tools_return_raw_body() {
    let handler = open_handler(&fake());
    let response = send_unwrap(
        &handler,
        tool_call(
            1,
            "bitbucket_get_pull_request_diff",
            json!({ "repository": "api", "prId": 3 }),
        ),
    )
    .await;
    assert!(result_text(&response).starts_with("diff --git"));
}

#[tokio::test]
async fn test_unknown_tool() {
    let handler = open_handler(&fake());
    let response = send_unwrap(&handler, tool_call(1, "bitbucket_delete_everything", json!({}))).await;
    assert_eq!(error_code(&response), -32601);
    assert_eq!(response["error"]["message"], "Unknown tool: bitbucket_delete_everything");
}

#[tokio::test]
async fn test_missing_or_bad_tool_name() {
    let handler = open_handler(&fake());
    for params in [
        json!({}),
        json!({ "name": 5 }),
        json!({ "name": "" }),
        Value::Null,
        json!(["bitbucket_list_workspaces"]),
        json!(["bitbucket_list_workspaces", {}]),
        json!("bitbucket_list_workspaces"),
    ] {
        let response = send_unwrap(&handler, request(json!(1), "tools/call", params.clone())).await;
        assert_eq!(error_code(&response), -32602, "params: {params}");
        assert_eq!(
            response["error"]["message"],
            "Invalid params: missing required field 'name' of type string."
        );
    }
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_backend() {
    let api = fake();
    let handler = open_handler(&api);

    let response = send_unwrap(
        &handler,
        tool_call(1, "bitbucket_get_user_profile", json!({ "wrong_param": "x" })),
    )
    .await;
    assert_eq!(error_code(&response), -32602);
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Invalid params:"), "{message}");
    assert!(message.contains("wrong_param"), "{message}");

    let response = send_unwrap(
        &handler,
        tool_call(2, "bitbucket_get_pull_request_details", json!({ "repository": "api", "prId": "x" })),
    )
    .await;
    assert_eq!(error_code(&response), -32602);

    for arguments in [json!(["jdoe"]), json!("jdoe"), json!(42)] {
        let response = send_unwrap(
            &handler,
            tool_call(3, "bitbucket_get_user_profile", arguments.clone()),
        )
        .await;
        assert_eq!(error_code(&response), -32602, "arguments: {arguments}");
    }

    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_missing_arguments_treated_as_empty_object() {
    let api = fake();
    let handler = open_handler(&api);

    // list_workspaces has no required fields.
    let response = send_unwrap(
        &handler,
        request(json!(1), "tools/call", json!({ "name": "bitbucket_list_workspaces" })),
    )
    .await;
    assert!(response.get("result").is_some(), "{response}");

    let response = send_unwrap(
        &handler,
        request(
            json!(2),
            "tools/call",
            json!({ "name": "bitbucket_list_workspaces", "arguments": null }),
        ),
    )
    .await;
    assert!(response.get("result").is_some(), "{response}");
    assert_eq!(api.calls(), vec!["list_workspaces", "list_workspaces"]);
}

#[tokio::test]
async fn test_bitbucket_api_error_maps_to_internal_error() {
    let handler = open_handler(&fake());
    let response = send_unwrap(
        &handler,
        tool_call(
            4,
            "bitbucket_get_repository_details",
            json!({ "workspaceSlug": "PROJ", "repoSlug": "missing" }),
        ),
    )
    .await;
    assert_eq!(error_code(&response), -32603);
    assert_eq!(
        response["error"]["message"],
        "Bitbucket API error: Repository missing does not exist."
    );
    assert_eq!(response["id"], 4);
}

#[tokio::test]
async fn test_other_backend_failures_are_tool_execution_errors() {
    let handler = open_handler(&fake());
    let response = send_unwrap(
        &handler,
        tool_call(1, "bitbucket_get_user_profile", json!({ "username": "misconfigured" })),
    )
    .await;
    assert_eq!(error_code(&response), -32603);
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Tool execution error:"), "{message}");
}

#[tokio::test]
async fn test_panicking_tool_is_contained() {
    let api = fake();
    let handler = open_handler(&api);

    let response = send_unwrap(
        &handler,
        tool_call(9, "bitbucket_get_user_profile", json!({ "username": "boom" })),
    )
    .await;
    assert_eq!(error_code(&response), -32000);
    assert_eq!(response["error"]["message"], "Internal server error");
    assert_eq!(response["id"], 9);

    // The dispatcher keeps serving.
    let response = send_unwrap(
        &handler,
        tool_call(10, "bitbucket_get_user_profile", json!({ "username": "jdoe" })),
    )
    .await;
    assert!(response.get("result").is_some());
}

// ─────────────────────── auth ───────────────────────

#[tokio::test]
async fn test_auth_required_when_secret_configured() {
    let api = fake();
    let handler = guarded_handler(&api, "s3cret");
    let call = tool_call(1, "bitbucket_list_workspaces", json!({}));

    for ctx in [RequestContext::default(), RequestContext::with_api_key("wrong")] {
        let response = handler.handle_message(call.clone(), &ctx).await.unwrap();
        assert_eq!(error_code(&response), -32603);
        assert_eq!(
            response["error"]["message"],
            "Authentication failed: Invalid or missing API key."
        );
    }
    assert!(api.calls().is_empty());

    let response = handler
        .handle_message(call, &RequestContext::with_api_key("s3cret"))
        .await
        .unwrap();
    assert!(response.get("result").is_some());
    assert_eq!(api.calls(), vec!["list_workspaces"]);
}

#[tokio::test]
async fn test_auth_only_guards_tool_calls() {
    let handler = guarded_handler(&fake(), "s3cret");

    let response = send_unwrap(&handler, request(json!(1), "tools/list", json!({}))).await;
    assert!(response.get("result").is_some());

    let response = send_unwrap(&handler, request(json!(2), "ping", json!({}))).await;
    assert_eq!(response["result"]["status"], "ok");
}

#[tokio::test]
async fn test_bad_name_reported_before_auth() {
    let handler = guarded_handler(&fake(), "s3cret");
    let response = send_unwrap(&handler, request(json!(1), "tools/call", json!({}))).await;
    assert_eq!(error_code(&response), -32602);
}

// ─────────────────────── envelopes ───────────────────────

#[tokio::test]
async fn test_notifications_are_never_answered() {
    let api = fake();
    let handler = open_handler(&api);

    for msg in [
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        json!({ "jsonrpc": "2.0", "method": "tools/call", "params": { "name": "bitbucket_list_workspaces" } }),
        json!({ "jsonrpc": "2.0", "method": "no/such/method" }),
        json!({ "method": "ping" }),
        json!([1, 2, 3]),
        json!(42),
    ] {
        assert!(send(&handler, msg.clone()).await.is_none(), "answered {msg}");
    }
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_id_round_trips() {
    let handler = open_handler(&fake());
    for id in [json!(0), json!(-12), json!("abc-123"), json!(1.5), Value::Null] {
        let response = send_unwrap(&handler, request(id.clone(), "ping", json!({}))).await;
        assert_eq!(response["id"], id);
    }
}

#[tokio::test]
async fn test_invalid_request_with_id() {
    let handler = open_handler(&fake());

    let response = send_unwrap(&handler, json!({ "jsonrpc": "1.0", "id": 5, "method": "ping" })).await;
    assert_eq!(error_code(&response), -32600);
    assert_eq!(response["error"]["message"], "Invalid JSON-RPC request.");
    assert_eq!(response["id"], 5);

    let response = send_unwrap(&handler, json!({ "jsonrpc": "2.0", "id": true, "method": "ping" })).await;
    assert_eq!(error_code(&response), -32600);
    assert_eq!(response["id"], Value::Null);
}

#[tokio::test]
async fn test_unknown_method() {
    let handler = open_handler(&fake());
    let response = send_unwrap(&handler, request(json!(3), "resources/list", json!({}))).await;
    assert_eq!(error_code(&response), -32601);
    assert_eq!(response["error"]["message"], "Method not found: resources/list");
}

// ─────────────────────── built-in methods ───────────────────────

#[tokio::test]
async fn test_initialize() {
    let handler = open_handler(&fake());
    let response = send_unwrap(
        &handler,
        request(
            json!(0),
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0" }
            }),
        ),
    )
    .await;

    let result = &response["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "bitbucket-mcp");
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn test_initialize_tolerates_partial_params() {
    let handler = open_handler(&fake());
    for params in [json!({}), json!({ "clientInfo": "nonsense" }), Value::Null] {
        let response = send_unwrap(&handler, request(json!(1), "initialize", params)).await;
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    }
}

#[tokio::test]
async fn test_ping_and_shutdown() {
    let handler = open_handler(&fake());
    for method in ["ping", "shutdown"] {
        let response = send_unwrap(&handler, request(json!(1), method, json!({}))).await;
        assert_eq!(response["result"]["status"], "ok");
        let ts = response["result"]["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok(), "{ts}");
    }
}

#[tokio::test]
async fn test_initialized_with_id_gets_empty_result() {
    let handler = open_handler(&fake());
    let response = send_unwrap(&handler, request(json!(1), "notifications/initialized", json!({}))).await;
    assert_eq!(response["result"], json!({}));
}
