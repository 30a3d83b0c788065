mod common;

use common::{app_with, tool_envelope, ApiCall, FakeRecordApi};
use kintone_bridge::mcp::server::McpServer;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn server() -> (McpServer, Arc<FakeRecordApi>) {
    let api = Arc::new(FakeRecordApi::new());
    (McpServer::with_app(app_with(api.clone())), api)
}

async fn call(server: &McpServer, request: Value) -> Value {
    let response = server
        .handle_message(&request.to_string())
        .await
        .expect("response");
    serde_json::to_value(response).expect("response json")
}

#[tokio::test]
async fn initialize_reports_capabilities() {
    let (server, _) = server();
    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert_eq!(response["result"]["serverInfo"]["name"], "kintone-bridge");
}

#[tokio::test]
async fn ping_answers_with_empty_result() {
    let (server, _) = server();
    let response = call(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;
    assert_eq!(response["result"], json!({}));
    assert!(response.get("error").map(Value::is_null).unwrap_or(true));
}

#[tokio::test]
async fn tools_list_contains_tools_and_aliases_once() {
    let (server, _) = server();
    let response = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
    let tools = response["result"]["tools"].as_array().expect("tools");
    let names: HashSet<&str> = tools
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert_eq!(names.len(), tools.len(), "tool names must be unique");
    for name in [
        "help",
        "kintone_record",
        "kintone_app",
        "kintone_text",
        "logging",
        "get_record",
        "search_records",
        "create_record",
        "update_record",
        "add_record_comment",
        "get_apps_info",
        "get_form_fields",
    ] {
        assert!(names.contains(name), "{} should be listed", name);
    }
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let (server, _) = server();
    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 3, "method": "resources/read"}),
    )
    .await;
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["id"], 3);
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let (server, _) = server();
    let response = server.handle_message("{not json").await.expect("response");
    let response = serde_json::to_value(response).expect("json");
    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], Value::Null);
}

#[tokio::test]
async fn wrong_version_is_an_invalid_request() {
    let (server, _) = server();
    let response = call(&server, json!({"jsonrpc": "1.0", "id": 4, "method": "ping"})).await;
    assert_eq!(response["error"]["code"], -32600);
    assert_eq!(response["id"], 4);
}

#[tokio::test]
async fn request_without_method_is_an_invalid_request() {
    let (server, _) = server();
    let response = call(&server, json!({"jsonrpc": "2.0", "id": 12})).await;
    assert_eq!(response["error"]["code"], -32600);
    assert_eq!(response["id"], 12);
}

#[tokio::test]
async fn notifications_get_no_response() {
    let (server, _) = server();
    let raw = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
    assert!(server.handle_message(&raw).await.is_none());
}

#[tokio::test]
async fn legacy_create_alias_normalizes_before_sending() {
    let (server, api) = server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {
                "name": "create_record",
                "arguments": {
                    "app_id": 7,
                    "fields": {
                        "category": {"value": "豸郁怜刀雋ｻ"},
                        "title": {"value": "  出張\u{0007} "}
                    }
                }
            }
        }),
    )
    .await;
    let envelope = tool_envelope(&response["result"]);
    assert_eq!(envelope["ok"], true);
    assert_eq!(envelope["meta"]["tool"], "kintone_record");
    assert_eq!(envelope["meta"]["invoked_as"], "create_record");
    assert_eq!(envelope["result"]["id"], "101");
    assert_eq!(
        envelope["result"]["normalized"],
        json!(["category", "title"])
    );

    assert_eq!(
        api.calls(),
        vec![ApiCall::Create {
            app: 7,
            record: json!({
                "category": {"value": "交通費"},
                "title": {"value": "出張"}
            }),
        }]
    );
}

#[tokio::test]
async fn lone_surrogate_in_arguments_is_dropped() {
    let (server, api) = server();
    let raw = r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"kintone_record","arguments":{"action":"update","app_id":"7","record_id":"12","revision":3,"record":{"memo":{"value":"x\udc8by"}}}}}"#;
    let response = server.handle_message(raw).await.expect("response");
    let response = serde_json::to_value(response).expect("json");
    let envelope = tool_envelope(&response["result"]);
    assert_eq!(envelope["result"]["revision"], "4");
    assert_eq!(
        api.calls(),
        vec![ApiCall::Update {
            app: 7,
            id: 12,
            record: json!({"memo": {"value": "xy"}}),
            revision: Some(3),
        }]
    );
}

#[tokio::test]
async fn schema_violations_are_invalid_params() {
    let (server, api) = server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "kintone_record", "arguments": {"action": "get", "app_id": 1, "recrd_id": 2}}
        }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn unknown_tool_is_invalid_params() {
    let (server, _) = server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": {"name": "kintone_recrd", "arguments": {}}
        }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn help_describes_a_tool() {
    let (server, _) = server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": {"name": "help", "arguments": {"tool": "kintone_text"}}
        }),
    )
    .await;
    let envelope = tool_envelope(&response["result"]);
    assert_eq!(envelope["ok"], true);
    assert_eq!(envelope["meta"]["tool"], "help");
    assert!(envelope["result"].is_object());
}

#[tokio::test]
async fn set_level_rejects_unknown_levels() {
    let (server, _) = server();
    let ok = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 10, "method": "logging/setLevel", "params": {"level": "debug"}}),
    )
    .await;
    assert_eq!(ok["result"], json!({}));
    let bad = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 11, "method": "logging/setLevel", "params": {"level": "loud"}}),
    )
    .await;
    assert_eq!(bad["error"]["code"], -32602);
}

#[tokio::test]
async fn serve_answers_each_line() {
    let (server, _) = server();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        "\n\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        "\n"
    );
    let mut output = Vec::new();
    server
        .serve(tokio::io::BufReader::new(input.as_bytes()), &mut output)
        .await
        .expect("serve");
    let lines: Vec<Value> = String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["id"], 2);
}
