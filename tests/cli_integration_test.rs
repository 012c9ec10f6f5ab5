/*!
 * Integration tests for the nodectl binary
 */

mod common;

use common::{kwarg, Reply, StubNode};
use nodectl::codec;
use serde_json::{json, Value};
use std::io::Write;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

fn write_config(nodes: &[(&str, String)]) -> NamedTempFile {
    let nodes: serde_json::Map<String, Value> = nodes
        .iter()
        .map(|(name, host)| (name.to_string(), json!({"host": host, "scheme": "http"})))
        .collect();
    let config = json!({
        "nodes": nodes,
        "clusters": {"eu": ["mx1", "mx2"]},
        "timeout_secs": 2,
    });

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{}", config).unwrap();
    file
}

fn nodectl(config: &NamedTempFile, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nodectl"))
        .arg("--config")
        .arg(config.path())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_nodes_lists_selection() {
    let config = write_config(&[
        ("mx1", "10.0.0.1".to_string()),
        ("mx2", "10.0.0.2".to_string()),
        ("mx10", "10.0.0.10".to_string()),
    ]);

    let output = nodectl(&config, &["nodes", "-f", "json", "-s", "2:3"]);
    assert!(output.status.success());

    let listed: Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|row| row["node"].as_str())
        .collect();
    // Unclustered mx10 sorts before the "eu" cluster
    assert_eq!(names, vec!["mx1", "mx2"]);
}

#[test]
fn test_call_partial_exit_code() {
    let up = StubNode::start(|_, _| Reply::Json(200, json!(true)));
    let down = StubNode::start(|_, _| Reply::Json(500, json!(null)));
    let config = write_config(&[("mx1", up.host()), ("mx2", down.host())]);

    let output = nodectl(&config, &["call", "isPrimary", "-f", "json"]);
    assert_eq!(output.status.code(), Some(99));

    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        rows,
        json!([
            {"cluster": "eu", "node": "mx1", "status": 200, "result": "Yes"},
            {"cluster": "eu", "node": "mx2", "status": 500, "result": "-"}
        ])
    );

    let ignored = nodectl(&config, &["call", "isPrimary", "-i", "--raw", "-f", "json"]);
    assert_eq!(ignored.status.code(), Some(0));
    let rows: Value = serde_json::from_slice(&ignored.stdout).unwrap();
    assert_eq!(rows[0]["result"], json!(true));
    assert_eq!(rows[1]["result"], Value::Null);
}

#[test]
fn test_unknown_node_is_fatal() {
    let config = write_config(&[("mx1", "10.0.0.1".to_string()), ("mx2", "10.0.0.2".to_string())]);

    let output = nodectl(&config, &["nodes", "-n", "nope"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown node: nope"));
}

#[test]
fn test_unknown_cluster_lists_known_clusters() {
    let config = write_config(&[("mx1", "10.0.0.1".to_string()), ("mx2", "10.0.0.2".to_string())]);

    let output = nodectl(&config, &["nodes", "-c", "us"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Known clusters: eu"));
}

#[test]
fn test_missing_config_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_nodectl"))
        .args(["--config", "/nonexistent/nodectl.toml", "nodes"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

/// Stub running one command that prints `chunks`, one per poll, then exits
fn command_node(chunks: &'static [&'static str]) -> StubNode {
    let polls = AtomicUsize::new(0);
    StubNode::start(move |operation, _| match operation {
        "commandRun" => Reply::Json(200, json!("c1")),
        "commandPoll" => match chunks.get(polls.fetch_add(1, Ordering::SeqCst)) {
            Some(chunk) => Reply::Json(200, json!({ "item": [codec::to_base64(Some(*chunk))] })),
            None => Reply::Json(500, json!({"fault": "command exited"})),
        },
        _ => Reply::Json(200, json!(null)),
    })
}

#[test]
fn test_command_streams_output() {
    let stub = command_node(&["hello ", "world\n"]);
    let config = write_config(&[("mx1", stub.host()), ("mx2", "127.0.0.1:1".to_string())]);

    let output = nodectl(&config, &["command", "-n", "mx1", "--", "uptime"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello world\n");

    let runs = stub.requests_to("commandRun");
    assert_eq!(runs.len(), 1);
    assert_eq!(kwarg(&runs[0], "argv"), Some(&json!(["uptime"])));
    assert!(stub.requests_to("commandStop").is_empty());
}

#[test]
fn test_command_collects_rows_across_nodes() {
    let up = command_node(&["up 3 days\n"]);
    let busy = StubNode::start(|operation, _| match operation {
        "commandRun" => Reply::Json(503, json!({"fault": "busy"})),
        _ => Reply::Json(200, json!(null)),
    });
    let config = write_config(&[("mx1", up.host()), ("mx2", busy.host())]);

    let output = nodectl(
        &config,
        &["command", "-f", "json", "--input", "hello", "--signal", "TERM", "--", "uptime"],
    );

    assert_eq!(output.status.code(), Some(99));
    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        rows,
        json!([
            {"cluster": "eu", "node": "mx1", "status": 200, "result": "up 3 days\n"},
            {"cluster": "eu", "node": "mx2", "status": 503, "result": "-"}
        ])
    );

    let pushes = up.requests_to("commandPush");
    assert_eq!(pushes.len(), 1);
    assert_eq!(kwarg(&pushes[0], "commandid"), Some(&json!("c1")));
    assert_eq!(
        kwarg(&pushes[0], "data"),
        Some(&json!(codec::to_base64(Some("hello"))))
    );

    let signals = up.requests_to("commandSignal");
    assert_eq!(signals.len(), 1);
    assert_eq!(kwarg(&signals[0], "signal"), Some(&json!(15)));

    let busy_ops: Vec<String> = busy.requests().into_iter().map(|r| r.operation).collect();
    assert_eq!(busy_ops, vec!["commandRun"]);
}
