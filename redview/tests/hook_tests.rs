//! Debug command tracing through the factory

mod common;

use common::{FakeRedis, HOST};
use redview::{
    create_client, execute_command_line, output_channel, scan_keys_with_limit,
    DeploymentDescriptor, RespValue, ScanLimit, Severity, Topology,
};

#[tokio::test]
async fn test_one_warning_per_scan_step() {
    let server = FakeRedis::start().await;
    server.fill("k", 25).page_size(10);

    let (sink, mut rx) = output_channel();
    let descriptor = DeploymentDescriptor::new(HOST, server.port()).with_debug(true);
    let client = create_client(&descriptor, sink);

    let keys = scan_keys_with_limit(client.as_ref(), "k*", ScanLimit::Unbounded)
        .await
        .unwrap();
    assert_eq!(keys.len(), 25);

    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        assert_eq!(message.severity, Severity::Warning);
        messages.push(message.message);
    }
    assert_eq!(
        messages,
        vec![
            "redis: <SCAN 0 MATCH k* COUNT 100>",
            "redis: <SCAN 10 MATCH k* COUNT 100>",
            "redis: <SCAN 20 MATCH k* COUNT 100>",
        ]
    );
}

#[tokio::test]
async fn test_traced_results_are_unchanged() {
    let server = FakeRedis::start().await;
    server.set_string("greeting", "hello");

    let (sink, mut rx) = output_channel();
    let plain = create_client(&DeploymentDescriptor::new(HOST, server.port()), sink.clone());
    let traced = create_client(
        &DeploymentDescriptor::new(HOST, server.port()).with_debug(true),
        sink,
    );

    assert_eq!(
        plain.get("greeting").await.unwrap(),
        traced.get("greeting").await.unwrap()
    );

    let plain_missing = plain.get("absent").await.unwrap();
    let traced_missing = traced.get("absent").await.unwrap();
    assert_eq!(plain_missing, traced_missing);

    let reply = execute_command_line(traced.as_ref(), "FOO bar").await;
    assert!(reply.is_err());

    // Only the traced client reports, one line per command, failures included
    let lines: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|m| m.message)
        .collect();
    assert_eq!(
        lines,
        vec![
            "redis: <GET greeting>",
            "redis: <GET absent>",
            "redis: <FOO bar>",
        ]
    );
}

#[tokio::test]
async fn test_generic_command_is_traced() {
    let server = FakeRedis::start().await;

    let (sink, mut rx) = output_channel();
    let client = create_client(
        &DeploymentDescriptor::new(HOST, server.port()).with_debug(true),
        sink,
    );

    let reply = execute_command_line(client.as_ref(), "SET color blue").await.unwrap();
    assert_eq!(reply, RespValue::SimpleString("OK".to_string()));
    assert_eq!(rx.try_recv().unwrap().message, "redis: <SET color blue>");
}

#[tokio::test]
async fn test_cluster_debug_flag_is_ignored() {
    let server = FakeRedis::start_cluster().await;
    server.fill("k", 5);

    let (sink, mut rx) = output_channel();
    let descriptor = DeploymentDescriptor::new(HOST, server.port())
        .with_topology(Topology::Cluster)
        .with_debug(true);
    let client = create_client(&descriptor, sink);

    let keys = scan_keys_with_limit(client.as_ref(), "*", ScanLimit::Unbounded)
        .await
        .unwrap();
    assert_eq!(keys.len(), 5);
    assert!(rx.try_recv().is_err());
}
