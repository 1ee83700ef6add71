//! End-to-end scenario: server down (scenario 4).
//!
//! A stub built against an address nothing is listening on must raise a
//! transport failure rather than hang or panic.

use rmi_core::{MethodSignature, RemoteInterfaceDescriptor, RmiError, StubFactory, TRANSPORT_FAILURE_KIND};
use serde_json::json;
use std::sync::Arc;

fn ping_descriptor() -> Arc<RemoteInterfaceDescriptor> {
    Arc::new(RemoteInterfaceDescriptor::new(
        "example.Ping",
        vec![MethodSignature::new(
            "ping",
            ["i32"],
            "string",
            [TRANSPORT_FAILURE_KIND],
        )],
    ))
}

#[tokio::test]
async fn call_against_a_dead_server_raises_transport() {
    // Bind a listener momentarily just to reserve a concrete, routable
    // address, then drop it so nothing is listening on it anymore.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_address = listener.local_addr().unwrap();
    drop(listener);

    let stub = StubFactory::create_at(Some(ping_descriptor()), Some(dead_address)).unwrap();

    let param_types = vec!["i32".to_string()];
    let err = stub
        .call("ping", &param_types, "string", vec![json!(0)])
        .await
        .unwrap_err();

    assert!(matches!(err, RmiError::Transport(_)));
}
