//! End-to-end scenario: server-side method lookup mismatch.
//!
//! A `Request` naming a method the descriptor never declares (or declaring
//! it with the wrong parameter types) must still produce a well-formed
//! `Response::Failed` carrying the transport failure kind — the server's
//! own dispatch-miss path, reached by sending a raw `Request` over a bare
//! `TcpStream` rather than through `Stub::call`, which always pre-resolves
//! the method locally and never lets an unresolvable call reach the wire.

use async_trait::async_trait;
use rmi_core::{
    skeleton::InvokeOutcome, MethodSignature, RemoteImplementation, RemoteInterfaceDescriptor,
    Response, Skeleton, TRANSPORT_FAILURE_KIND,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpStream;

struct PingService;

#[async_trait]
impl RemoteImplementation for PingService {
    async fn invoke(
        &self,
        _method_name: &str,
        _parameter_type_names: &[String],
        _arguments: Vec<serde_json::Value>,
    ) -> InvokeOutcome {
        unreachable!("the requests in this test never resolve to a declared method")
    }
}

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

async fn send_and_receive(
    address: std::net::SocketAddr,
    request: rmi_core::Request,
) -> Response {
    let mut stream = TcpStream::connect(address).await.unwrap();
    rmi_core::wire::write_framed(&mut stream, &request)
        .await
        .unwrap();
    rmi_core::wire::read_framed(&mut stream).await.unwrap()
}

#[tokio::test]
async fn unknown_method_name_yields_a_transport_failure_response() {
    let skeleton = Skeleton::new(
        Some(ping_descriptor()),
        Some(Arc::new(PingService)),
        Some("127.0.0.1:0".parse().unwrap()),
    )
    .unwrap();
    skeleton.start().await.unwrap();
    let address = skeleton.address().await.unwrap();

    let request = rmi_core::Request {
        method_name: "pong".to_string(),
        parameter_type_names: vec!["i32".to_string()],
        arguments: vec![json!(0)],
        declared_return_type: "string".to_string(),
    };

    let response = send_and_receive(address, request).await;
    match response {
        Response::Failed { failure } => assert_eq!(failure.failure_type, TRANSPORT_FAILURE_KIND),
        other => panic!("expected Response::Failed, got {other:?}"),
    }

    skeleton.stop().await;
}

#[tokio::test]
async fn wrong_parameter_types_yield_a_transport_failure_response() {
    let skeleton = Skeleton::new(
        Some(ping_descriptor()),
        Some(Arc::new(PingService)),
        Some("127.0.0.1:0".parse().unwrap()),
    )
    .unwrap();
    skeleton.start().await.unwrap();
    let address = skeleton.address().await.unwrap();

    let request = rmi_core::Request {
        method_name: "ping".to_string(),
        parameter_type_names: vec!["string".to_string()],
        arguments: vec![json!("not an i32")],
        declared_return_type: "string".to_string(),
    };

    let response = send_and_receive(address, request).await;
    match response {
        Response::Failed { failure } => assert_eq!(failure.failure_type, TRANSPORT_FAILURE_KIND),
        other => panic!("expected Response::Failed, got {other:?}"),
    }

    skeleton.stop().await;
}
