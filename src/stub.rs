//! The stub / dynamic proxy and its factory.
//!
//! Rust has no runtime reflection to generate a proxy object that
//! implements an arbitrary user interface, so a typed stub is generated by
//! the caller instead (by hand, or by a thin macro outside this crate) as a
//! thin wrapper around [`Stub::call`], which does the actual marshaling,
//! connect, and wire exchange. Every method call opens exactly one TCP
//! connection; there is no pooling and no shared mutable state, so a
//! [`Stub`] is safe to call concurrently from many tasks.

use crate::address;
use crate::descriptor::{self, RemoteInterfaceDescriptor};
use crate::error::{RmiError, TRANSPORT_FAILURE_KIND};
use crate::skeleton::Skeleton;
use crate::wire::{read_framed, write_framed, Request, Response};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::debug;

/// The (descriptor, address) pair a stub's identity methods are computed
/// from, without touching the network.
#[derive(Clone)]
struct StubIdentity {
    descriptor: Arc<RemoteInterfaceDescriptor>,
    address: SocketAddr,
}

impl PartialEq for StubIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor && self.address == other.address
    }
}

impl Eq for StubIdentity {}

impl Hash for StubIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor.hash(state);
        self.address.hash(state);
    }
}

impl fmt::Display for StubIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.descriptor.interface_name, self.address)
    }
}

/// What a successful call returns, before the caller's typed wrapper method
/// decodes the payload into a concrete return type.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    Success(serde_json::Value),
    Void,
}

/// A dynamic proxy for a remote interface.
///
/// Carries no mutable state past construction and is safe for concurrent
/// use from many caller tasks: every call opens its own connection.
/// Equality, hashing, and string form are all derived from `(descriptor,
/// address)` and never touch the network.
#[derive(Clone)]
pub struct Stub {
    identity: StubIdentity,
}

impl PartialEq for Stub {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Stub {}

impl Hash for Stub {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.identity.fmt(f)
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub").field("identity", &self.identity.to_string()).finish()
    }
}

impl Stub {
    fn new(descriptor: Arc<RemoteInterfaceDescriptor>, address: SocketAddr) -> Self {
        Self {
            identity: StubIdentity { descriptor, address },
        }
    }

    pub fn descriptor(&self) -> &Arc<RemoteInterfaceDescriptor> {
        &self.identity.descriptor
    }

    pub fn address(&self) -> SocketAddr {
        self.identity.address
    }

    /// Invokes a remote method.
    ///
    /// Opens a new connection, writes the request, reads the response, and
    /// closes the connection on every exit path. `parameter_type_names`
    /// must match one of the descriptor's declared methods exactly, the
    /// same lookup the skeleton performs server-side — a mismatch is
    /// rejected locally as a transport failure before any bytes leave the
    /// process.
    pub async fn call(
        &self,
        method_name: &str,
        parameter_type_names: &[String],
        declared_return_type: &str,
        arguments: Vec<serde_json::Value>,
    ) -> Result<CallOutcome, RmiError> {
        let method = self
            .identity
            .descriptor
            .resolve(method_name, parameter_type_names)
            .ok_or_else(|| {
                RmiError::Transport(format!(
                    "`{}` declares no method `{method_name}({parameter_type_names:?})`",
                    self.identity.descriptor.interface_name
                ))
            })?
            .clone();

        let request = Request {
            method_name: method_name.to_string(),
            parameter_type_names: parameter_type_names.to_vec(),
            arguments,
            declared_return_type: declared_return_type.to_string(),
        };

        let response = self.exchange(&request).await?;

        match response {
            Response::Success { payload } => Ok(CallOutcome::Success(payload)),
            Response::Void => Ok(CallOutcome::Void),
            Response::Failed { failure } => {
                if method.failure_type_names.iter().any(|f| f == &failure.failure_type) {
                    Err(RmiError::User(failure))
                } else {
                    Err(RmiError::Transport(format!(
                        "undeclared failure `{}`: {}",
                        failure.failure_type, failure.payload
                    )))
                }
            }
        }
    }

    /// Opens one TCP connection, writes the request, reads the response,
    /// and closes the connection, regardless of outcome.
    async fn exchange(&self, request: &Request) -> Result<Response, RmiError> {
        let mut stream = TcpStream::connect(self.identity.address)
            .await
            .map_err(|e| RmiError::Transport(format!("connect failed: {e}")))?;
        let _ = stream.set_nodelay(true);

        debug!(method = %request.method_name, address = %self.identity.address, "calling remote method");

        write_framed(&mut stream, request)
            .await
            .map_err(|e| RmiError::Transport(format!("failed to send request: {e}")))?;

        let response: Response = read_framed(&mut stream)
            .await
            .map_err(|e| RmiError::Transport(format!("failed to read response: {e}")))?;

        // `stream` is dropped here, closing the socket on every path above
        // as well as this one.
        Ok(response)
    }
}

/// Builds stubs from a validated descriptor and an address, one variant per
/// way a caller can supply that address.
pub struct StubFactory;

impl StubFactory {
    /// Uses the skeleton's current bound address.
    ///
    /// Fails with *illegal-state* if the skeleton has no address yet, and
    /// with *unknown-host* if that address is a wildcard with no
    /// resolvable local host name.
    pub async fn create<I: 'static>(
        descriptor: Option<Arc<RemoteInterfaceDescriptor>>,
        skeleton: &Skeleton<I>,
    ) -> Result<Stub, RmiError> {
        let descriptor = descriptor.ok_or(RmiError::NullArgument("descriptor"))?;
        descriptor::validate(&descriptor)?;

        let bound = skeleton.address().await.ok_or_else(|| {
            RmiError::IllegalState("skeleton has no bound address yet".to_string())
        })?;
        let connectable = address::resolve_connectable(bound)?;

        Ok(Stub::new(descriptor, connectable))
    }

    /// Uses the skeleton's current port but a caller-supplied hostname.
    ///
    /// Fails with *illegal-state* if the skeleton has no assigned port, or
    /// if the assigned port is outside `1..=65535`.
    pub async fn create_with_hostname<I: 'static>(
        descriptor: Option<Arc<RemoteInterfaceDescriptor>>,
        skeleton: &Skeleton<I>,
        hostname_override: Option<&str>,
    ) -> Result<Stub, RmiError> {
        let descriptor = descriptor.ok_or(RmiError::NullArgument("descriptor"))?;
        descriptor::validate(&descriptor)?;
        let hostname = hostname_override.ok_or(RmiError::NullArgument("hostname_override"))?;

        let port = skeleton
            .port()
            .await
            .ok_or_else(|| RmiError::IllegalState("skeleton has no assigned port yet".to_string()))?;
        if port == 0 || port > 65535 {
            return Err(RmiError::IllegalState(format!(
                "port {port} is outside the valid range 1..=65535"
            )));
        }

        let resolved = address::resolve_host_port(hostname, port)?;
        Ok(Stub::new(descriptor, resolved))
    }

    /// Uses a caller-supplied address directly — the bootstrap case where
    /// there is no local skeleton to ask.
    pub fn create_at(
        descriptor: Option<Arc<RemoteInterfaceDescriptor>>,
        address: Option<SocketAddr>,
    ) -> Result<Stub, RmiError> {
        let descriptor = descriptor.ok_or(RmiError::NullArgument("descriptor"))?;
        let address = address.ok_or(RmiError::NullArgument("address"))?;
        descriptor::validate(&descriptor)?;

        Ok(Stub::new(descriptor, address))
    }
}

/// Reported as the failure type of a stub-side transport failure that was
/// never sent over the wire (e.g. a method the descriptor does not
/// declare), kept alongside [`TRANSPORT_FAILURE_KIND`] for callers that
/// want to compare against it directly.
pub const LOCAL_TRANSPORT_FAILURE_KIND: &str = TRANSPORT_FAILURE_KIND;
