//! Error kinds surfaced across the stub/skeleton boundary.
//!
//! The runtime needs named, matchable failure kinds rather than an opaque
//! `anyhow::Error`: callers branch on *which* kind of failure a call raised
//! (declared user failure vs. transport failure). Internal plumbing still
//! uses `anyhow::Result`, then folds the final failure into one of these
//! variants at the module boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A serialized representation of a failure raised by a user implementation
/// method.
///
/// Transmitted verbatim from skeleton to stub so the caller can re-raise it
/// with fidelity. `failure_type` is the failure's declared type
/// identifier (a stable fully-qualified name chosen by the caller/
/// implementation); `payload` carries whatever serializable content the
/// failure wants to carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureValue {
    pub failure_type: String,
    pub payload: serde_json::Value,
}

impl FailureValue {
    pub fn new(failure_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            failure_type: failure_type.into(),
            payload,
        }
    }
}

impl fmt::Display for FailureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.failure_type, self.payload)
    }
}

/// The stable type identifier every remote interface method must declare
/// among its failure types.
pub const TRANSPORT_FAILURE_KIND: &str = "rmi.transport";

/// The runtime's public error type.
///
/// `User` carries the failure value raised by the implementation method
/// verbatim, already decided (by the stub) to be within the method's
/// declared failure set — undeclared user failures are wrapped in
/// `Transport` instead.
#[derive(Debug, thiserror::Error)]
pub enum RmiError {
    /// A required argument was absent. Raised synchronously at the API
    /// boundary.
    #[error("required argument was null: {0}")]
    NullArgument(&'static str),

    /// The descriptor is not a valid remote interface: it is not an
    /// interface shape, or one of its methods fails to declare
    /// [`TRANSPORT_FAILURE_KIND`].
    #[error("not a valid remote interface: {0}")]
    BadInterface(String),

    /// A stub factory overload could not be satisfied because the skeleton
    /// has no usable address/port yet, or the skeleton is in the wrong
    /// state for the requested operation.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A wildcard bind address could not be resolved to a connectable local
    /// host name.
    #[error("unknown host: {0}")]
    UnknownHost(String),

    /// Catch-all for wire failures: serialization errors, connection
    /// failures, read/write failures, protocol violations, and
    /// undeclared user failures wrapped for transport.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The failure the implementation method itself raised, re-raised
    /// verbatim because its declared type is in the method's failure set.
    #[error("user method failed: {0}")]
    User(FailureValue),
}

impl RmiError {
    /// Wraps an arbitrary `anyhow` failure as a transport failure. Mirrors
    /// the fold performed at the socket read/write boundary.
    pub fn transport(err: impl fmt::Display) -> Self {
        RmiError::Transport(err.to_string())
    }
}
