//! # RMI Runtime
//!
//! A minimal remote method invocation runtime: a library that lets one
//! process call methods on an object hosted in another process over TCP,
//! hiding the network behind a proxy object that looks like a local
//! instance of a user-declared interface.
//!
//! The two public surfaces are [`stub::StubFactory::create`] (and its two
//! sibling constructors) on the caller's side, and [`skeleton::Skeleton`]
//! on the hosting side. Everything else — the wire envelope, the interface
//! validator, the concurrency discipline of the listener/service tasks —
//! exists to make those two surfaces correct.
//!
//! Out of scope, by design: distributed object garbage collection, passing
//! remote object references as arguments, method overloading beyond
//! name + declared parameter types, authentication/encryption, wire schema
//! versioning, flow control beyond TCP's own, and result caching.

pub mod address;
pub mod descriptor;
pub mod error;
pub mod skeleton;
pub mod stub;
pub mod wire;

pub use descriptor::{validate, MethodSignature, RemoteInterfaceDescriptor};
pub use error::{FailureValue, RmiError, TRANSPORT_FAILURE_KIND};
pub use skeleton::{
    InvokeOutcome, NoopHooks, RemoteImplementation, Skeleton, SkeletonHooks, SkeletonState,
};
pub use stub::{CallOutcome, Stub, StubFactory};
pub use wire::{Envelope, Request, Response};

/// The current version of the runtime.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Implementation-defined defaults left open by the wire protocol itself.
pub mod defaults {
    /// Default bind host when a skeleton is constructed without an address.
    pub const BIND_HOST: &str = crate::skeleton::DEFAULT_HOST;

    /// Default bind port (`0` asks the OS to assign one).
    pub const BIND_PORT: u16 = crate::skeleton::DEFAULT_PORT;

    /// Largest wire envelope this runtime will read or write.
    pub const MAX_ENVELOPE_SIZE: usize = crate::wire::MAX_ENVELOPE_SIZE;
}
