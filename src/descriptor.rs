//! Remote interface descriptors and the interface validator.
//!
//! A [`RemoteInterfaceDescriptor`] is a plain-data handle to a user-declared
//! interface: its fully qualified name and its declared methods. There is
//! no runtime reflection in Rust to discover this shape automatically, so
//! the descriptor is data the caller builds once (by hand, or from a
//! thin macro outside this crate's scope) and shares between the stub
//! factory and the skeleton constructor — both of which validate it the
//! same way before doing anything else.

use crate::error::{RmiError, TRANSPORT_FAILURE_KIND};
use serde::{Deserialize, Serialize};

/// One method declared on a remote interface.
///
/// `parameter_type_names` is ordered and is matched exactly by the
/// skeleton's dispatch lookup — no widening, no overload resolution
/// beyond name + declared parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub parameter_type_names: Vec<String>,
    pub return_type: String,
    pub failure_type_names: Vec<String>,
}

impl MethodSignature {
    pub fn new(
        name: impl Into<String>,
        parameter_type_names: impl IntoIterator<Item = impl Into<String>>,
        return_type: impl Into<String>,
        failure_type_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            parameter_type_names: parameter_type_names.into_iter().map(Into::into).collect(),
            return_type: return_type.into(),
            failure_type_names: failure_type_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this method declares the runtime's transport failure kind
    /// among its failure types, as every method on a valid interface must.
    pub fn declares_transport_failure(&self) -> bool {
        self.failure_type_names
            .iter()
            .any(|f| f == TRANSPORT_FAILURE_KIND)
    }
}

/// A handle to a user-defined remote interface.
///
/// Two descriptors are equal iff their name and declared methods are equal
/// — descriptor equality never touches the network, which is what makes
/// [`crate::stub::StubIdentity`] equality (descriptor, address) cheap and
/// side-effect-free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteInterfaceDescriptor {
    pub interface_name: String,
    pub methods: Vec<MethodSignature>,
}

impl RemoteInterfaceDescriptor {
    pub fn new(interface_name: impl Into<String>, methods: Vec<MethodSignature>) -> Self {
        Self {
            interface_name: interface_name.into(),
            methods,
        }
    }

    /// Resolves a method by exact `(name, parameter_type_names)` match.
    /// Returns `None` on any mismatch — unknown name, wrong arity, or wrong
    /// parameter types — which the caller turns into a transport failure.
    pub fn resolve(
        &self,
        method_name: &str,
        parameter_type_names: &[String],
    ) -> Option<&MethodSignature> {
        self.methods
            .iter()
            .find(|m| m.name == method_name && m.parameter_type_names == parameter_type_names)
    }
}

/// Validates that a descriptor qualifies as a remote interface.
///
/// Rules, evaluated in order:
/// 1. The descriptor's interface name must be non-empty (stands in for
///    "must represent an interface type, not a concrete type" — there is no
///    runtime type distinction to check on plain data).
/// 2. Every declared method must list [`TRANSPORT_FAILURE_KIND`] among its
///    declared failure types.
///
/// Both the stub factory and the skeleton constructor call this before
/// doing anything else, which is the sole mechanism by which the runtime
/// guarantees the skeleton can always surface transport errors to callers.
pub fn validate(descriptor: &RemoteInterfaceDescriptor) -> Result<(), RmiError> {
    if descriptor.interface_name.trim().is_empty() {
        return Err(RmiError::BadInterface(
            "descriptor does not name an interface".to_string(),
        ));
    }

    for method in &descriptor.methods {
        if !method.declares_transport_failure() {
            return Err(RmiError::BadInterface(format!(
                "method `{}` does not declare the `{}` failure kind",
                method.name, TRANSPORT_FAILURE_KIND
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_descriptor() -> RemoteInterfaceDescriptor {
        RemoteInterfaceDescriptor::new(
            "example.Ping",
            vec![MethodSignature::new(
                "ping",
                ["i32"],
                "string",
                [TRANSPORT_FAILURE_KIND],
            )],
        )
    }

    #[test]
    fn accepts_interface_where_every_method_declares_transport_failure() {
        assert!(validate(&valid_descriptor()).is_ok());
    }

    #[test]
    fn rejects_method_missing_transport_failure() {
        let descriptor = RemoteInterfaceDescriptor::new(
            "example.Bad",
            vec![MethodSignature::new("op", ["i32"], "i32", ["some.other.Failure"])],
        );
        assert!(matches!(
            validate(&descriptor),
            Err(RmiError::BadInterface(_))
        ));
    }

    #[test]
    fn rejects_descriptor_with_no_name() {
        let descriptor = RemoteInterfaceDescriptor::new("", vec![]);
        assert!(matches!(
            validate(&descriptor),
            Err(RmiError::BadInterface(_))
        ));
    }

    #[test]
    fn resolves_by_exact_name_and_parameter_types() {
        let descriptor = valid_descriptor();
        assert!(descriptor
            .resolve("ping", &["i32".to_string()])
            .is_some());
        assert!(descriptor.resolve("ping", &["string".to_string()]).is_none());
        assert!(descriptor.resolve("pong", &["i32".to_string()]).is_none());
    }

    #[test]
    fn descriptor_equality_is_structural() {
        assert_eq!(valid_descriptor(), valid_descriptor());
    }
}
