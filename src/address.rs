//! Address helpers.
//!
//! An address may be absent at skeleton construction time and is assigned
//! by `start()` otherwise. This crate represents it directly as
//! `std::net::SocketAddr` — a bound port of `0` is a legal value meaning
//! OS-assigned, exactly as `TcpListener::bind` already treats it.

use crate::error::RmiError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Whether `addr` is a wildcard address (`0.0.0.0` or `::`) that a remote
/// caller could never connect to directly.
pub fn is_wildcard(addr: &SocketAddr) -> bool {
    match addr.ip() {
        IpAddr::V4(v4) => v4 == Ipv4Addr::UNSPECIFIED,
        IpAddr::V6(v6) => v6 == Ipv6Addr::UNSPECIFIED,
    }
}

/// Resolves the skeleton's current bind address to one a stub can actually
/// connect to.
///
/// If `addr` is already concrete (not a wildcard), it is returned
/// unchanged. Otherwise the local host name is resolved and combined with
/// `addr`'s port; failure to resolve a usable local host name is the
/// *unknown-host* case.
pub fn resolve_connectable(addr: SocketAddr) -> Result<SocketAddr, RmiError> {
    if !is_wildcard(&addr) {
        return Ok(addr);
    }

    let host = hostname::get()
        .ok()
        .and_then(|os_str| os_str.into_string().ok())
        .ok_or_else(|| RmiError::UnknownHost("local host name is not resolvable".to_string()))?;

    resolve_host_port(&host, addr.port())
}

/// Resolves `(hostname, port)` to a concrete `SocketAddr`, used both by
/// [`resolve_connectable`] and by `StubFactory::create_with_hostname`.
pub fn resolve_host_port(hostname: &str, port: u16) -> Result<SocketAddr, RmiError> {
    use std::net::ToSocketAddrs;

    (hostname, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut it| it.next())
        .ok_or_else(|| RmiError::UnknownHost(format!("cannot resolve host `{hostname}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_v4_is_detected() {
        let addr: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        assert!(is_wildcard(&addr));
    }

    #[test]
    fn concrete_v4_is_not_wildcard() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert!(!is_wildcard(&addr));
    }

    #[test]
    fn concrete_address_resolves_to_itself() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(resolve_connectable(addr).unwrap(), addr);
    }

    #[test]
    fn localhost_resolves_to_a_concrete_address() {
        let resolved = resolve_host_port("localhost", 9000).unwrap();
        assert_eq!(resolved.port(), 9000);
    }
}
