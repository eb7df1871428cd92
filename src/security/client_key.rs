//! Caller identity derived from the source address.

use std::net::{IpAddr, SocketAddr};

/// Admission key for a peer: its IP without the port, with IPv4-mapped
/// IPv6 addresses collapsed to plain IPv4.
pub fn client_key(addr: &SocketAddr) -> String {
    normalize_ip(addr.ip()).to_string()
}

pub fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}
