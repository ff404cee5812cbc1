// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LAN address discovery for the home server URL.
//!
//! Other devices reach the home server through the first non-loopback IPv4
//! address of this machine. A fully offline host has none; callers treat that
//! as "URL not available yet", not as an error.

use std::net::{IpAddr, Ipv4Addr};

use tracing::debug;

/// One address bound to a network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub ip: IpAddr,
    pub loopback: bool,
}

/// Resolves the address at which this machine is reachable.
pub trait AddressResolver: Send + Sync {
    fn resolve_local_address(&self) -> Option<String>;
}

/// Pick the first IPv4 address that is not internal to the host.
pub fn first_external_ipv4(addresses: &[InterfaceAddress]) -> Option<Ipv4Addr> {
    addresses.iter().find_map(|address| match address.ip {
        IpAddr::V4(ip) if !address.loopback && !ip.is_loopback() && !ip.is_unspecified() => {
            Some(ip)
        }
        _ => None,
    })
}

/// Build `http://{address}:{port}` for the home server.
///
/// The port is always spelled out, including 80.
pub fn home_server_url(address: &str, port: u16) -> Option<String> {
    let ip: Ipv4Addr = address.trim().parse().ok()?;
    Some(format!("http://{ip}:{port}"))
}

/// Resolver backed by the operating system's interface table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAddressResolver;

impl AddressResolver for SystemAddressResolver {
    fn resolve_local_address(&self) -> Option<String> {
        let addresses = interface_addresses();
        let selected = first_external_ipv4(&addresses);
        debug!(
            interfaces = addresses.len(),
            selected = ?selected,
            "Resolved local address"
        );
        selected.map(|ip| ip.to_string())
    }
}

/// Resolver that always answers with a fixed address.
#[derive(Debug, Clone, Default)]
pub struct StaticAddressResolver {
    address: Option<String>,
}

impl StaticAddressResolver {
    pub fn new(address: Option<String>) -> Self {
        Self { address }
    }
}

impl AddressResolver for StaticAddressResolver {
    fn resolve_local_address(&self) -> Option<String> {
        self.address.clone()
    }
}

#[cfg(unix)]
fn interface_addresses() -> Vec<InterfaceAddress> {
    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::InterfaceFlags;

    let interfaces = match getifaddrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            tracing::warn!(error = %e, "Could not enumerate network interfaces");
            return Vec::new();
        }
    };

    interfaces
        .filter_map(|interface| {
            let address = interface.address?;
            let sin = address.as_sockaddr_in()?;
            Some(InterfaceAddress {
                name: interface.interface_name,
                ip: IpAddr::V4(Ipv4Addr::from(sin.ip())),
                loopback: interface.flags.contains(InterfaceFlags::IFF_LOOPBACK),
            })
        })
        .collect()
}

#[cfg(not(unix))]
fn interface_addresses() -> Vec<InterfaceAddress> {
    use std::net::UdpSocket;

    // No packet is sent; connect() only asks the OS which local address routes out.
    let probe = || -> Option<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
        socket.connect("8.8.8.8:80").ok()?;
        Some(socket.local_addr().ok()?.ip())
    };

    probe()
        .map(|ip| {
            vec![InterfaceAddress {
                name: "default-route".to_string(),
                ip,
                loopback: ip.is_loopback(),
            }]
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    fn iface(name: &str, ip: IpAddr, loopback: bool) -> InterfaceAddress {
        InterfaceAddress {
            name: name.to_string(),
            ip,
            loopback,
        }
    }

    #[test]
    fn skips_loopback_and_ipv6() {
        let addresses = vec![
            iface("lo", IpAddr::V4(Ipv4Addr::LOCALHOST), true),
            iface("eth0", IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)), false),
            iface("eth0", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)), false),
            iface("wlan0", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), false),
        ];
        assert_eq!(
            first_external_ipv4(&addresses),
            Some(Ipv4Addr::new(192, 168, 1, 20))
        );
    }

    #[test]
    fn loopback_address_without_flag_is_still_skipped() {
        let addresses = vec![iface("odd", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)), false)];
        assert_eq!(first_external_ipv4(&addresses), None);
    }

    #[test]
    fn offline_host_has_no_address() {
        assert_eq!(first_external_ipv4(&[]), None);
        let only_loopback = vec![iface("lo", IpAddr::V4(Ipv4Addr::LOCALHOST), true)];
        assert_eq!(first_external_ipv4(&only_loopback), None);
    }

    #[test]
    fn builds_home_server_url() {
        assert_eq!(
            home_server_url("192.168.1.20", 3127).as_deref(),
            Some("http://192.168.1.20:3127")
        );
        assert_eq!(home_server_url("not a host", 3127), None);
        assert_eq!(home_server_url("fe80::1", 3127), None);
    }

    #[test]
    fn url_keeps_default_http_port() {
        assert_eq!(
            home_server_url("10.0.0.8", 80).as_deref(),
            Some("http://10.0.0.8:80")
        );
    }

    #[test]
    fn static_resolver_returns_fixed_answer() {
        let resolver = StaticAddressResolver::new(Some("10.1.2.3".into()));
        assert_eq!(resolver.resolve_local_address().as_deref(), Some("10.1.2.3"));
        assert_eq!(StaticAddressResolver::default().resolve_local_address(), None);
    }

    #[test]
    fn system_resolver_never_returns_loopback() {
        if let Some(address) = SystemAddressResolver.resolve_local_address() {
            let ip: Ipv4Addr = address.parse().unwrap();
            assert!(!ip.is_loopback());
        }
    }
}
