// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local address discovery through the host name and the routing table.

use crate::ports::AddressSource;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use sysinfo::System;

/// Address source for the real host.
///
/// Resolves the machine's host name, then adds the address the OS would use
/// for outbound traffic (found by connecting an unbound UDP socket, which
/// sends nothing).
#[derive(Debug, Clone)]
pub struct HostAddressSource {
    probe_target: SocketAddr,
}

impl HostAddressSource {
    /// Creates a source that probes routes towards a public address.
    pub fn new() -> Self {
        Self {
            probe_target: SocketAddr::from((Ipv4Addr::new(192, 0, 2, 1), 9)),
        }
    }

    fn outbound_address(&self) -> io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(self.probe_target)?;
        Ok(socket.local_addr()?.ip())
    }
}

/// The machine's host name, if it can be determined.
pub fn host_name() -> Option<String> {
    System::host_name()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

impl Default for HostAddressSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSource for HostAddressSource {
    fn local_addresses(&self) -> io::Result<Vec<IpAddr>> {
        let mut addresses = Vec::new();

        if let Some(name) = host_name() {
            match (name.as_str(), 0).to_socket_addrs() {
                Ok(resolved) => addresses.extend(resolved.map(|addr| addr.ip())),
                Err(e) => tracing::debug!("Could not resolve host name {}: {}", name, e),
            }
        }

        match self.outbound_address() {
            Ok(ip) if !ip.is_unspecified() => addresses.push(ip),
            Ok(_) => {}
            Err(e) => tracing::debug!("Could not determine outbound address: {}", e),
        }

        let mut unique = Vec::with_capacity(addresses.len());
        for ip in addresses {
            if !unique.contains(&ip) {
                unique.push(ip);
            }
        }
        Ok(unique)
    }
}
