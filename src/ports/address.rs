// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local address enumeration trait definition.

use std::io;
use std::net::IpAddr;

/// Lists the addresses assigned to the local host.
///
/// Used to derive a LAN-reachable base URL when none is configured.
pub trait AddressSource: Send + Sync {
    /// All local addresses, in the order the host reports them.
    fn local_addresses(&self) -> io::Result<Vec<IpAddr>>;
}

impl<F> AddressSource for F
where
    F: Fn() -> io::Result<Vec<IpAddr>> + Send + Sync,
{
    fn local_addresses(&self) -> io::Result<Vec<IpAddr>> {
        self()
    }
}
