// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! This module contains the interfaces through which the services reach the
//! outside world: the host, configuration parsers, SQL servers, file shares and
//! local network addresses. Adapters implement them.

pub mod address;
pub mod host;
pub mod parser;
pub mod share;
pub mod sql;

// Re-export commonly used types
pub use address::AddressSource;
pub use host::HostProbe;
pub use parser::ConfigParser;
pub use share::{ShareConnection, ShareConnector};
pub use sql::{ServerPaths, SqlConnector, SqlSession};
