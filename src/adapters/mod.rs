// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing port implementations.
//!
//! This module contains concrete implementations of the traits defined in the
//! ports layer: the JSON configuration parser, the host probe, local address
//! discovery, a filesystem share connector and, behind the `mssql` feature, a
//! SQL Server connector. Process settings come from environment variables
//! (`env` feature) and the command line (`cli` feature).

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "env")]
pub mod env_var;
pub mod host_address;
pub mod json_file;
pub mod local_share;
#[cfg(feature = "mssql")]
pub mod mssql;
pub mod system_host;

// Re-export adapters based on feature flags
#[cfg(feature = "cli")]
pub use cli::Cli;
#[cfg(feature = "env")]
pub use env_var::EnvSettingsAdapter;
pub use host_address::HostAddressSource;
pub use json_file::{JsonFileSource, JsonParser};
pub use local_share::LocalShareConnector;
#[cfg(feature = "mssql")]
pub use mssql::{SqlServerConnector, SqlServerSession};
pub use system_host::SystemHostProbe;
