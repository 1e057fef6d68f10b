// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deployment environment resolution and cross-environment database cloning.
//!
//! A process decides which deployment environment it runs in (production,
//! testing, development, or a development UI against the testing API) from
//! signals about its host. That decision selects the server addresses,
//! credentials and catalog names it uses. The crate can also clone a
//! database from one environment to another: back it up on the source
//! server, copy the backup between network shares, and restore it over the
//! destination database.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: deployment modes, environment entries, connection
//!   naming, clone jobs, T-SQL statements and errors
//! - **Ports**: trait definitions for the outside world (`HostProbe`,
//!   `AddressSource`, `ConfigParser`, `ShareConnector`, `SqlConnector`)
//! - **Adapters**: implementations for the real host, JSON files, mounted
//!   shares, SQL Server, environment variables and the command line
//! - **Service**: the configuration store, resolver, runtime URL registry,
//!   clone pipeline and the [`service::OpenEnv`] context
//!
//! # Feature Flags
//!
//! - `env`: read settings from `OPENENV_*` environment variables (default)
//! - `cli`: the `openenv` command-line tool (default)
//! - `mssql`: SQL Server connector built on `tiberius`
//! - `full`: Enable all features
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use openenv::prelude::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let env = OpenEnv::new(Settings::default());
//! let mode = env.initialise(ConfigPayload::File("environments.json".into()))?;
//! println!("running in {}", mode);
//!
//! let connection = env.obtain_connection_string("OrdersConnection", false)?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::domain::{
        CloneError, ConfigError, DbCloneJob, DeploymentMode, EnvironmentEntry, OpenEnvError,
        Result, Settings,
    };
    pub use crate::ports::{AddressSource, HostProbe, ShareConnector, SqlConnector};
    pub use crate::service::{CancellationFlag, ClonePipeline, ConfigPayload, OpenEnv};

    // Re-export adapters based on feature flags
    #[cfg(feature = "env")]
    pub use crate::adapters::EnvSettingsAdapter;
    pub use crate::adapters::{LocalShareConnector, SystemHostProbe};
    #[cfg(feature = "mssql")]
    pub use crate::adapters::SqlServerConnector;
}
