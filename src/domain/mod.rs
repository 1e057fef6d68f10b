// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core types and rules.
//!
//! This module holds deployment modes, environment entries, connection naming
//! and clone job types. It performs no I/O; everything that touches the host,
//! a SQL server or a file share goes through the ports layer.

pub mod clone_job;
pub mod connection;
pub mod deployment;
pub mod environment;
pub mod errors;
pub mod settings;
pub mod tsql;

// Re-export commonly used types
pub use clone_job::{
    backup_file_name, join_remote_path, share_root, BackupFileEntry, BackupFileKind,
    CloneProgress, CloneReport, CloneStage, DbCloneJob, DbTarget,
};
pub use connection::{
    catalog_name, connection_name_to_db_name, normalize_connection_key, ConnectionDescriptor,
    CONNECTION_TOKEN,
};
pub use deployment::{DeploymentMode, HostSignals, DEVELOPMENT_KEY, PRODUCTION_KEY, TESTING_KEY};
pub use environment::{
    DbConfig, EnvironmentEntry, EnvironmentsDocument, NetworkCredentials, SqlCredentials,
};
pub use errors::{
    AuthorizationError, CloneError, ConfigError, OpenEnvError, ResolutionError, Result,
    ShareError, ShareErrorKind, SqlError, UrlError,
};
pub use settings::{RetryPolicy, Settings};
