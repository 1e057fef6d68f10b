// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL server trait definitions.
//!
//! The clone pipeline issues a fixed set of T-SQL statements. It only needs to
//! execute statements, read a backup's file list and learn where the server
//! keeps its data and log files.

use crate::domain::{BackupFileEntry, ConnectionDescriptor, SqlError};

/// Storage folders of a SQL server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPaths {
    /// Default folder for data files
    pub data: String,
    /// Default folder for log files
    pub log: String,
}

/// An open connection to a SQL server.
pub trait SqlSession: Send {
    /// Executes a statement that returns no rows.
    fn execute(&mut self, statement: &str) -> Result<(), SqlError>;

    /// Reads the file manifest of the backup at `backup_path`
    /// (`RESTORE FILELISTONLY`).
    fn backup_file_list(&mut self, backup_path: &str) -> Result<Vec<BackupFileEntry>, SqlError>;

    /// Reads the instance's default data and log folders.
    fn server_paths(&mut self) -> Result<ServerPaths, SqlError>;
}

/// Opens sessions against SQL servers.
pub trait SqlConnector: Send + Sync {
    /// Connects using `descriptor`.
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn SqlSession>, SqlError>;
}
