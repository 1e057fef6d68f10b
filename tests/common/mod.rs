// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fake ports shared by the integration tests.
//!
//! Each fake records what it was asked to do so tests can assert on the
//! exact sequence of statements, connections and copies.

#![allow(dead_code)]

use openenv::domain::{
    tsql, BackupFileEntry, BackupFileKind, ConnectionDescriptor, NetworkCredentials, ShareError,
    SqlError,
};
use openenv::ports::{HostProbe, ServerPaths, ShareConnection, ShareConnector, SqlConnector, SqlSession};
use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Environment payload with three environments on distinct servers.
pub const PAYLOAD: &str = r#"{
    "Environments": {
        "Production": {
            "ServerIP": "10.0.0.5",
            "BackupLocation": "\\\\10.0.0.5\\Backups",
            "SqlCredentials": {"Username": "sa", "Password": "live"},
            "NetworkCredentials": {"Username": "svc-live", "Password": "pw", "Domain": "CORP"}
        },
        "Testing": {
            "ServerIP": "10.0.0.6",
            "BackupLocation": "\\\\10.0.0.6\\Backups",
            "SqlCredentials": {"Username": "sa", "Password": "test"},
            "NetworkCredentials": {"Username": "svc-test", "Password": "pw", "Domain": "CORP"}
        },
        "Development": {
            "ServerIP": "10.0.0.7",
            "BackupLocation": "\\\\10.0.0.7\\Backups",
            "SqlCredentials": {"Username": "sa", "Password": "dev"},
            "NetworkCredentials": {"Username": "svc-dev", "Password": "pw", "Domain": "CORP"}
        }
    }
}"#;

/// A host probe with fixed answers.
#[derive(Debug, Clone)]
pub struct FakeProbe {
    pub executable: PathBuf,
    pub app_package: bool,
    pub primary_os: bool,
    pub marker: bool,
    pub debugger: bool,
    pub marker_path: PathBuf,
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("C:\\Program Files\\Orders\\orders.exe"),
            app_package: false,
            primary_os: true,
            marker: false,
            debugger: false,
            marker_path: PathBuf::from("C:\\PRODUCTION.ini"),
        }
    }
}

impl HostProbe for FakeProbe {
    fn executable_path(&self) -> Option<PathBuf> {
        Some(self.executable.clone())
    }

    fn is_app_package_deployed(&self) -> bool {
        self.app_package
    }

    fn is_primary_os(&self) -> bool {
        self.primary_os
    }

    fn production_marker(&self) -> &Path {
        &self.marker_path
    }

    fn production_marker_exists(&self) -> bool {
        self.marker
    }

    fn debugger_attached(&self) -> bool {
        self.debugger
    }
}

/// An address source returning a fixed list.
pub fn addresses(list: &[&str]) -> impl Fn() -> io::Result<Vec<IpAddr>> + Send + Sync {
    let parsed: Vec<IpAddr> = list.iter().map(|a| a.parse().unwrap()).collect();
    move || Ok(parsed.clone())
}

/// A statement executed (or query issued) by a fake SQL session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub server: String,
    pub statement: String,
}

#[derive(Debug, Default)]
struct SqlLog {
    executed: Vec<Executed>,
    connects: Vec<String>,
}

/// SQL connector that records statements and can fail one of them.
#[derive(Debug, Clone)]
pub struct FakeSqlConnector {
    log: Arc<Mutex<SqlLog>>,
    fail_prefix: Option<String>,
    manifest: Vec<BackupFileEntry>,
    paths: ServerPaths,
}

impl FakeSqlConnector {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(SqlLog::default())),
            fail_prefix: None,
            manifest: vec![
                BackupFileEntry::new("Orders", BackupFileKind::Data),
                BackupFileEntry::new("Orders_log", BackupFileKind::Log),
            ],
            paths: ServerPaths {
                data: "E:\\Data\\".to_string(),
                log: "F:\\Log\\".to_string(),
            },
        }
    }

    /// Fails every statement starting with `prefix`.
    pub fn failing_on(mut self, prefix: &str) -> Self {
        self.fail_prefix = Some(prefix.to_string());
        self
    }

    pub fn with_manifest(mut self, manifest: Vec<BackupFileEntry>) -> Self {
        self.manifest = manifest;
        self
    }

    /// Everything executed, in order.
    pub fn executed(&self) -> Vec<Executed> {
        self.log.lock().unwrap().executed.clone()
    }

    /// Statements executed against `server`, in order.
    pub fn statements_on(&self, server: &str) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|e| e.server == server)
            .map(|e| e.statement)
            .collect()
    }

    /// Catalogs of every connection opened, in order.
    pub fn connects(&self) -> Vec<String> {
        self.log.lock().unwrap().connects.clone()
    }
}

impl SqlConnector for FakeSqlConnector {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn SqlSession>, SqlError> {
        self.log
            .lock()
            .unwrap()
            .connects
            .push(format!("{}/{}", descriptor.data_source, descriptor.initial_catalog));
        Ok(Box::new(FakeSqlSession {
            server: descriptor.data_source.clone(),
            connector: self.clone(),
        }))
    }
}

struct FakeSqlSession {
    server: String,
    connector: FakeSqlConnector,
}

impl FakeSqlSession {
    fn record(&self, statement: &str) -> Result<(), SqlError> {
        let mut log = self.connector.log.lock().unwrap();
        log.executed.push(Executed {
            server: self.server.clone(),
            statement: statement.to_string(),
        });
        match &self.connector.fail_prefix {
            Some(prefix) if statement.starts_with(prefix.as_str()) => {
                Err(SqlError::new(self.server.as_str(), "simulated failure"))
            }
            _ => Ok(()),
        }
    }
}

impl SqlSession for FakeSqlSession {
    fn execute(&mut self, statement: &str) -> Result<(), SqlError> {
        self.record(statement)
    }

    fn backup_file_list(&mut self, backup_path: &str) -> Result<Vec<BackupFileEntry>, SqlError> {
        self.record(&tsql::file_list_only(backup_path))?;
        Ok(self.connector.manifest.clone())
    }

    fn server_paths(&mut self) -> Result<ServerPaths, SqlError> {
        self.record(tsql::SERVER_PATHS_QUERY)?;
        Ok(self.connector.paths.clone())
    }
}

#[derive(Debug, Default)]
struct ShareLog {
    connects: HashMap<String, usize>,
    disconnects: HashMap<String, usize>,
    users: Vec<(String, String)>,
    copies: Vec<(String, String)>,
}

/// Share connector whose copies fail a configurable number of times.
#[derive(Debug, Clone)]
pub struct FakeShareConnector {
    log: Arc<Mutex<ShareLog>>,
    transient_failures: Arc<AtomicU32>,
    fatal: bool,
}

impl FakeShareConnector {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(ShareLog::default())),
            transient_failures: Arc::new(AtomicU32::new(0)),
            fatal: false,
        }
    }

    /// The first `count` copies fail with a transient error.
    pub fn failing_transiently(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Every copy fails with a fatal error.
    pub fn failing_fatally(mut self) -> Self {
        self.fatal = true;
        self
    }

    pub fn connects_to(&self, share: &str) -> usize {
        *self.log.lock().unwrap().connects.get(share).unwrap_or(&0)
    }

    pub fn disconnects_from(&self, share: &str) -> usize {
        *self.log.lock().unwrap().disconnects.get(share).unwrap_or(&0)
    }

    /// `(share, qualified user)` of every connection, in order.
    pub fn users(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().users.clone()
    }

    /// Every attempted copy, in order.
    pub fn copies(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().copies.clone()
    }

    /// Connections not yet released.
    pub fn open_connections(&self) -> usize {
        let log = self.log.lock().unwrap();
        let opened: usize = log.connects.values().sum();
        let closed: usize = log.disconnects.values().sum();
        opened - closed
    }
}

impl ShareConnector for FakeShareConnector {
    fn connect(
        &self,
        share: &str,
        credential: &NetworkCredentials,
    ) -> Result<ShareConnection, ShareError> {
        let mut log = self.log.lock().unwrap();
        *log.connects.entry(share.to_string()).or_insert(0) += 1;
        log.users
            .push((share.to_string(), credential.qualified_username()));
        Ok(ShareConnection {
            share: share.to_string(),
            username: credential.qualified_username(),
        })
    }

    fn disconnect(&self, connection: &ShareConnection) -> Result<(), ShareError> {
        let mut log = self.log.lock().unwrap();
        *log.disconnects.entry(connection.share.clone()).or_insert(0) += 1;
        Ok(())
    }

    fn copy_file(&self, from: &str, to: &str) -> Result<u64, ShareError> {
        self.log
            .lock()
            .unwrap()
            .copies
            .push((from.to_string(), to.to_string()));
        if self.fatal {
            return Err(ShareError::fatal(to, "access is denied"));
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ShareError::transient(to, "the network name is no longer available"));
        }
        Ok(4096)
    }
}
