// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL Server adapter built on `tiberius`.
//!
//! The clone pipeline is synchronous, so this adapter owns a Tokio runtime and
//! blocks on each call.

use crate::domain::{tsql, BackupFileEntry, BackupFileKind, ConnectionDescriptor, SqlError};
use crate::ports::{ServerPaths, SqlConnector, SqlSession};
use futures_util::TryStreamExt;
use std::sync::Arc;
use tiberius::{AuthMethod, Client, Config, QueryItem, Row};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Default SQL Server port.
const DEFAULT_PORT: u16 = 1433;

type MsClient = Client<Compat<TcpStream>>;

/// Connector that opens `tiberius` sessions.
///
/// # Examples
///
/// ```rust,no_run
/// use openenv::adapters::SqlServerConnector;
///
/// let connector = SqlServerConnector::new().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SqlServerConnector {
    runtime: Arc<Runtime>,
}

impl SqlServerConnector {
    /// Creates a connector with its own runtime.
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    fn config(descriptor: &ConnectionDescriptor) -> Config {
        let (host, port) = split_data_source(&descriptor.data_source);
        let mut config = Config::new();
        config.host(host);
        config.port(port);
        config.database(&descriptor.initial_catalog);
        config.authentication(AuthMethod::sql_server(
            &descriptor.user_id,
            &descriptor.password,
        ));
        if descriptor.trust_server_certificate {
            config.trust_cert();
        }
        config
    }
}

/// Splits `host,port` data sources; other forms use the default port.
fn split_data_source(data_source: &str) -> (&str, u16) {
    match data_source.rsplit_once(',') {
        Some((host, port)) => match port.trim().parse() {
            Ok(port) => (host.trim(), port),
            Err(_) => (data_source, DEFAULT_PORT),
        },
        None => (data_source, DEFAULT_PORT),
    }
}

impl SqlConnector for SqlServerConnector {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn SqlSession>, SqlError> {
        let server = descriptor.data_source.clone();
        let config = Self::config(descriptor);
        let client = self.runtime.block_on(async {
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| sql_error(&server, "connect failed", e))?;
            tcp.set_nodelay(true)
                .map_err(|e| sql_error(&server, "nodelay failed", e))?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| sql_error(&server, "handshake failed", e))
        })?;

        tracing::debug!(
            "Connected to {} ({})",
            descriptor.data_source,
            descriptor.initial_catalog
        );

        Ok(Box::new(SqlServerSession {
            runtime: Arc::clone(&self.runtime),
            client,
            server,
        }))
    }
}

/// An open `tiberius` session.
pub struct SqlServerSession {
    runtime: Arc<Runtime>,
    client: MsClient,
    server: String,
}

impl SqlServerSession {
    fn query_rows(&mut self, query: &str) -> Result<Vec<Row>, SqlError> {
        let server = &self.server;
        let client = &mut self.client;
        self.runtime.block_on(async {
            let mut stream = client
                .simple_query(query)
                .await
                .map_err(|e| sql_error(server, "query failed", e))?;
            let mut rows = Vec::new();
            while let Some(item) = stream
                .try_next()
                .await
                .map_err(|e| sql_error(server, "query failed", e))?
            {
                if let QueryItem::Row(row) = item {
                    rows.push(row);
                }
            }
            Ok(rows)
        })
    }
}

impl SqlSession for SqlServerSession {
    fn execute(&mut self, statement: &str) -> Result<(), SqlError> {
        let server = &self.server;
        let client = &mut self.client;
        self.runtime.block_on(async {
            let mut stream = client
                .simple_query(statement)
                .await
                .map_err(|e| sql_error(server, "statement failed", e))?;
            while stream
                .try_next()
                .await
                .map_err(|e| sql_error(server, "statement failed", e))?
                .is_some()
            {}
            Ok(())
        })
    }

    fn backup_file_list(&mut self, backup_path: &str) -> Result<Vec<BackupFileEntry>, SqlError> {
        let rows = self.query_rows(&tsql::file_list_only(backup_path))?;
        rows.iter()
            .map(|row| {
                let logical_name = row
                    .get::<&str, _>("LogicalName")
                    .ok_or_else(|| SqlError::new(&self.server, "file list row without LogicalName"))?;
                let kind = row
                    .get::<&str, _>("Type")
                    .map(BackupFileKind::from_type_code)
                    .unwrap_or(BackupFileKind::Other);
                Ok(BackupFileEntry::new(logical_name, kind))
            })
            .collect()
    }

    fn server_paths(&mut self) -> Result<ServerPaths, SqlError> {
        let rows = self.query_rows(tsql::SERVER_PATHS_QUERY)?;
        let row = rows
            .first()
            .ok_or_else(|| SqlError::new(&self.server, "server paths query returned no rows"))?;
        let data = row
            .get::<&str, _>("DataPath")
            .ok_or_else(|| SqlError::new(&self.server, "server reports no default data path"))?;
        let log = row.get::<&str, _>("LogPath").unwrap_or(data);
        Ok(ServerPaths {
            data: data.to_string(),
            log: log.to_string(),
        })
    }
}

fn sql_error(
    server: &str,
    message: &str,
    err: impl std::error::Error + Send + Sync + 'static,
) -> SqlError {
    SqlError {
        server: server.to_string(),
        message: format!("{}: {}", message, err),
        source: Some(Box::new(err)),
    }
}
