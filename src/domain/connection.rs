// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection descriptors and the naming conventions that produce them.

use crate::domain::deployment::DeploymentMode;
use crate::domain::environment::DbConfig;
use std::borrow::Cow;
use std::fmt;

/// Token that marks a logical name as a database connection entry.
pub const CONNECTION_TOKEN: &str = "Connection";

/// Upper bound of pooled connections per descriptor.
pub const MAX_POOL_SIZE: u32 = 100;

/// Builds the catalog name of `database_name` in `mode`.
///
/// ```
/// use openenv::domain::{catalog_name, DeploymentMode};
///
/// assert_eq!(catalog_name("Orders", DeploymentMode::Testing), "Orders_Test");
/// assert_eq!(catalog_name("Orders", DeploymentMode::Production), "Orders_Live");
/// ```
pub fn catalog_name(database_name: &str, mode: DeploymentMode) -> String {
    format!("{}{}", database_name, mode.catalog_suffix())
}

/// Removes the [`CONNECTION_TOKEN`] from a logical connection name.
pub fn connection_name_to_db_name(logical_name: &str) -> String {
    logical_name.replace(CONNECTION_TOKEN, "")
}

/// Normalises a raw connection-string key: strips the token and keeps
/// everything before the first `_`.
///
/// ```
/// use openenv::domain::normalize_connection_key;
///
/// assert_eq!(normalize_connection_key("OrdersConnection_Local"), "Orders");
/// ```
pub fn normalize_connection_key(raw_key: &str) -> String {
    let stripped = connection_name_to_db_name(raw_key);
    match stripped.split_once('_') {
        Some((head, _)) => head.to_string(),
        None => stripped,
    }
}

/// A fully qualified SQL Server connection description.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Server address
    pub data_source: String,
    /// Catalog to open
    pub initial_catalog: String,
    /// SQL login
    pub user_id: String,
    /// SQL password
    pub password: String,
    /// Keep security information in the connection after opening
    pub persist_security_info: bool,
    /// Reuse pooled connections
    pub pooling: bool,
    /// Pool capacity
    pub max_pool_size: u32,
    /// Allow several active result sets on one connection
    pub multiple_active_result_sets: bool,
    /// Accept the server certificate without validation
    pub trust_server_certificate: bool,
}

impl ConnectionDescriptor {
    /// Builds the descriptor for `db_config` opening `initial_catalog`.
    ///
    /// Pure; performs no I/O.
    pub fn build(db_config: &DbConfig, initial_catalog: &str) -> Self {
        let sql = &db_config.environment.sql_credentials;
        Self {
            data_source: db_config.data_source.clone(),
            initial_catalog: initial_catalog.to_string(),
            user_id: sql.username.clone(),
            password: sql.password.clone(),
            persist_security_info: true,
            pooling: true,
            max_pool_size: MAX_POOL_SIZE,
            multiple_active_result_sets: true,
            trust_server_certificate: true,
        }
    }

    /// Returns a copy pointed at another catalog on the same server.
    pub fn with_catalog(&self, catalog: &str) -> Self {
        Self {
            initial_catalog: catalog.to_string(),
            ..self.clone()
        }
    }

    /// The connection string with the password masked, for logging.
    pub fn redacted(&self) -> String {
        self.render("***")
    }

    fn render(&self, password: &str) -> String {
        format!(
            "Data Source={};Initial Catalog={};Persist Security Info={};User ID={};Password={};Pooling={};Max Pool Size={};MultipleActiveResultSets={};TrustServerCertificate={}",
            ado_value(&self.data_source),
            ado_value(&self.initial_catalog),
            ado_bool(self.persist_security_info),
            ado_value(&self.user_id),
            ado_value(password),
            ado_bool(self.pooling),
            self.max_pool_size,
            ado_bool(self.multiple_active_result_sets),
            ado_bool(self.trust_server_certificate),
        )
    }
}

/// Quotes a connection-string value that would otherwise break the
/// `key=value;` syntax.
///
/// Values holding a double quote but no single quote are wrapped in single
/// quotes; other values needing quotes are wrapped in double quotes with
/// embedded double quotes doubled.
fn ado_value(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.contains([';', '=', '\'', '"'])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if !needs_quotes {
        return Cow::Borrowed(value);
    }
    if value.contains('"') && !value.contains('\'') {
        Cow::Owned(format!("'{}'", value))
    } else {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    }
}

fn ado_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&self.password))
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionDescriptor({})", self.redacted())
    }
}
