// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment entries as they appear in the configuration payload.
//!
//! The payload is a JSON object with a top-level `Environments` map from
//! environment key to an entry:
//!
//! ```json
//! {
//!   "Environments": {
//!     "Production": {
//!       "ServerIP": "10.0.0.5",
//!       "BackupLocation": "\\\\10.0.0.5\\Backups",
//!       "SqlCredentials": { "Username": "sa", "Password": "secret" },
//!       "NetworkCredentials": { "Username": "svc", "Password": "secret", "Domain": "CORP" }
//!     }
//!   }
//! }
//! ```

use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// SQL login used against an environment's server.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SqlCredentials {
    /// Login name
    pub username: String,
    /// Login password
    pub password: String,
}

impl fmt::Debug for SqlCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Windows network credential used to reach an environment's file shares.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkCredentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
    /// Account domain
    #[serde(default)]
    pub domain: String,
}

impl NetworkCredentials {
    /// The account as `DOMAIN\user`, or the bare user name without a domain.
    pub fn qualified_username(&self) -> String {
        if self.domain.is_empty() {
            self.username.clone()
        } else {
            format!("{}\\{}", self.domain, self.username)
        }
    }
}

impl fmt::Debug for NetworkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("domain", &self.domain)
            .finish()
    }
}

/// Per-environment bundle of server address, credentials and backup location.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentEntry {
    /// Address of the environment's SQL server, as an IP literal
    #[serde(rename = "ServerIP")]
    pub server_ip: String,
    /// SQL login
    pub sql_credentials: SqlCredentials,
    /// Network share credential
    pub network_credentials: NetworkCredentials,
    /// Folder (usually a UNC share) where backups are written
    #[serde(default)]
    pub backup_location: String,
}

impl EnvironmentEntry {
    /// Parses the server address.
    ///
    /// `key` is only used for the error message.
    pub fn server_addr(&self, key: &str) -> Result<IpAddr, ConfigError> {
        self.server_ip
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidServerIp {
                key: key.to_string(),
                value: self.server_ip.clone(),
                source,
            })
    }
}

/// The full configuration payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentsDocument {
    /// Entries keyed by environment key
    pub environments: BTreeMap<String, EnvironmentEntry>,
}

/// A database together with the environment it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Database (catalog) name
    pub db_name: String,
    /// Server address
    pub data_source: String,
    /// Folder where this server writes backups
    pub backup_folder: String,
    /// The environment entry
    pub environment: EnvironmentEntry,
}

impl DbConfig {
    /// Builds the configuration of `db_name` hosted in `environment`.
    pub fn new(db_name: impl Into<String>, environment: EnvironmentEntry) -> Self {
        Self {
            db_name: db_name.into(),
            data_source: environment.server_ip.clone(),
            backup_folder: environment.backup_location.clone(),
            environment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "Environments": {
            "Testing": {
                "ServerIP": "10.0.0.6",
                "BackupLocation": "\\\\10.0.0.6\\Backups",
                "SqlCredentials": { "Username": "sa", "Password": "pw" },
                "NetworkCredentials": { "Username": "svc", "Password": "pw2", "Domain": "CORP" }
            }
        }
    }"#;

    #[test]
    fn test_deserialize_payload() {
        let doc: EnvironmentsDocument = serde_json::from_str(PAYLOAD).unwrap();
        let entry = &doc.environments["Testing"];
        assert_eq!(entry.server_ip, "10.0.0.6");
        assert_eq!(entry.backup_location, "\\\\10.0.0.6\\Backups");
        assert_eq!(entry.sql_credentials.username, "sa");
        assert_eq!(entry.network_credentials.domain, "CORP");
    }

    #[test]
    fn test_debug_hides_passwords() {
        let doc: EnvironmentsDocument = serde_json::from_str(PAYLOAD).unwrap();
        let text = format!("{:?}", doc);
        assert!(!text.contains("pw"));
        assert!(text.contains("***"));
    }

    #[test]
    fn test_server_addr() {
        let mut entry = EnvironmentEntry {
            server_ip: "10.0.0.6".to_string(),
            ..EnvironmentEntry::default()
        };
        assert_eq!(entry.server_addr("Testing").unwrap().to_string(), "10.0.0.6");

        entry.server_ip = "db.internal".to_string();
        let err = entry.server_addr("Testing").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServerIp { .. }));
    }

    #[test]
    fn test_qualified_username() {
        let mut creds = NetworkCredentials {
            username: "svc".to_string(),
            password: String::new(),
            domain: "CORP".to_string(),
        };
        assert_eq!(creds.qualified_username(), "CORP\\svc");
        creds.domain.clear();
        assert_eq!(creds.qualified_username(), "svc");
    }

    #[test]
    fn test_db_config_new() {
        let entry = EnvironmentEntry {
            server_ip: "10.0.0.6".to_string(),
            backup_location: "D:\\Backups".to_string(),
            ..EnvironmentEntry::default()
        };
        let config = DbConfig::new("Orders_Test", entry);
        assert_eq!(config.data_source, "10.0.0.6");
        assert_eq!(config.backup_folder, "D:\\Backups");
    }
}
