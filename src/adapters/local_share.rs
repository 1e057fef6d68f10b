// SPDX-License-Identifier: MIT OR Apache-2.0

//! Share connector for shares reachable through the local filesystem.
//!
//! Suitable when the shares are already mounted (CIFS mounts on Linux, or UNC
//! paths the process account can reach on Windows). The credential is recorded
//! on the connection but the operating system performs the authentication.

use crate::domain::{NetworkCredentials, ShareError};
use crate::ports::{ShareConnection, ShareConnector};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Filesystem-backed share connector.
///
/// # Examples
///
/// ```rust
/// use openenv::adapters::LocalShareConnector;
/// use openenv::domain::NetworkCredentials;
/// use openenv::ports::ShareConnector;
///
/// let dir = std::env::temp_dir();
/// let connector = LocalShareConnector::new();
/// let connection = connector
///     .connect(dir.to_str().unwrap(), &NetworkCredentials::default())
///     .unwrap();
/// connector.disconnect(&connection).unwrap();
/// assert_eq!(connector.open_connections(), 0);
/// ```
#[derive(Debug, Default)]
pub struct LocalShareConnector {
    /// Open connection count per share
    connections: Mutex<HashMap<String, usize>>,
}

impl LocalShareConnector {
    /// Creates a connector with no open connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections not yet released.
    pub fn open_connections(&self) -> usize {
        let connections = self
            .connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        connections.values().sum()
    }
}

impl ShareConnector for LocalShareConnector {
    fn connect(
        &self,
        share: &str,
        credential: &NetworkCredentials,
    ) -> Result<ShareConnection, ShareError> {
        let metadata = fs::metadata(share).map_err(|e| ShareError::from_io(share, e))?;
        if !metadata.is_dir() {
            return Err(ShareError::fatal(share, "share root is not a directory"));
        }

        let mut connections = self
            .connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *connections.entry(share.to_string()).or_insert(0) += 1;

        tracing::debug!(
            "Connected to share {} as {}",
            share,
            credential.qualified_username()
        );

        Ok(ShareConnection {
            share: share.to_string(),
            username: credential.qualified_username(),
        })
    }

    fn disconnect(&self, connection: &ShareConnection) -> Result<(), ShareError> {
        let mut connections = self
            .connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match connections.get_mut(&connection.share) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    connections.remove(&connection.share);
                }
                tracing::debug!("Disconnected from share {}", connection.share);
                Ok(())
            }
            _ => Err(ShareError::fatal(
                connection.share.as_str(),
                "share is not connected",
            )),
        }
    }

    fn copy_file(&self, from: &str, to: &str) -> Result<u64, ShareError> {
        if !Path::new(from).is_file() {
            return Err(ShareError::fatal(from, "backup file does not exist"));
        }
        fs::copy(from, to).map_err(|e| ShareError::from_io(to, e))
    }
}
