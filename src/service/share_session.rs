// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential-bound network share sessions.

use crate::domain::{NetworkCredentials, ShareError};
use crate::ports::{ShareConnection, ShareConnector};

/// An open connection to a network share.
///
/// The connection is released by [`release`](Self::release), or by `Drop`
/// when the handle goes out of scope unreleased. Errors during a drop-time
/// release can only be logged.
///
/// # Examples
///
/// ```rust
/// use openenv::adapters::LocalShareConnector;
/// use openenv::domain::NetworkCredentials;
/// use openenv::service::NetworkShareSession;
///
/// let connector = LocalShareConnector::new();
/// let share = std::env::temp_dir();
/// {
///     let _session = NetworkShareSession::open(
///         &connector,
///         share.to_str().unwrap(),
///         &NetworkCredentials::default(),
///     )
///     .unwrap();
///     assert_eq!(connector.open_connections(), 1);
/// }
/// assert_eq!(connector.open_connections(), 0);
/// ```
pub struct NetworkShareSession<'a> {
    connector: &'a dyn ShareConnector,
    connection: Option<ShareConnection>,
}

impl<'a> NetworkShareSession<'a> {
    /// Connects to `share` with `credential`.
    pub fn open(
        connector: &'a dyn ShareConnector,
        share: &str,
        credential: &NetworkCredentials,
    ) -> Result<Self, ShareError> {
        let connection = connector.connect(share, credential)?;
        Ok(Self {
            connector,
            connection: Some(connection),
        })
    }

    /// Runs `f` with a session on `share` open, releasing it afterwards
    /// whatever `f` returns. An error from `f` takes precedence over a
    /// release error.
    pub fn scoped<T, F>(
        connector: &'a dyn ShareConnector,
        share: &str,
        credential: &NetworkCredentials,
        f: F,
    ) -> Result<T, ShareError>
    where
        F: FnOnce(&NetworkShareSession<'a>) -> Result<T, ShareError>,
    {
        let session = Self::open(connector, share, credential)?;
        let result = f(&session);
        let released = session.release();
        let value = result?;
        released?;
        Ok(value)
    }

    /// The share this session is connected to.
    pub fn share(&self) -> &str {
        self.connection
            .as_ref()
            .map(|c| c.share.as_str())
            .unwrap_or_default()
    }

    /// Disconnects now, reporting any failure.
    pub fn release(mut self) -> Result<(), ShareError> {
        match self.connection.take() {
            Some(connection) => self.connector.disconnect(&connection),
            None => Ok(()),
        }
    }
}

impl Drop for NetworkShareSession<'_> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = self.connector.disconnect(&connection) {
                tracing::warn!("Failed to release share {}: {}", connection.share, e);
            }
        }
    }
}

impl std::fmt::Debug for NetworkShareSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkShareSession")
            .field("connection", &self.connection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingConnector {
        connects: AtomicUsize,
        disconnects: AtomicUsize,
        refuse: bool,
    }

    impl ShareConnector for CountingConnector {
        fn connect(
            &self,
            share: &str,
            credential: &NetworkCredentials,
        ) -> Result<ShareConnection, ShareError> {
            if self.refuse {
                return Err(ShareError::fatal(share, "logon failure"));
            }
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(ShareConnection {
                share: share.to_string(),
                username: credential.qualified_username(),
            })
        }

        fn disconnect(&self, _connection: &ShareConnection) -> Result<(), ShareError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn copy_file(&self, _from: &str, _to: &str) -> Result<u64, ShareError> {
            Ok(0)
        }
    }

    #[test]
    fn test_release_disconnects_once() {
        let connector = CountingConnector::default();
        let session =
            NetworkShareSession::open(&connector, "\\\\srv\\b", &NetworkCredentials::default())
                .unwrap();
        assert_eq!(session.share(), "\\\\srv\\b");
        session.release().unwrap();
        assert_eq!(connector.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let connector = CountingConnector::default();
        {
            let _session =
                NetworkShareSession::open(&connector, "\\\\srv\\b", &NetworkCredentials::default())
                    .unwrap();
        }
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(connector.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_releases_on_error() {
        let connector = CountingConnector::default();
        let result: Result<(), ShareError> = NetworkShareSession::scoped(
            &connector,
            "\\\\srv\\b",
            &NetworkCredentials::default(),
            |_| Err(ShareError::transient("\\\\srv\\b\\a.bak", "busy")),
        );
        assert!(result.unwrap_err().is_transient());
        assert_eq!(connector.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_open_releases_nothing() {
        let connector = CountingConnector {
            refuse: true,
            ..CountingConnector::default()
        };
        assert!(
            NetworkShareSession::open(&connector, "\\\\srv\\b", &NetworkCredentials::default())
                .is_err()
        );
        assert_eq!(connector.disconnects.load(Ordering::SeqCst), 0);
    }
}
