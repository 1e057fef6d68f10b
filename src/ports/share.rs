// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network share trait definition.
//!
//! A [`ShareConnector`] authenticates against a remote file share with a
//! network credential and copies files between shares. Callers should not use
//! it directly for connections; `service::NetworkShareSession` wraps
//! `connect`/`disconnect` so a connection is always released.

use crate::domain::{NetworkCredentials, ShareError};

/// An authenticated connection to one share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareConnection {
    /// The share root, e.g. `\\server\share`
    pub share: String,
    /// The account the connection was made with
    pub username: String,
}

/// Driver for credential-bound file shares.
///
/// # Errors
///
/// Every failure is a [`ShareError`] carrying a
/// [`ShareErrorKind`](crate::domain::ShareErrorKind); callers retry only
/// transient ones.
pub trait ShareConnector: Send + Sync {
    /// Opens a connection to `share` as `credential`.
    fn connect(
        &self,
        share: &str,
        credential: &NetworkCredentials,
    ) -> Result<ShareConnection, ShareError>;

    /// Releases a connection returned by [`connect`](Self::connect).
    fn disconnect(&self, connection: &ShareConnection) -> Result<(), ShareError>;

    /// Copies `from` to `to`, overwriting `to`. Returns the bytes copied.
    fn copy_file(&self, from: &str, to: &str) -> Result<u64, ShareError>;
}
