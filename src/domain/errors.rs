// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the openenv crate.
//!
//! Each subsystem has its own error enum so callers can match on the failure
//! class they care about. [`OpenEnvError`] aggregates all of them for APIs that
//! span several subsystems. All errors use `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or reading the environment configuration.
///
/// # Examples
///
/// ```
/// use openenv::domain::errors::ConfigError;
///
/// fn lookup() -> Result<(), ConfigError> {
///     Err(ConfigError::KeyNotFound {
///         key: "Staging".to_string(),
///     })
/// }
/// assert!(lookup().is_err());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Could not find configuration file at {path}: {source}")]
    NotFound {
        /// The path that was read
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The configuration file exists but cannot be read by this process.
    #[error("Could not access configuration file at {path}: {source}")]
    AccessDenied {
        /// The path that was read
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Any other I/O failure while reading the configuration file.
    #[error("I/O error with configuration file at {path}: {source}")]
    Io {
        /// The path that was read
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The payload is not valid JSON, or does not describe any environment.
    #[error("Invalid configuration payload: {message}")]
    MalformedJson {
        /// The error message
        message: String,
        /// The underlying deserialization error, if any
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The configuration store was initialised twice.
    #[error("Environment configuration is already initialised")]
    AlreadyInitialized,

    /// The configuration store was read before it was initialised.
    #[error("Environment configuration must be initialised before use")]
    NotInitialized,

    /// No environment entry exists for the requested key.
    #[error("{key} environment configuration not found")]
    KeyNotFound {
        /// The key that was not found
        key: String,
    },

    /// An environment entry carries a server address that is not an IP literal.
    #[error("Invalid IP address format in configuration for key '{key}': '{value}'")]
    InvalidServerIp {
        /// The environment key
        key: String,
        /// The offending value
        value: String,
        /// The parse error
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Errors raised by the deployment mode resolver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolutionError {
    /// The deployment mode was read before it was resolved.
    #[error("Hosting mode not initialised")]
    NotInitialized,
}

/// Errors raised when a connection string is refused for the current host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthorizationError {
    /// A live connection string was requested on a host without the production marker.
    #[error(
        "Only the production host may access the live database '{catalog}': production marker {marker} is missing"
    )]
    UnauthorizedProductionAccess {
        /// The catalog that was requested
        catalog: String,
        /// The marker path that was checked
        marker: PathBuf,
    },
}

/// Errors raised by the runtime URL registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UrlError {
    /// The URL text does not parse, or its scheme is not http/https.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected text
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// No IPv4 address is available to derive a default URL from.
    #[error("No network adapters with an IPv4 address in the system")]
    NoIpv4Address,
}

/// Classification of a network share failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareErrorKind {
    /// The failure may clear up on its own; the operation can be retried.
    Transient,
    /// Retrying will not help.
    Fatal,
}

/// Error reported by a [`ShareConnector`](crate::ports::ShareConnector).
#[derive(Debug, Error)]
#[error("Network share error on '{path}': {message}")]
pub struct ShareError {
    /// Retry classification
    pub kind: ShareErrorKind,
    /// The share or file path involved
    pub path: String,
    /// The error message
    pub message: String,
    /// The underlying error, if any
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ShareError {
    /// Creates a retryable share error.
    pub fn transient(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ShareErrorKind::Transient,
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a non-retryable share error.
    pub fn fatal(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ShareErrorKind::Fatal,
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Classifies an I/O error. Interruptions, timeouts and sharing conflicts are
    /// transient; everything else is fatal.
    pub fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let kind = match err.kind() {
            ErrorKind::Interrupted
            | ErrorKind::TimedOut
            | ErrorKind::WouldBlock
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => ShareErrorKind::Transient,
            // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION on Windows
            _ if matches!(err.raw_os_error(), Some(32) | Some(33)) => ShareErrorKind::Transient,
            _ => ShareErrorKind::Fatal,
        };
        Self {
            kind,
            path: path.into(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Returns true when the failure may be retried.
    pub fn is_transient(&self) -> bool {
        self.kind == ShareErrorKind::Transient
    }
}

/// Error reported by a [`SqlConnector`](crate::ports::SqlConnector) or its sessions.
#[derive(Debug, Error)]
#[error("SQL error on '{server}': {message}")]
pub struct SqlError {
    /// The data source involved
    pub server: String,
    /// The error message
    pub message: String,
    /// The underlying error, if any
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SqlError {
    /// Creates a SQL error without an underlying cause.
    pub fn new(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            message: message.into(),
            source: None,
        }
    }
}

/// Errors raised by the clone pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CloneError {
    /// The source backup could not be produced.
    #[error("Backup of '{database}' to '{path}' failed: {source}")]
    BackupFailed {
        /// The source database
        database: String,
        /// The backup file that was requested
        path: String,
        /// The SQL failure
        source: SqlError,
    },

    /// The backup file could not be copied to the destination share.
    #[error("Copy of '{from}' to '{to}' failed after {attempts} attempt(s): {source}")]
    CopyFailed {
        /// The source backup path
        from: String,
        /// The destination backup path
        to: String,
        /// Number of attempts made
        attempts: u32,
        /// The last share failure
        source: ShareError,
    },

    /// A restore step failed on the destination server.
    #[error("Restore of '{database}' failed during '{step}': {source}")]
    RestoreFailed {
        /// The destination database
        database: String,
        /// The step that failed
        step: String,
        /// The SQL failure
        source: SqlError,
    },

    /// Another clone into the same destination database is in progress.
    #[error("A clone into '{database}' on '{data_source}' is already in progress")]
    DestinationBusy {
        /// The destination database
        database: String,
        /// The destination server
        data_source: String,
    },

    /// The caller cancelled the clone.
    #[error("Clone cancelled during '{step}'")]
    Cancelled {
        /// The step that observed the cancellation
        step: String,
    },
}

/// Umbrella error for operations spanning several subsystems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OpenEnvError {
    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Resolution failure
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// Authorization failure
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    /// URL failure
    #[error(transparent)]
    Url(#[from] UrlError),
    /// Clone failure
    #[error(transparent)]
    Clone(#[from] CloneError),
    /// I/O failure outside configuration loading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for openenv operations.
pub type Result<T> = std::result::Result<T, OpenEnvError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_key_not_found_error() {
        let error = ConfigError::KeyNotFound {
            key: "Staging".to_string(),
        };
        assert_eq!(error.to_string(), "Staging environment configuration not found");
    }

    #[test]
    fn test_not_found_carries_path() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/etc/openenv/env.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(error.to_string().contains("/etc/openenv/env.json"));
    }

    #[test]
    fn test_resolution_error() {
        assert_eq!(
            ResolutionError::NotInitialized.to_string(),
            "Hosting mode not initialised"
        );
    }

    #[test]
    fn test_unauthorized_production_access_mentions_catalog() {
        let error = AuthorizationError::UnauthorizedProductionAccess {
            catalog: "Orders_Live".to_string(),
            marker: PathBuf::from("C:\\PRODUCTION.ini"),
        };
        let text = error.to_string();
        assert!(text.contains("Orders_Live"));
        assert!(text.contains("PRODUCTION.ini"));
    }

    #[test]
    fn test_share_error_classification() {
        let timed_out = ShareError::from_io("\\\\srv\\b", io::Error::new(io::ErrorKind::TimedOut, "t"));
        assert!(timed_out.is_transient());

        let denied = ShareError::from_io(
            "\\\\srv\\b",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(!denied.is_transient());

        let sharing_violation = ShareError::from_io("\\\\srv\\b", io::Error::from_raw_os_error(32));
        assert_eq!(sharing_violation.kind, ShareErrorKind::Transient);
    }

    #[test]
    fn test_clone_error_context() {
        let error = CloneError::RestoreFailed {
            database: "Orders_Test".to_string(),
            step: "restore".to_string(),
            source: SqlError::new("10.0.0.5", "exclusive access could not be obtained"),
        };
        let text = error.to_string();
        assert!(text.contains("Orders_Test"));
        assert!(text.contains("restore"));
    }

    #[test]
    fn test_umbrella_conversion() {
        let error: OpenEnvError = ResolutionError::NotInitialized.into();
        assert!(matches!(
            error,
            OpenEnvError::Resolution(ResolutionError::NotInitialized)
        ));
    }
}
