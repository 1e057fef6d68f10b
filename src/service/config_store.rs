// SPDX-License-Identifier: MIT OR Apache-2.0

//! Initialise-once store of environment entries.

use crate::adapters::json_file::read_config_file;
use crate::adapters::JsonParser;
use crate::domain::{ConfigError, EnvironmentEntry, EnvironmentsDocument};
use crate::ports::ConfigParser;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Mutex;

/// Where the environment payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigPayload {
    /// A JSON file on disk
    File(PathBuf),
    /// Inline JSON text
    Json(String),
}

/// The environment entries, loaded once and immutable afterwards.
///
/// Initialisation runs check, lock, check under a single mutex. Once the
/// document is published every read is lock-free.
///
/// # Examples
///
/// ```rust
/// use openenv::service::{ConfigPayload, ConfigStore};
///
/// let store = ConfigStore::new();
/// store
///     .initialize(ConfigPayload::Json(
///         r#"{"Environments":{"Testing":{"ServerIP":"10.0.0.6",
///             "SqlCredentials":{"Username":"sa","Password":"pw"},
///             "NetworkCredentials":{"Username":"svc","Password":"pw"}}}}"#
///             .to_string(),
///     ))
///     .unwrap();
///
/// assert_eq!(store.get_entry("Testing").unwrap().server_ip, "10.0.0.6");
/// assert!(store.get_entry("Production").is_err());
/// ```
pub struct ConfigStore {
    init_lock: Mutex<()>,
    document: OnceCell<EnvironmentsDocument>,
    parser: Box<dyn ConfigParser>,
}

impl ConfigStore {
    /// Creates an empty store that parses JSON payloads.
    pub fn new() -> Self {
        Self::with_parser(Box::new(JsonParser::new()))
    }

    /// Creates an empty store with a custom parser.
    pub fn with_parser(parser: Box<dyn ConfigParser>) -> Self {
        Self {
            init_lock: Mutex::new(()),
            document: OnceCell::new(),
            parser,
        }
    }

    /// Loads the store.
    ///
    /// After a successful load every further call fails with
    /// [`ConfigError::AlreadyInitialized`]. A failed load leaves the store empty.
    pub fn initialize(&self, payload: ConfigPayload) -> Result<(), ConfigError> {
        if self.document.get().is_some() {
            return Err(ConfigError::AlreadyInitialized);
        }

        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.document.get().is_some() {
            return Err(ConfigError::AlreadyInitialized);
        }

        let (origin, content) = match payload {
            ConfigPayload::File(path) => {
                let content = read_config_file(&path)?;
                (path.display().to_string(), content)
            }
            ConfigPayload::Json(text) => ("inline payload".to_string(), text),
        };

        let document = self.parser.parse(&content)?;
        let count = document.environments.len();
        self.document
            .set(document)
            .map_err(|_| ConfigError::AlreadyInitialized)?;

        tracing::info!("Loaded {} environment(s) from {}", count, origin);
        Ok(())
    }

    /// Returns true once [`initialize`](Self::initialize) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.document.get().is_some()
    }

    /// The loaded document.
    pub fn document(&self) -> Result<&EnvironmentsDocument, ConfigError> {
        self.document.get().ok_or(ConfigError::NotInitialized)
    }

    /// Looks up the entry for `key`. A missing key is an error, never a default.
    pub fn get_entry(&self, key: &str) -> Result<EnvironmentEntry, ConfigError> {
        self.document()?
            .environments
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// The configured environment keys, sorted.
    pub fn environment_keys(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self.document()?.environments.keys().cloned().collect())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
