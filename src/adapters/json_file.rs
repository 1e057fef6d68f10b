// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON environment configuration adapter.
//!
//! This module provides the JSON parser for environment payloads and a file
//! source that reads a payload from disk.

use crate::domain::{ConfigError, EnvironmentsDocument};
use crate::ports::ConfigParser;
use directories::ProjectDirs;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Maximum allowed size of a configuration file (10MB)
const MAX_JSON_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default configuration file name inside the OS configuration directory.
pub const DEFAULT_FILE_NAME: &str = "environments.json";

/// JSON parser for environment payloads.
///
/// # Examples
///
/// ```rust
/// use openenv::adapters::JsonParser;
/// use openenv::ports::ConfigParser;
///
/// let parser = JsonParser::new();
/// let json = r#"{"Environments":{"Testing":{"ServerIP":"10.0.0.6",
///     "SqlCredentials":{"Username":"sa","Password":"pw"},
///     "NetworkCredentials":{"Username":"svc","Password":"pw","Domain":"CORP"}}}}"#;
/// let doc = parser.parse(json).unwrap();
/// assert_eq!(doc.environments["Testing"].server_ip, "10.0.0.6");
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonParser;

impl JsonParser {
    /// Creates a new JSON parser.
    pub fn new() -> Self {
        JsonParser
    }
}

impl ConfigParser for JsonParser {
    fn parse(&self, content: &str) -> Result<EnvironmentsDocument, ConfigError> {
        let document: Option<EnvironmentsDocument> =
            serde_json::from_str(content).map_err(|e| ConfigError::MalformedJson {
                message: format!("Invalid JSON configuration format: {}", e),
                source: Some(e),
            })?;

        let document = document.ok_or_else(|| ConfigError::MalformedJson {
            message: "Configuration payload is null".to_string(),
            source: None,
        })?;

        if document.environments.is_empty() {
            return Err(ConfigError::MalformedJson {
                message: "Configuration payload defines no environments".to_string(),
                source: None,
            });
        }

        Ok(document)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// Maps a read failure on `path` to the matching configuration error.
fn map_read_error(path: &Path, err: io::Error) -> ConfigError {
    let path = path.to_path_buf();
    match err.kind() {
        io::ErrorKind::NotFound => ConfigError::NotFound { path, source: err },
        io::ErrorKind::PermissionDenied => ConfigError::AccessDenied { path, source: err },
        _ => ConfigError::Io { path, source: err },
    }
}

/// Reads a configuration file, enforcing the size limit.
pub fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    let metadata = fs::metadata(path).map_err(|e| map_read_error(path, e))?;

    if metadata.len() > MAX_JSON_FILE_SIZE {
        return Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Configuration file too large: {} bytes (max {} bytes)",
                    metadata.len(),
                    MAX_JSON_FILE_SIZE
                ),
            ),
        });
    }

    fs::read_to_string(path).map_err(|e| map_read_error(path, e))
}

/// A JSON configuration file on disk.
///
/// # Examples
///
/// ```rust,no_run
/// use openenv::adapters::JsonFileSource;
///
/// let source = JsonFileSource::new("/etc/openenv/environments.json");
/// let document = source.load().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    /// Path to the JSON file
    file_path: PathBuf,
    /// JSON parser
    parser: JsonParser,
}

impl JsonFileSource {
    /// Creates a source for the file at `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
            parser: JsonParser::new(),
        }
    }

    /// Creates a source for [`DEFAULT_FILE_NAME`] in the OS-appropriate
    /// configuration directory.
    ///
    /// # Arguments
    ///
    /// * `app_name` - The application name (e.g., "myapp")
    /// * `qualifier` - The organization/qualifier (e.g., "com.example")
    pub fn from_default_location(app_name: &str, qualifier: &str) -> Result<Self, ConfigError> {
        let proj_dirs = ProjectDirs::from(qualifier, "", app_name).ok_or_else(|| {
            ConfigError::Io {
                path: PathBuf::from(app_name),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "Failed to determine project directories",
                ),
            }
        })?;

        Ok(Self::new(proj_dirs.config_dir().join(DEFAULT_FILE_NAME)))
    }

    /// Reads and parses the file.
    pub fn load(&self) -> Result<EnvironmentsDocument, ConfigError> {
        let content = read_config_file(&self.file_path)?;
        let document = self.parser.parse(&content)?;

        tracing::debug!(
            "Loaded {} environment(s) from {}",
            document.environments.len(),
            self.file_path.display()
        );

        Ok(document)
    }

    /// Returns the path to the configuration file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}
