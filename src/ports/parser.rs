// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration parser trait definition.
//!
//! This module defines the `ConfigParser` trait, which turns the raw text of a
//! configuration payload into an [`EnvironmentsDocument`].

use crate::domain::{ConfigError, EnvironmentsDocument};

/// A trait for parsing environment configuration payloads.
///
/// Implementations must reject payloads that do not describe at least one
/// environment with [`ConfigError::MalformedJson`] (or a format-specific
/// equivalent), so that an empty store can never be published.
///
/// # Examples
///
/// ```rust
/// use openenv::domain::{ConfigError, EnvironmentsDocument};
/// use openenv::ports::ConfigParser;
///
/// struct EmptyParser;
///
/// impl ConfigParser for EmptyParser {
///     fn parse(&self, _content: &str) -> Result<EnvironmentsDocument, ConfigError> {
///         Ok(EnvironmentsDocument::default())
///     }
///
///     fn supported_extensions(&self) -> &[&str] {
///         &["txt"]
///     }
/// }
/// ```
pub trait ConfigParser: Send + Sync {
    /// Parses configuration content.
    ///
    /// # Arguments
    ///
    /// * `content` - The raw content of the configuration payload
    fn parse(&self, content: &str) -> Result<EnvironmentsDocument, ConfigError>;

    /// File extensions this parser understands, without the leading dot.
    fn supported_extensions(&self) -> &[&str];

    /// Returns true when `extension` is one of [`supported_extensions`](Self::supported_extensions).
    fn supports_extension(&self, extension: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
