// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment variable settings adapter.
//!
//! This module reads [`Settings`] from prefixed environment variables
//! (`OPENENV_CONFIG_PATH`, `OPENENV_PRODUCTION_MARKER`, ...).

use crate::domain::{RetryPolicy, Settings};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default variable prefix.
pub const DEFAULT_PREFIX: &str = "OPENENV_";

/// Maximum length for environment variable values (prevents DoS)
const MAX_ENV_VALUE_LEN: usize = 64 * 1024;

/// Settings adapter for environment variables.
///
/// Recognised variables (shown with the default prefix):
///
/// | Variable | Setting |
/// |---|---|
/// | `OPENENV_CONFIG_PATH` | environment JSON file |
/// | `OPENENV_PRODUCTION_MARKER` | production marker file |
/// | `OPENENV_PACKAGE_LAYOUT` | app-package path fragment |
/// | `OPENENV_DEV_UI_TEST_API` | dev UI against the testing API (`1`, `true`, `yes`, `on`) |
/// | `OPENENV_URL` | base URL |
/// | `OPENENV_COPY_RETRIES` | copy retries after the first attempt |
/// | `OPENENV_COPY_RETRY_DELAY_MS` | delay between copy attempts |
///
/// Unset, empty or unparsable variables keep the default.
///
/// # Examples
///
/// ```rust
/// use openenv::adapters::EnvSettingsAdapter;
/// use std::collections::HashMap;
///
/// let mut values = HashMap::new();
/// values.insert("DEV_UI_TEST_API".to_string(), "true".to_string());
///
/// let settings = EnvSettingsAdapter::with_values(values).settings();
/// assert!(settings.dev_ui_test_api);
/// ```
#[derive(Debug, Clone)]
pub struct EnvSettingsAdapter {
    /// Prefix stripped from variable names
    prefix: String,
    /// Variables with the prefix already stripped
    values: HashMap<String, String>,
}

impl EnvSettingsAdapter {
    /// Reads the process environment with the default prefix.
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Reads the process environment with a custom prefix.
    ///
    /// # Arguments
    ///
    /// * `prefix` - The prefix to filter environment variables (e.g., "MYAPP_")
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let values = Self::load(&prefix);
        Self { prefix, values }
    }

    /// Creates an adapter with pre-populated values (prefix already stripped).
    ///
    /// **Note**: This method is primarily intended for testing.
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            values,
        }
    }

    /// Loads prefixed variables into a new HashMap.
    fn load(prefix: &str) -> HashMap<String, String> {
        let mut values = HashMap::new();

        for (key, value) in env::vars() {
            let Some(stripped) = key.strip_prefix(prefix) else {
                continue;
            };
            if value.len() > MAX_ENV_VALUE_LEN {
                tracing::debug!(
                    "Skipping oversized environment variable {}: value_len={} (max {})",
                    key,
                    value.len(),
                    MAX_ENV_VALUE_LEN
                );
                continue;
            }
            values.insert(stripped.to_ascii_uppercase(), value);
        }

        tracing::debug!(
            "Loaded {} environment variables (prefix={:?})",
            values.len(),
            prefix
        );

        values
    }

    /// Returns the prefix this adapter reads.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        let raw = self.value(name)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}{}: {:?}", self.prefix, name, raw);
                None
            }
        }
    }

    fn flag(&self, name: &str) -> Option<bool> {
        let raw = self.value(name)?;
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => {
                tracing::warn!("Ignoring invalid flag {}{}: {:?}", self.prefix, name, raw);
                None
            }
        }
    }

    /// Builds settings from the loaded variables on top of the defaults.
    pub fn settings(&self) -> Settings {
        let defaults = Settings::default();
        let retry = RetryPolicy {
            max_retries: self
                .parsed("COPY_RETRIES")
                .unwrap_or(defaults.retry.max_retries),
            delay: self
                .parsed::<u64>("COPY_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.delay),
        };

        Settings {
            config_path: self.value("CONFIG_PATH").map(PathBuf::from),
            production_marker: self
                .value("PRODUCTION_MARKER")
                .map(PathBuf::from)
                .unwrap_or(defaults.production_marker),
            package_layout: self
                .value("PACKAGE_LAYOUT")
                .map(str::to_string)
                .unwrap_or(defaults.package_layout),
            dev_ui_test_api: self
                .flag("DEV_UI_TEST_API")
                .unwrap_or(defaults.dev_ui_test_api),
            url: self.value("URL").map(str::to_string),
            retry,
        }
    }
}

impl Default for EnvSettingsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to set and clean up environment variables
    struct EnvGuard {
        keys: Vec<String>,
    }

    impl EnvGuard {
        fn new() -> Self {
            EnvGuard { keys: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            env::set_var(key, value);
            self.keys.push(key.to_string());
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in &self.keys {
                env::remove_var(key);
            }
        }
    }

    fn adapter(pairs: &[(&str, &str)]) -> EnvSettingsAdapter {
        EnvSettingsAdapter::with_values(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_when_empty() {
        assert_eq!(adapter(&[]).settings(), Settings::default());
    }

    #[test]
    fn test_all_values() {
        let settings = adapter(&[
            ("CONFIG_PATH", "/etc/openenv/env.json"),
            ("PRODUCTION_MARKER", "/etc/openenv/PRODUCTION"),
            ("PACKAGE_LAYOUT", "/opt/app/releases/"),
            ("DEV_UI_TEST_API", "yes"),
            ("URL", "http://0.0.0.0:5000"),
            ("COPY_RETRIES", "2"),
            ("COPY_RETRY_DELAY_MS", "10"),
        ])
        .settings();

        assert_eq!(
            settings.config_path,
            Some(PathBuf::from("/etc/openenv/env.json"))
        );
        assert_eq!(
            settings.production_marker,
            PathBuf::from("/etc/openenv/PRODUCTION")
        );
        assert_eq!(settings.package_layout, "/opt/app/releases/");
        assert!(settings.dev_ui_test_api);
        assert_eq!(settings.url.as_deref(), Some("http://0.0.0.0:5000"));
        assert_eq!(settings.retry.max_retries, 2);
        assert_eq!(settings.retry.delay, Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let settings = adapter(&[
            ("DEV_UI_TEST_API", "maybe"),
            ("COPY_RETRIES", "many"),
            ("URL", "   "),
        ])
        .settings();

        assert!(!settings.dev_ui_test_api);
        assert_eq!(settings.retry.max_retries, 5);
        assert!(settings.url.is_none());
    }

    #[test]
    fn test_reads_process_environment_with_prefix() {
        let mut guard = EnvGuard::new();
        guard.set("OPENENV_TEST_ADAPTER_COPY_RETRIES", "3");
        guard.set("OTHER_COPY_RETRIES", "9");

        let adapter = EnvSettingsAdapter::with_prefix("OPENENV_TEST_ADAPTER_");
        assert_eq!(adapter.prefix(), "OPENENV_TEST_ADAPTER_");
        assert_eq!(adapter.settings().retry.max_retries, 3);
    }
}
