// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-level settings that tune resolution and cloning.

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the production marker.
pub const DEFAULT_PRODUCTION_MARKER: &str = "C:\\PRODUCTION.ini";

/// Path fragment identifying a self-updating app-package deployment.
pub const DEFAULT_PACKAGE_LAYOUT: &str = "AppData\\Local\\Apps\\2.0\\";

/// Copy retries after the first attempt.
pub const DEFAULT_COPY_RETRIES: u32 = 5;

/// Delay between copy attempts.
pub const DEFAULT_COPY_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Settings read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Environment configuration file, when not passed explicitly
    pub config_path: Option<PathBuf>,
    /// Production marker file
    pub production_marker: PathBuf,
    /// Executable path fragment of app-package deployments
    pub package_layout: String,
    /// Run the development UI against the testing API
    pub dev_ui_test_api: bool,
    /// Externally configured base URL
    pub url: Option<String>,
    /// Copy retry policy
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: None,
            production_marker: PathBuf::from(DEFAULT_PRODUCTION_MARKER),
            package_layout: DEFAULT_PACKAGE_LAYOUT.to_string(),
            dev_ui_test_api: false,
            url: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Fixed-delay retry policy for transient copy failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before each retry
    pub delay: Duration,
}

impl RetryPolicy {
    /// A policy with `max_retries` retries and no delay.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            delay: Duration::ZERO,
        }
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_COPY_RETRIES,
            delay: DEFAULT_COPY_RETRY_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.production_marker, PathBuf::from("C:\\PRODUCTION.ini"));
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.retry.delay, Duration::from_millis(2000));
        assert_eq!(settings.retry.max_attempts(), 6);
        assert!(!settings.dev_ui_test_api);
    }

    #[test]
    fn test_immediate_policy() {
        let policy = RetryPolicy::immediate(2);
        assert_eq!(policy.delay, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 3);
    }
}
