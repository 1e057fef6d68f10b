// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deployment modes and the rules that pick one from host signals.

use std::fmt;

/// Environment key of the production entry.
pub const PRODUCTION_KEY: &str = "Production";
/// Environment key of the testing entry.
pub const TESTING_KEY: &str = "Testing";
/// Environment key of the development entry.
pub const DEVELOPMENT_KEY: &str = "Development";

/// The deployment mode a process runs in.
///
/// The discriminants are the values shown to operators; no logic depends on
/// their ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeploymentMode {
    /// Live UI and live database.
    Production = 1,
    /// Pre-release: live UI clone and testing database.
    Testing = 2,
    /// UI and API both in the development environment.
    Development = 3,
    /// UI in development, API in the testing environment.
    DevelopmentUiTestApi = 4,
}

impl DeploymentMode {
    /// All modes in display order.
    pub const ALL: [DeploymentMode; 4] = [
        DeploymentMode::Production,
        DeploymentMode::Testing,
        DeploymentMode::Development,
        DeploymentMode::DevelopmentUiTestApi,
    ];

    /// The display number of this mode.
    pub fn number(self) -> u8 {
        self as u8
    }

    /// The mode name as shown in logs and banners.
    pub fn name(self) -> &'static str {
        match self {
            DeploymentMode::Production => "Production",
            DeploymentMode::Testing => "Testing",
            DeploymentMode::Development => "Development",
            DeploymentMode::DevelopmentUiTestApi => "Development_Ui_Test_Api",
        }
    }

    /// Parses a mode name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
    }

    /// The canonical environment key of this mode.
    ///
    /// ```
    /// use openenv::domain::DeploymentMode;
    ///
    /// assert_eq!(DeploymentMode::DevelopmentUiTestApi.environment_key(), "Development");
    /// ```
    pub fn environment_key(self) -> &'static str {
        match self {
            DeploymentMode::Production => PRODUCTION_KEY,
            DeploymentMode::Testing => TESTING_KEY,
            _ => DEVELOPMENT_KEY,
        }
    }

    /// The environment key whose entry configures this mode's server and API.
    ///
    /// Differs from [`environment_key`](Self::environment_key): the dev-UI /
    /// test-API mode talks to the testing environment.
    pub fn config_key(self) -> &'static str {
        match self {
            DeploymentMode::Production => PRODUCTION_KEY,
            DeploymentMode::DevelopmentUiTestApi | DeploymentMode::Testing => TESTING_KEY,
            DeploymentMode::Development => DEVELOPMENT_KEY,
        }
    }

    /// The environment key whose entry hosts this mode's UI.
    pub fn ui_key(self) -> &'static str {
        match self {
            DeploymentMode::Production => PRODUCTION_KEY,
            DeploymentMode::Testing => TESTING_KEY,
            DeploymentMode::DevelopmentUiTestApi | DeploymentMode::Development => DEVELOPMENT_KEY,
        }
    }

    /// The suffix appended to database names to form this mode's catalog.
    pub fn catalog_suffix(self) -> &'static str {
        match self {
            DeploymentMode::Production => "_Live",
            DeploymentMode::Testing => "_Test",
            _ => "_Dev",
        }
    }

    /// Picks the deployment mode for a host.
    ///
    /// Rules are evaluated in order; the first that matches wins:
    ///
    /// 1. an app-package (self-updating) deployment is always production;
    /// 2. on the primary OS family the production marker means production;
    /// 3. the dev-UI / test-API override;
    /// 4. an attached debugger means development;
    /// 5. otherwise testing on the primary OS family, production elsewhere.
    ///
    /// ```
    /// use openenv::domain::{DeploymentMode, HostSignals};
    ///
    /// let signals = HostSignals {
    ///     primary_os: true,
    ///     production_marker: true,
    ///     ..HostSignals::default()
    /// };
    /// assert_eq!(DeploymentMode::resolve(&signals), DeploymentMode::Production);
    /// ```
    pub fn resolve(signals: &HostSignals) -> Self {
        if signals.app_package_deployed {
            return DeploymentMode::Production;
        }
        if signals.primary_os && signals.production_marker {
            return DeploymentMode::Production;
        }
        if signals.dev_ui_test_api {
            return DeploymentMode::DevelopmentUiTestApi;
        }
        if signals.debugger_attached {
            return DeploymentMode::Development;
        }
        if signals.primary_os {
            DeploymentMode::Testing
        } else {
            // No staging tier off the primary platform.
            DeploymentMode::Production
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The host observations the resolver decides from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostSignals {
    /// The executable lives in the self-update deployment layout.
    pub app_package_deployed: bool,
    /// The host runs the primary OS family.
    pub primary_os: bool,
    /// The production marker file exists.
    pub production_marker: bool,
    /// The caller asked for a development UI against the testing API.
    pub dev_ui_test_api: bool,
    /// A debugger is attached to the process.
    pub debugger_attached: bool,
}
