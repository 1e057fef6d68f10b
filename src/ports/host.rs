// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host probe trait definition.
//!
//! The resolver never inspects the process or filesystem itself. It asks a
//! [`HostProbe`] for each signal, which keeps the decision testable.

use crate::domain::HostSignals;
use std::path::{Path, PathBuf};

/// Observations about the host the process runs on.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the same probe is consulted from the
/// resolver and from connection-string guards.
pub trait HostProbe: Send + Sync {
    /// Full path of the running executable, when known.
    fn executable_path(&self) -> Option<PathBuf>;

    /// True when the executable path matches the self-update deployment layout.
    fn is_app_package_deployed(&self) -> bool;

    /// True on the primary OS family (Windows).
    fn is_primary_os(&self) -> bool;

    /// Path of the file whose presence marks the production host.
    fn production_marker(&self) -> &Path;

    /// True when the production marker exists.
    fn production_marker_exists(&self) -> bool;

    /// True when a debugger is attached to the process.
    fn debugger_attached(&self) -> bool;

    /// Collects every signal at once.
    fn signals(&self, dev_ui_test_api: bool) -> HostSignals {
        HostSignals {
            app_package_deployed: self.is_app_package_deployed(),
            primary_os: self.is_primary_os(),
            production_marker: self.production_marker_exists(),
            dev_ui_test_api,
            debugger_attached: self.debugger_attached(),
        }
    }
}
