// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host probe backed by the running process and the local filesystem.

use crate::domain::Settings;
use crate::ports::HostProbe;
use std::path::{Path, PathBuf};

/// Probe of the real host.
///
/// * the executable path comes from [`std::env::current_exe`];
/// * the primary OS family is Windows;
/// * the production marker is checked with [`Path::exists`] on every call;
/// * debugger detection reads `TracerPid` from `/proc/self/status` on Linux
///   and reports no debugger elsewhere.
///
/// # Examples
///
/// ```rust
/// use openenv::adapters::SystemHostProbe;
/// use openenv::domain::Settings;
/// use openenv::ports::HostProbe;
///
/// let probe = SystemHostProbe::new(&Settings::default());
/// assert_eq!(probe.is_primary_os(), cfg!(windows));
/// ```
#[derive(Debug, Clone)]
pub struct SystemHostProbe {
    production_marker: PathBuf,
    package_layout: String,
}

impl SystemHostProbe {
    /// Creates a probe using the marker path and package layout from `settings`.
    pub fn new(settings: &Settings) -> Self {
        Self {
            production_marker: settings.production_marker.clone(),
            package_layout: settings.package_layout.clone(),
        }
    }
}

impl Default for SystemHostProbe {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl HostProbe for SystemHostProbe {
    fn executable_path(&self) -> Option<PathBuf> {
        std::env::current_exe().ok()
    }

    fn is_app_package_deployed(&self) -> bool {
        if self.package_layout.is_empty() {
            return false;
        }
        self.executable_path()
            .map(|path| path.to_string_lossy().contains(&self.package_layout))
            .unwrap_or(false)
    }

    fn is_primary_os(&self) -> bool {
        cfg!(windows)
    }

    fn production_marker(&self) -> &Path {
        &self.production_marker
    }

    fn production_marker_exists(&self) -> bool {
        self.production_marker.exists()
    }

    fn debugger_attached(&self) -> bool {
        tracer_attached()
    }
}

#[cfg(target_os = "linux")]
fn tracer_attached() -> bool {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| parse_tracer_pid(&status))
        .map(|pid| pid != 0)
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn tracer_attached() -> bool {
    false
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse().ok())
}
