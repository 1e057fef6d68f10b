// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deployment mode resolution and caching.

use crate::domain::{DeploymentMode, HostSignals, ResolutionError};
use crate::ports::HostProbe;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, RwLock};

/// Resolves the deployment mode from a [`HostProbe`] and caches it.
///
/// Reads go through a read-write lock. Writers serialise on a separate
/// mutex so that preparing a mode and storing it happen as one step.
pub struct EnvironmentResolver {
    probe: Arc<dyn HostProbe>,
    mode: RwLock<Option<DeploymentMode>>,
    set_lock: Mutex<()>,
}

impl EnvironmentResolver {
    /// Creates an unresolved resolver.
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self {
            probe,
            mode: RwLock::new(None),
            set_lock: Mutex::new(()),
        }
    }

    /// The host probe.
    pub fn probe(&self) -> &dyn HostProbe {
        self.probe.as_ref()
    }

    /// Collects the host signals.
    pub fn signals(&self, dev_ui_test_api: bool) -> HostSignals {
        self.probe.signals(dev_ui_test_api)
    }

    /// Decides the mode for this host without caching it.
    pub fn resolve(&self, dev_ui_test_api: bool) -> DeploymentMode {
        let signals = self.signals(dev_ui_test_api);
        let mode = DeploymentMode::resolve(&signals);
        tracing::debug!(?signals, %mode, "Resolved deployment mode");
        mode
    }

    /// The cached mode.
    pub fn mode(&self) -> Result<DeploymentMode, ResolutionError> {
        let mode = self
            .mode
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        mode.ok_or(ResolutionError::NotInitialized)
    }

    /// Returns true once a mode has been stored.
    pub fn is_resolved(&self) -> bool {
        self.mode().is_ok()
    }

    /// Runs `prepare` for `mode` while holding the writer lock and stores
    /// `mode` only when it succeeds. A failed `prepare` leaves the previous
    /// mode in place.
    pub fn set_mode_with<F, T, E>(&self, mode: DeploymentMode, prepare: F) -> Result<T, E>
    where
        F: FnOnce(DeploymentMode) -> Result<T, E>,
    {
        let _guard = self
            .set_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let prepared = prepare(mode)?;

        let previous = {
            let mut current = self
                .mode
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            current.replace(mode)
        };

        match previous {
            Some(previous) if previous != mode => {
                tracing::info!("Deployment mode changed from {} to {}", previous, mode)
            }
            Some(_) => tracing::debug!("Deployment mode re-set to {}", mode),
            None => tracing::info!("Deployment mode set to {}", mode),
        }

        Ok(prepared)
    }

    /// Stores `mode` with no preparation step.
    pub fn set_mode(&self, mode: DeploymentMode) {
        let stored: Result<(), Infallible> = self.set_mode_with(mode, |_| Ok(()));
        if let Err(never) = stored {
            match never {}
        }
    }
}

impl std::fmt::Debug for EnvironmentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentResolver")
            .field("mode", &self.mode().ok())
            .finish()
    }
}
