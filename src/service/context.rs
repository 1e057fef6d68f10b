// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `OpenEnv` context: configuration, deployment mode, connection strings
//! and base URL of one process.

use crate::adapters::host_address::host_name;
use crate::adapters::{HostAddressSource, SystemHostProbe};
use crate::domain::{
    catalog_name, connection_name_to_db_name, ConfigError, ConnectionDescriptor, DbCloneJob,
    DbConfig, DeploymentMode, EnvironmentEntry, Result, Settings, UrlError,
};
use crate::ports::{AddressSource, HostProbe};
use crate::service::{
    authorize_catalog, connection_descriptor_for_db, current_db_config, ConfigPayload,
    ConfigStore, EnvironmentResolver, RuntimeUrlConfig,
};
use std::fmt;
use std::net::{IpAddr, TcpListener};
use std::sync::{Arc, Mutex};
use sysinfo::System;

/// Callback invoked after the deployment mode changes.
pub type ModeListener = Arc<dyn Fn(DeploymentMode) + Send + Sync>;

/// Caption describing the environment a UI is connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// Text to show
    pub caption: String,
    /// Whether the banner should be shown at all
    pub visible: bool,
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.caption)
    }
}

/// Everything a process knows about its deployment environment.
///
/// Create one per process (or per test), initialise it once and share it by
/// reference or `Arc`.
///
/// # Examples
///
/// ```rust
/// use openenv::domain::{DeploymentMode, Settings};
/// use openenv::service::{ConfigPayload, OpenEnv};
///
/// let env = OpenEnv::new(Settings::default());
/// env.store()
///     .initialize(ConfigPayload::Json(
///         r#"{"Environments":{"Development":{"ServerIP":"10.0.0.7",
///             "SqlCredentials":{"Username":"dev","Password":"pw"},
///             "NetworkCredentials":{"Username":"svc","Password":"pw"}}}}"#
///             .to_string(),
///     ))
///     .unwrap();
/// env.set_mode(DeploymentMode::Development).unwrap();
///
/// let connection = env.obtain_connection_string("OrdersConnection", false).unwrap();
/// assert!(connection.contains("Initial Catalog=Orders_Dev"));
/// ```
pub struct OpenEnv {
    settings: Settings,
    store: ConfigStore,
    resolver: EnvironmentResolver,
    runtime: RuntimeUrlConfig,
    addresses: Arc<dyn AddressSource>,
    listeners: Mutex<Vec<ModeListener>>,
}

impl OpenEnv {
    /// Creates a context probing the real host.
    pub fn new(settings: Settings) -> Self {
        let probe = Arc::new(SystemHostProbe::new(&settings));
        Self::with_ports(settings, probe, Arc::new(HostAddressSource::new()))
    }

    /// Creates a context over custom host and address ports.
    pub fn with_ports(
        settings: Settings,
        probe: Arc<dyn HostProbe>,
        addresses: Arc<dyn AddressSource>,
    ) -> Self {
        Self {
            settings,
            store: ConfigStore::new(),
            resolver: EnvironmentResolver::new(probe),
            runtime: RuntimeUrlConfig::new(),
            addresses,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// The process settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The environment entries.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// The deployment mode resolver.
    pub fn resolver(&self) -> &EnvironmentResolver {
        &self.resolver
    }

    /// Base URL and connection strings.
    pub fn runtime(&self) -> &RuntimeUrlConfig {
        &self.runtime
    }

    fn probe(&self) -> &dyn HostProbe {
        self.resolver.probe()
    }

    /// Loads the configuration, then runs [`initialise_host`](Self::initialise_host).
    pub fn initialise(&self, payload: ConfigPayload) -> Result<DeploymentMode> {
        self.store.initialize(payload)?;
        self.initialise_host()
    }

    /// Resolves and stores the deployment mode, sets the base URL and logs a
    /// description of the host. The configuration must already be loaded.
    pub fn initialise_host(&self) -> Result<DeploymentMode> {
        if !self.store.is_initialized() {
            return Err(ConfigError::NotInitialized.into());
        }

        let url = self.settings.url.as_deref().unwrap_or_default();
        match self.runtime.init_url(url, self.addresses.as_ref()) {
            Ok(()) => {}
            Err(UrlError::NoIpv4Address) => {
                tracing::warn!("No IPv4 address found; the base URL will use the API address")
            }
            Err(e) => return Err(e.into()),
        }

        let mode = self.resolver.resolve(self.settings.dev_ui_test_api);
        self.set_mode(mode)?;

        tracing::info!("Environment information:\n{}", self.environment_info());
        tracing::info!("Deployment mode: {} ({})", mode, mode.number());
        match (self.api_ip(), self.ui_ip()) {
            (Ok(api), Ok(ui)) => tracing::info!("API IP: {}, UI IP: {}", api, ui),
            (api, ui) => tracing::warn!("Could not determine API/UI addresses: {:?} / {:?}", api.err(), ui.err()),
        }

        Ok(mode)
    }

    /// The cached deployment mode.
    pub fn mode(&self) -> Result<DeploymentMode> {
        Ok(self.resolver.mode()?)
    }

    /// Stores `mode`, rebuilds every registered connection string and the
    /// base URL for it, then notifies the mode listeners.
    ///
    /// All strings are built before anything is stored. When one of them
    /// cannot be built the previous mode, strings and URL stay in place.
    /// Live catalogs are never stored on a host without the production
    /// marker; their entries are cleared instead.
    pub fn set_mode(&self, mode: DeploymentMode) -> Result<()> {
        self.resolver.set_mode_with(mode, |mode| self.refresh(mode))?;

        let listeners: Vec<ModeListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for listener in listeners {
            listener(mode);
        }
        Ok(())
    }

    /// Registers a callback run after every [`set_mode`](Self::set_mode).
    pub fn on_mode_change<F>(&self, listener: F)
    where
        F: Fn(DeploymentMode) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(listener));
    }

    fn refresh(&self, mode: DeploymentMode) -> Result<()> {
        if !self.store.is_initialized() {
            tracing::debug!("Configuration not loaded; nothing to refresh for {}", mode);
            return Ok(());
        }

        let mut strings = Vec::new();
        for name in self.runtime.connection_names() {
            let descriptor = connection_descriptor_for_db(&self.store, mode, &name)?;
            let value = match authorize_catalog(
                self.probe(),
                mode,
                &descriptor.initial_catalog,
                false,
            ) {
                Ok(()) => {
                    tracing::debug!("Connection {} -> {}", name, descriptor.redacted());
                    descriptor.to_string()
                }
                Err(e) => {
                    tracing::warn!("Clearing connection {}: {}", name, e);
                    String::new()
                }
            };
            strings.push((name, value));
        }

        let api = self.ip_for(mode.config_key())?;
        self.runtime.apply_refresh(strings, api)?;
        Ok(())
    }

    /// Registers connection strings by raw configuration key and rebuilds
    /// them for the current mode, if one is set. Returns the number of
    /// names added.
    pub fn register_connections<I, K, V>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let added = self.runtime.load_connections(entries);
        if let Ok(mode) = self.resolver.mode() {
            self.refresh(mode)?;
        }
        Ok(added)
    }

    /// The canonical environment key of the current mode.
    pub fn environment_key(&self) -> Result<&'static str> {
        Ok(self.mode()?.environment_key())
    }

    /// The entry configuring the current mode's server and API.
    pub fn current_environment_config(&self) -> Result<EnvironmentEntry> {
        let mode = self.mode()?;
        Ok(self.store.get_entry(mode.config_key())?)
    }

    /// The entry stored under `key`.
    pub fn environment_config(&self, key: &str) -> Result<EnvironmentEntry> {
        Ok(self.store.get_entry(key)?)
    }

    fn ip_for(&self, key: &str) -> Result<IpAddr> {
        Ok(self.store.get_entry(key)?.server_addr(key)?)
    }

    /// Address of the API server for the current mode.
    pub fn api_ip(&self) -> Result<IpAddr> {
        self.ip_for(self.mode()?.config_key())
    }

    /// Address of the UI host for the current mode.
    pub fn ui_ip(&self) -> Result<IpAddr> {
        self.ip_for(self.mode()?.ui_key())
    }

    /// `db_name` in the current mode's environment.
    pub fn current_db_config(&self, db_name: &str) -> Result<DbConfig> {
        Ok(current_db_config(&self.store, self.mode()?, db_name)?)
    }

    /// Descriptor opening `db_name`'s catalog for the current mode.
    pub fn connection_descriptor_for_db(&self, db_name: &str) -> Result<ConnectionDescriptor> {
        Ok(connection_descriptor_for_db(
            &self.store,
            self.mode()?,
            db_name,
        )?)
    }

    /// The connection string for a logical name such as `OrdersConnection`.
    ///
    /// Live catalogs are refused on hosts without the production marker
    /// unless `allow_production_override` is set.
    pub fn obtain_connection_string(
        &self,
        logical_name: &str,
        allow_production_override: bool,
    ) -> Result<String> {
        let mode = self.mode()?;
        let db_name = connection_name_to_db_name(logical_name);
        let descriptor = connection_descriptor_for_db(&self.store, mode, &db_name)?;
        authorize_catalog(
            self.probe(),
            mode,
            &descriptor.initial_catalog,
            allow_production_override,
        )?;
        Ok(descriptor.to_string())
    }

    /// A job cloning `db_name` from one mode's environment to another's.
    ///
    /// Cloning into production is subject to the same guard as
    /// [`obtain_connection_string`](Self::obtain_connection_string).
    pub fn clone_job(
        &self,
        db_name: &str,
        source: DeploymentMode,
        destination: DeploymentMode,
    ) -> Result<DbCloneJob> {
        authorize_catalog(
            self.probe(),
            destination,
            &catalog_name(db_name, destination),
            false,
        )?;
        let source_entry = self.store.get_entry(source.config_key())?;
        let destination_entry = self.store.get_entry(destination.config_key())?;
        Ok(DbCloneJob::between(
            db_name,
            (source, source_entry),
            (destination, destination_entry),
        ))
    }

    /// The environment banner for the current mode.
    ///
    /// App-package deployments and production-marker hosts get a hidden
    /// banner; everything else shows the mode and the catalogs in use.
    pub fn banner(&self) -> Result<Banner> {
        let mode = self.mode()?;
        let probe = self.probe();
        let heading = self.catalog_heading(mode);

        if probe.is_app_package_deployed() {
            return Ok(Banner {
                caption: format!("{} | {}", mode, heading),
                visible: false,
            });
        }
        if probe.production_marker_exists() {
            return Ok(Banner {
                caption: format!("{} | Live", mode),
                visible: false,
            });
        }

        let tag = match mode {
            DeploymentMode::Production => "[LIVE]",
            DeploymentMode::Testing => "[TEST]",
            DeploymentMode::DevelopmentUiTestApi => "['DEV Ui' & 'TEST Api']",
            DeploymentMode::Development => "[DEV]",
        };
        Ok(Banner {
            caption: format!("{} | '{}' | {}", tag, mode, heading),
            visible: true,
        })
    }

    fn catalog_heading(&self, mode: DeploymentMode) -> String {
        let catalogs: Vec<String> = self
            .runtime
            .connection_names()
            .iter()
            .map(|name| catalog_name(name, mode))
            .collect();
        format!("MsSql : {}", catalogs.join(" "))
    }

    /// A multi-line description of the host and process.
    pub fn environment_info(&self) -> String {
        let machine = host_name().unwrap_or_else(|| "unknown".to_string());
        let user = ["USER", "USERNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .unwrap_or_else(|| "unknown".to_string());
        let executable = self
            .probe()
            .executable_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let current_dir = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        [
            format!("Machine name: {}", machine),
            format!("User: {}", user),
            format!(
                "OS: {} ({})",
                System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
                std::env::consts::ARCH
            ),
            format!("Process id: {}", std::process::id()),
            format!("Executable: {}", executable),
            format!("Current directory: {}", current_dir),
            format!(
                "Local time: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S %:z")
            ),
            format!(
                "UTC time: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
            ),
        ]
        .join("\n")
    }

    /// The executable's file stem, or the crate name when unknown.
    pub fn app_name(&self) -> String {
        self.probe()
            .executable_path()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
    }

    /// Whether `port` can be bound on the API address (`api`) or the UI
    /// address of the current mode.
    pub fn is_port_available(&self, port: u16, api: bool) -> Result<bool> {
        let ip = if api { self.api_ip()? } else { self.ui_ip()? };
        match TcpListener::bind((ip, port)) {
            Ok(_) => {
                tracing::debug!("Port {} is available on {}", port, ip);
                Ok(true)
            }
            Err(e) => {
                tracing::info!("Port {} is not available on {}: {}", port, ip, e);
                Ok(false)
            }
        }
    }
}

impl fmt::Debug for OpenEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenEnv")
            .field("settings", &self.settings)
            .field("store", &self.store)
            .field("resolver", &self.resolver)
            .field("runtime", &self.runtime)
            .finish()
    }
}
