// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection descriptors for the current deployment mode, and the guard that
//! keeps live catalogs away from non-production hosts.

use crate::domain::{
    catalog_name, AuthorizationError, ConfigError, ConnectionDescriptor, DbConfig, DeploymentMode,
};
use crate::ports::HostProbe;
use crate::service::ConfigStore;

/// The configuration of `db_name` in the environment that serves `mode`.
pub fn current_db_config(
    store: &ConfigStore,
    mode: DeploymentMode,
    db_name: &str,
) -> Result<DbConfig, ConfigError> {
    let entry = store.get_entry(mode.config_key())?;
    Ok(DbConfig::new(db_name, entry))
}

/// The descriptor opening `db_name`'s catalog for `mode`.
///
/// ```rust
/// use openenv::domain::DeploymentMode;
/// use openenv::service::{connection_descriptor_for_db, ConfigPayload, ConfigStore};
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
/// let descriptor = connection_descriptor_for_db(&store, DeploymentMode::Testing, "Orders").unwrap();
/// assert_eq!(descriptor.initial_catalog, "Orders_Test");
/// assert_eq!(descriptor.data_source, "10.0.0.6");
/// ```
pub fn connection_descriptor_for_db(
    store: &ConfigStore,
    mode: DeploymentMode,
    db_name: &str,
) -> Result<ConnectionDescriptor, ConfigError> {
    let db_config = current_db_config(store, mode, db_name)?;
    Ok(ConnectionDescriptor::build(
        &db_config,
        &catalog_name(db_name, mode),
    ))
}

/// Refuses live catalogs on hosts without the production marker.
///
/// With `allow_production_override` nothing is checked. A debugger attached
/// to a production process is reported but not refused.
pub fn authorize_catalog(
    probe: &dyn HostProbe,
    mode: DeploymentMode,
    catalog: &str,
    allow_production_override: bool,
) -> Result<(), AuthorizationError> {
    if mode != DeploymentMode::Production {
        return Ok(());
    }

    if probe.debugger_attached() {
        tracing::warn!(
            "Debugger attached to a production process; connecting to live catalog {}",
            catalog
        );
    }

    if allow_production_override {
        tracing::debug!("Production guard overridden for {}", catalog);
        return Ok(());
    }

    if !probe.production_marker_exists() {
        return Err(AuthorizationError::UnauthorizedProductionAccess {
            catalog: catalog.to_string(),
            marker: probe.production_marker().to_path_buf(),
        });
    }

    Ok(())
}
