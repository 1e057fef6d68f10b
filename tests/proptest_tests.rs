// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property-based tests using proptest.
//!
//! These tests check the naming rules and the resolution table against
//! arbitrary inputs.

use openenv::adapters::JsonParser;
use openenv::domain::{
    catalog_name, normalize_connection_key, DeploymentMode, EnvironmentEntry,
    EnvironmentsDocument, HostSignals, NetworkCredentials, SqlCredentials,
};
use openenv::ports::ConfigParser;
use proptest::prelude::*;
use std::net::Ipv4Addr;

fn any_mode() -> impl Strategy<Value = DeploymentMode> {
    prop::sample::select(DeploymentMode::ALL.to_vec())
}

fn any_signals() -> impl Strategy<Value = HostSignals> {
    prop::array::uniform5(prop::bool::ANY).prop_map(|[app, primary, marker, dev, debugger]| {
        HostSignals {
            app_package_deployed: app,
            primary_os: primary,
            production_marker: marker,
            dev_ui_test_api: dev,
            debugger_attached: debugger,
        }
    })
}

// Catalog names keep the database name and end with the mode's suffix
proptest! {
    #[test]
    fn test_catalog_name_appends_suffix(db in "[A-Za-z][A-Za-z0-9_]{0,20}", mode in any_mode()) {
        let catalog = catalog_name(&db, mode);
        prop_assert!(catalog.starts_with(db.as_str()));
        prop_assert!(catalog.ends_with(mode.catalog_suffix()));
        prop_assert_eq!(catalog.len(), db.len() + mode.catalog_suffix().len());
    }
}

// The token and anything after the first underscore are dropped
proptest! {
    #[test]
    fn test_normalize_connection_key_recovers_database(
        db in "[A-Za-z][A-Za-z0-9]{0,20}",
        suffix in prop::option::of("[A-Za-z0-9_]{0,10}"),
    ) {
        prop_assume!(!db.contains("Connection"));
        let raw = match &suffix {
            Some(suffix) => format!("{}Connection_{}", db, suffix),
            None => format!("{}Connection", db),
        };
        prop_assert_eq!(normalize_connection_key(&raw), db);
    }
}

// Normalising twice changes nothing
proptest! {
    #[test]
    fn test_normalize_connection_key_is_idempotent(raw in "[A-Za-z0-9_]{0,30}") {
        let once = normalize_connection_key(&raw);
        prop_assume!(!once.contains("Connection"));
        prop_assert_eq!(normalize_connection_key(&once), once.clone());
    }
}

// Resolution follows the ordered rules for every combination of signals
proptest! {
    #[test]
    fn test_resolution_rules(signals in any_signals()) {
        let mode = DeploymentMode::resolve(&signals);

        if signals.app_package_deployed {
            prop_assert_eq!(mode, DeploymentMode::Production);
        } else if signals.primary_os && signals.production_marker {
            prop_assert_eq!(mode, DeploymentMode::Production);
        } else if signals.dev_ui_test_api {
            prop_assert_eq!(mode, DeploymentMode::DevelopmentUiTestApi);
        } else if signals.debugger_attached {
            prop_assert_eq!(mode, DeploymentMode::Development);
        } else if signals.primary_os {
            prop_assert_eq!(mode, DeploymentMode::Testing);
        } else {
            prop_assert_eq!(mode, DeploymentMode::Production);
        }
    }
}

// Only the override produces the mixed mode, and it never overrides production signals
proptest! {
    #[test]
    fn test_dev_ui_test_api_requires_override(signals in any_signals()) {
        let mode = DeploymentMode::resolve(&signals);
        if mode == DeploymentMode::DevelopmentUiTestApi {
            prop_assert!(signals.dev_ui_test_api);
            prop_assert!(!signals.app_package_deployed);
        }
    }
}

fn any_entry() -> impl Strategy<Value = EnvironmentEntry> {
    (
        any::<[u8; 4]>(),
        "[a-z]{1,8}",
        "[ -~]{0,12}",
        "[a-z]{1,8}",
        "[A-Z]{0,6}",
        "(\\\\\\\\[a-z0-9]{1,8}\\\\[A-Za-z]{1,8})?",
    )
        .prop_map(|(ip, sql_user, password, net_user, domain, backup)| EnvironmentEntry {
            server_ip: Ipv4Addr::from(ip).to_string(),
            sql_credentials: SqlCredentials {
                username: sql_user,
                password: password.clone(),
            },
            network_credentials: NetworkCredentials {
                username: net_user,
                password,
                domain,
            },
            backup_location: backup,
        })
}

// A serialised document parses back to the same entries
proptest! {
    #[test]
    fn test_document_round_trip(
        environments in prop::collection::btree_map("[A-Z][a-z]{2,10}", any_entry(), 1..4)
    ) {
        let document = EnvironmentsDocument { environments };
        let json = serde_json::to_string(&document).unwrap();
        let parsed = JsonParser::new().parse(&json).unwrap();
        prop_assert_eq!(&parsed, &document);
        for (key, entry) in &parsed.environments {
            prop_assert!(entry.server_addr(key).is_ok());
        }
    }
}
