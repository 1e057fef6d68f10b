// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime base URL and named connection strings.

use crate::domain::{normalize_connection_key, UrlError};
use crate::ports::AddressSource;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// URL used when the API address is applied before any URL was set.
pub const DEFAULT_URL: &str = "http://localhost";

#[derive(Debug, Default)]
struct UrlState {
    url: Option<Url>,
    connection_strings: BTreeMap<String, String>,
}

/// Base URL and connection strings behind one mutex.
///
/// # Examples
///
/// ```rust
/// use openenv::service::RuntimeUrlConfig;
/// use std::io;
/// use std::net::{IpAddr, Ipv4Addr};
///
/// let config = RuntimeUrlConfig::new();
/// let addresses = || -> io::Result<Vec<IpAddr>> { Ok(vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))]) };
/// config.init_url("", &addresses).unwrap();
/// assert_eq!(config.base_url().unwrap().host_str(), Some("10.0.0.5"));
/// ```
#[derive(Debug, Default)]
pub struct RuntimeUrlConfig {
    state: Mutex<UrlState>,
}

impl RuntimeUrlConfig {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, UrlState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets the base URL.
    ///
    /// Blank text derives `http://<address>` from the first non-loopback IPv4
    /// address of the host, falling back to any IPv4 address. Otherwise the
    /// text must be an http or https URL.
    pub fn init_url(&self, text: &str, addresses: &dyn AddressSource) -> Result<(), UrlError> {
        let url = if text.trim().is_empty() {
            let ip = pick_ipv4(addresses)?;
            default_url_for(ip)?
        } else {
            parse_http_url(text.trim())?
        };

        tracing::info!("Base URL set to {}", url);
        self.state().url = Some(url);
        Ok(())
    }

    /// Points the base URL at the API server.
    ///
    /// The scheme, path and an explicit port are kept. When no URL was set,
    /// [`DEFAULT_URL`] is used as the starting point.
    pub fn update_url_with_api_ip(&self, ip: IpAddr) -> Result<(), UrlError> {
        let mut state = self.state();
        let url = with_api_host(state.url.as_ref(), ip)?;
        tracing::debug!("Base URL now {}", url);
        state.url = Some(url);
        Ok(())
    }

    /// Replaces the given connection strings and points the base URL at
    /// `api_ip` under one lock. Nothing changes when the URL host cannot be
    /// replaced.
    pub fn apply_refresh<I>(&self, connection_strings: I, api_ip: IpAddr) -> Result<(), UrlError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut state = self.state();
        let url = with_api_host(state.url.as_ref(), api_ip)?;
        state.connection_strings.extend(connection_strings);
        tracing::debug!("Base URL now {}", url);
        state.url = Some(url);
        Ok(())
    }

    /// The current base URL.
    pub fn base_url(&self) -> Option<Url> {
        self.state().url.clone()
    }

    /// Registers connection strings from raw configuration keys.
    ///
    /// Each key is normalised (token removed, truncated at the first `_`).
    /// When two keys normalise to the same name the first one wins. Returns the
    /// number of names added.
    pub fn load_connections<I, K, V>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut state = self.state();
        let mut added = 0;
        for (raw_key, value) in entries {
            let name = normalize_connection_key(raw_key.as_ref());
            if name.is_empty() {
                tracing::warn!("Ignoring connection entry '{}'", raw_key.as_ref());
                continue;
            }
            if state.connection_strings.contains_key(&name) {
                tracing::debug!(
                    "Connection '{}' already registered; ignoring '{}'",
                    name,
                    raw_key.as_ref()
                );
                continue;
            }
            state.connection_strings.insert(name, value.into());
            added += 1;
        }
        added
    }

    /// Registered connection names, sorted.
    pub fn connection_names(&self) -> Vec<String> {
        self.state().connection_strings.keys().cloned().collect()
    }

    /// The connection string registered under `name`.
    pub fn connection_string(&self, name: &str) -> Option<String> {
        self.state().connection_strings.get(name).cloned()
    }

    /// Replaces (or adds) the connection string for `name`.
    pub fn set_connection_string(&self, name: &str, value: impl Into<String>) {
        self.state()
            .connection_strings
            .insert(name.to_string(), value.into());
    }
}

/// `current` (or [`DEFAULT_URL`]) with its host replaced by `ip`.
fn with_api_host(current: Option<&Url>, ip: IpAddr) -> Result<Url, UrlError> {
    let mut url = match current {
        Some(url) => url.clone(),
        None => parse_http_url(DEFAULT_URL)?,
    };
    url.set_ip_host(ip).map_err(|_| UrlError::InvalidUrl {
        url: url.to_string(),
        reason: "host cannot be replaced".to_string(),
    })?;
    Ok(url)
}

fn pick_ipv4(addresses: &dyn AddressSource) -> Result<IpAddr, UrlError> {
    let candidates = match addresses.local_addresses() {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!("Could not enumerate local addresses: {}", e);
            Vec::new()
        }
    };

    candidates
        .iter()
        .find(|ip| ip.is_ipv4() && !ip.is_loopback())
        .or_else(|| candidates.iter().find(|ip| ip.is_ipv4()))
        .copied()
        .ok_or(UrlError::NoIpv4Address)
}

fn default_url_for(ip: IpAddr) -> Result<Url, UrlError> {
    parse_http_url(&format!("http://{}", ip))
}

fn parse_http_url(text: &str) -> Result<Url, UrlError> {
    let url = Url::parse(text).map_err(|e| UrlError::InvalidUrl {
        url: text.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UrlError::InvalidUrl {
            url: text.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    fn fixed(addresses: Vec<IpAddr>) -> impl AddressSource {
        move || -> io::Result<Vec<IpAddr>> { Ok(addresses.clone()) }
    }

    #[test]
    fn test_blank_url_skips_loopback() {
        let config = RuntimeUrlConfig::new();
        let addresses = fixed(vec![v4(127, 0, 0, 1), v4(10, 0, 0, 5)]);
        config.init_url("", &addresses).unwrap();

        let url = config.base_url().unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("10.0.0.5"));
        assert_eq!(url.as_str(), "http://10.0.0.5/");
    }

    #[test]
    fn test_blank_url_falls_back_to_loopback() {
        let config = RuntimeUrlConfig::new();
        let addresses = fixed(vec![IpAddr::V6(Ipv6Addr::LOCALHOST), v4(127, 0, 0, 1)]);
        config.init_url("  ", &addresses).unwrap();
        assert_eq!(config.base_url().unwrap().host_str(), Some("127.0.0.1"));
    }

    #[test]
    fn test_blank_url_without_ipv4() {
        let config = RuntimeUrlConfig::new();
        let only_v6 = fixed(vec![IpAddr::V6(Ipv6Addr::LOCALHOST)]);
        assert_eq!(config.init_url("", &only_v6), Err(UrlError::NoIpv4Address));

        let failing =
            || -> io::Result<Vec<IpAddr>> { Err(io::Error::new(io::ErrorKind::Other, "no adapters")) };
        assert_eq!(config.init_url("", &failing), Err(UrlError::NoIpv4Address));
        assert!(config.base_url().is_none());
    }

    #[test]
    fn test_explicit_url() {
        let config = RuntimeUrlConfig::new();
        let unused = fixed(Vec::new());
        config.init_url("https://orders.example:8443/api", &unused).unwrap();
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://orders.example:8443/api"
        );

        assert!(matches!(
            config.init_url("ftp://orders.example", &unused),
            Err(UrlError::InvalidUrl { .. })
        ));
        assert!(matches!(
            config.init_url("not a url", &unused),
            Err(UrlError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_update_url_keeps_port_and_path() {
        let config = RuntimeUrlConfig::new();
        let unused = fixed(Vec::new());
        config.init_url("http://orders.example:8080/api", &unused).unwrap();
        config.update_url_with_api_ip(v4(10, 0, 0, 6)).unwrap();
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "http://10.0.0.6:8080/api"
        );
    }

    #[test]
    fn test_update_url_drops_default_port() {
        let config = RuntimeUrlConfig::new();
        let unused = fixed(Vec::new());
        config.init_url("http://orders.example:80", &unused).unwrap();
        config.update_url_with_api_ip(v4(10, 0, 0, 6)).unwrap();
        let url = config.base_url().unwrap();
        assert_eq!(url.port(), None);
        assert_eq!(url.host_str(), Some("10.0.0.6"));
    }

    #[test]
    fn test_update_url_without_url_starts_from_localhost() {
        let config = RuntimeUrlConfig::new();
        config.update_url_with_api_ip(v4(10, 0, 0, 7)).unwrap();
        assert_eq!(config.base_url().unwrap().as_str(), "http://10.0.0.7/");
    }

    #[test]
    fn test_load_connections_first_write_wins() {
        let config = RuntimeUrlConfig::new();
        let added = config.load_connections(vec![
            ("OrdersConnection", "first"),
            ("OrdersConnection_Reporting", "second"),
            ("BillingConnection", "billing"),
        ]);

        assert_eq!(added, 2);
        assert_eq!(
            config.connection_names(),
            vec!["Billing".to_string(), "Orders".to_string()]
        );
        assert_eq!(config.connection_string("Orders").as_deref(), Some("first"));

        config.set_connection_string("Orders", "replaced");
        assert_eq!(
            config.connection_string("Orders").as_deref(),
            Some("replaced")
        );
        assert!(config.connection_string("Inventory").is_none());
    }

    #[test]
    fn test_apply_refresh_updates_strings_and_url_together() {
        let config = RuntimeUrlConfig::new();
        config.load_connections(vec![("OrdersConnection", ""), ("BillingConnection", "")]);

        config
            .apply_refresh(
                vec![("Orders".to_string(), "orders-dev".to_string())],
                v4(10, 0, 0, 7),
            )
            .unwrap();

        assert_eq!(config.connection_string("Orders").as_deref(), Some("orders-dev"));
        assert_eq!(config.connection_string("Billing").as_deref(), Some(""));
        assert_eq!(config.base_url().unwrap().as_str(), "http://10.0.0.7/");
    }
}
