// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line front end.
//!
//! Options given on the command line override the settings read from the
//! environment.

use crate::adapters::JsonFileSource;
use crate::domain::{DeploymentMode, Result, Settings};
use crate::service::{ConfigPayload, OpenEnv};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// Application name used for the default configuration location.
const APP_NAME: &str = "openenv";
/// Qualifier used for the default configuration location.
const APP_QUALIFIER: &str = "org.openenv";

/// Command-line arguments.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use openenv::adapters::Cli;
///
/// let cli = Cli::try_parse_from(["openenv", "--config", "env.json", "resolve"]).unwrap();
/// assert_eq!(cli.config.unwrap().to_str(), Some("env.json"));
/// ```
#[derive(Debug, Parser)]
#[command(name = "openenv")]
#[command(version)]
#[command(about = "Resolve the deployment environment and clone databases between environments", long_about = None)]
pub struct Cli {
    /// Environment configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Production marker file
    #[arg(long, global = true)]
    pub production_marker: Option<PathBuf>,

    /// Run the development UI against the testing API
    #[arg(long, global = true)]
    pub dev_ui_test_api: bool,

    /// Base URL (blank derives one from the host address)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the deployment mode and the addresses it selects
    #[clap(visible_alias = "r")]
    Resolve,
    /// Print the connection string for a logical name such as OrdersConnection
    #[clap(visible_alias = "c")]
    Connection {
        /// Logical connection name
        name: String,
        /// Allow live catalogs on hosts without the production marker
        #[arg(long)]
        allow_production: bool,
    },
    /// Print the environment banner
    #[clap(visible_alias = "b")]
    Banner {
        /// Logical connection names shown in the banner
        names: Vec<String>,
    },
    /// Print a description of the host and process
    Info,
    /// Back up a database in one environment and restore it in another
    #[cfg(feature = "mssql")]
    Clone {
        /// Database name without the environment suffix
        database: String,
        /// Source deployment mode
        #[arg(long, value_parser = parse_mode)]
        from: DeploymentMode,
        /// Destination deployment mode
        #[arg(long, value_parser = parse_mode)]
        to: DeploymentMode,
    },
}

/// Parses a deployment mode name (case-insensitive) or display number.
pub fn parse_mode(value: &str) -> std::result::Result<DeploymentMode, String> {
    if let Ok(number) = value.parse::<u8>() {
        if let Some(mode) = DeploymentMode::ALL.into_iter().find(|m| m.number() == number) {
            return Ok(mode);
        }
    }
    DeploymentMode::from_name(value).ok_or_else(|| {
        let names: Vec<&str> = DeploymentMode::ALL.iter().map(|m| m.name()).collect();
        format!("unknown mode '{}', expected one of {}", value, names.join(", "))
    })
}

impl Cli {
    /// Overlays the command-line options onto `settings`.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(config) = &self.config {
            settings.config_path = Some(config.clone());
        }
        if let Some(marker) = &self.production_marker {
            settings.production_marker = marker.clone();
        }
        if self.dev_ui_test_api {
            settings.dev_ui_test_api = true;
        }
        if let Some(url) = &self.url {
            settings.url = Some(url.clone());
        }
        settings
    }
}

fn config_path(settings: &Settings) -> Result<PathBuf> {
    match &settings.config_path {
        Some(path) => Ok(path.clone()),
        None => Ok(JsonFileSource::from_default_location(APP_NAME, APP_QUALIFIER)?
            .file_path()
            .to_path_buf()),
    }
}

/// Runs `cli` with `settings` as the base, writing results to `out`.
pub fn run<W: Write>(cli: Cli, settings: Settings, out: &mut W) -> Result<()> {
    let settings = cli.apply(settings);
    let path = config_path(&settings)?;
    tracing::debug!("Using configuration {}", path.display());

    let env = OpenEnv::new(settings);
    let mode = env.initialise(ConfigPayload::File(path))?;

    match cli.command {
        Command::Resolve => {
            writeln!(out, "mode: {} ({})", mode, mode.number())?;
            writeln!(out, "environment: {}", mode.environment_key())?;
            writeln!(out, "api: {}", env.api_ip()?)?;
            writeln!(out, "ui: {}", env.ui_ip()?)?;
            if let Some(url) = env.runtime().base_url() {
                writeln!(out, "url: {}", url)?;
            }
        }
        Command::Connection {
            name,
            allow_production,
        } => {
            writeln!(out, "{}", env.obtain_connection_string(&name, allow_production)?)?;
        }
        Command::Banner { names } => {
            env.register_connections(names.iter().map(|name| (name.as_str(), "")))?;
            let banner = env.banner()?;
            let visibility = if banner.visible { "" } else { " (hidden)" };
            writeln!(out, "{}{}", banner, visibility)?;
        }
        Command::Info => {
            writeln!(out, "{}", env.environment_info())?;
        }
        #[cfg(feature = "mssql")]
        Command::Clone { database, from, to } => {
            clone_database(&env, &database, from, to, out)?;
        }
    }
    Ok(())
}

#[cfg(feature = "mssql")]
fn clone_database<W: Write>(
    env: &OpenEnv,
    database: &str,
    from: DeploymentMode,
    to: DeploymentMode,
    out: &mut W,
) -> Result<()> {
    use crate::adapters::{LocalShareConnector, SqlServerConnector};
    use crate::service::{CancellationFlag, ClonePipeline};
    use std::sync::Arc;

    let pipeline = ClonePipeline::builder(
        Arc::new(SqlServerConnector::new()?),
        Arc::new(LocalShareConnector::new()),
    )
    .retry_policy(env.settings().retry)
    .on_progress(|progress| tracing::info!(stage = %progress.stage, "{}", progress.message))
    .build();

    let mut job = env.clone_job(database, from, to)?;
    let report = pipeline.clone(&mut job, &CancellationFlag::new())?;
    writeln!(
        out,
        "restored {} from {} ({} copy attempt(s))",
        job.destination.database_name, report.destination_backup_path, report.copy_attempts
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"Environments":{
        "Testing":{"ServerIP":"10.0.0.6",
            "SqlCredentials":{"Username":"sa","Password":"test"},
            "NetworkCredentials":{"Username":"svc","Password":"pw"}},
        "Development":{"ServerIP":"10.0.0.7",
            "SqlCredentials":{"Username":"sa","Password":"dev"},
            "NetworkCredentials":{"Username":"svc","Password":"pw"}}}}"#;

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("testing"), Ok(DeploymentMode::Testing));
        assert_eq!(parse_mode("4"), Ok(DeploymentMode::DevelopmentUiTestApi));
        assert!(parse_mode("staging").is_err());
        assert!(parse_mode("9").is_err());
    }

    #[test]
    fn test_apply_overrides_settings() {
        let cli = Cli::try_parse_from([
            "openenv",
            "connection",
            "OrdersConnection",
            "--dev-ui-test-api",
            "--url",
            "http://orders.example",
        ])
        .unwrap();
        let settings = cli.apply(Settings::default());
        assert!(settings.dev_ui_test_api);
        assert_eq!(settings.url.as_deref(), Some("http://orders.example"));
        assert!(settings.config_path.is_none());
        assert!(matches!(
            cli.command,
            Command::Connection { ref name, allow_production: false } if name == "OrdersConnection"
        ));
    }

    #[test]
    fn test_run_prints_connection_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("environments.json");
        std::fs::write(&path, PAYLOAD).unwrap();

        let cli = Cli::try_parse_from([
            "openenv",
            "--config",
            path.to_str().unwrap(),
            "--dev-ui-test-api",
            "--url",
            "http://orders.example:8080",
            "connection",
            "OrdersConnection",
        ])
        .unwrap();

        let mut out = Vec::new();
        run(cli, Settings::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Data Source=10.0.0.6"));
        assert!(text.contains("Initial Catalog=Orders_Dev"));
    }

    #[test]
    fn test_run_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "openenv",
            "--config",
            dir.path().join("missing.json").to_str().unwrap(),
            "resolve",
        ])
        .unwrap();
        let mut out = Vec::new();
        assert!(run(cli, Settings::default(), &mut out).is_err());
        assert!(out.is_empty());
    }
}
