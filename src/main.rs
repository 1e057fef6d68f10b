// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use openenv::adapters::cli::{run, Cli};
use openenv::domain::Settings;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli, settings(), &mut std::io::stdout()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "env")]
fn settings() -> Settings {
    openenv::adapters::EnvSettingsAdapter::new().settings()
}

#[cfg(not(feature = "env"))]
fn settings() -> Settings {
    Settings::default()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
