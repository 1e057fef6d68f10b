// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer.
//!
//! This module wires the domain rules to the ports: the configuration store,
//! the deployment mode resolver, connection strings and base URL, network
//! share sessions, the clone pipeline, and the [`OpenEnv`] context that ties
//! them together.

pub mod clone_pipeline;
pub mod config_store;
pub mod connections;
pub mod context;
pub mod resolver;
pub mod runtime_url;
pub mod share_session;

// Re-export commonly used types
pub use clone_pipeline::{
    steps, CancellationFlag, ClonePipeline, ClonePipelineBuilder, Clock, ProgressCallback,
};
pub use config_store::{ConfigPayload, ConfigStore};
pub use connections::{authorize_catalog, connection_descriptor_for_db, current_db_config};
pub use context::{Banner, ModeListener, OpenEnv};
pub use resolver::EnvironmentResolver;
pub use runtime_url::{RuntimeUrlConfig, DEFAULT_URL};
pub use share_session::NetworkShareSession;
