//! Shared error model and configuration for markstream.
//!
//! This crate is the foundation depended on by the other markstream crates.
//! It provides:
//! - [`MarkstreamError`] for the unified error type
//! - Configuration ([`AppConfig`], [`RenderConfig`], config loading)

pub mod config;
pub mod error;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LimitsConfig, RenderConfig, RendererConfig, StreamConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{MarkstreamError, Result};
