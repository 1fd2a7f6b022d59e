//! Application configuration for markstream.
//!
//! User config lives at `~/.markstream/markstream.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MarkstreamError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "markstream.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".markstream";

// ---------------------------------------------------------------------------
// Config structs (matching markstream.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Renderer tuning.
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Simulated upstream stream settings (CLI only).
    #[serde(default)]
    pub stream: StreamConfig,

    /// Host-side input limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// `[renderer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Characters an unterminated line may hold before it is force-dispatched.
    #[serde(default = "default_line_flush_threshold")]
    pub line_flush_threshold: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            line_flush_threshold: default_line_flush_threshold(),
        }
    }
}

fn default_line_flush_threshold() -> usize {
    80
}

/// `[stream]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Characters per simulated upstream chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pause between simulated chunks, in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            delay_ms: 0,
        }
    }
}

fn default_chunk_size() -> usize {
    16
}

/// `[limits]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of simultaneously open list frames.
    #[serde(default = "default_max_list_depth")]
    pub max_list_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_list_depth: default_max_list_depth(),
        }
    }
}

fn default_max_list_depth() -> usize {
    32
}

// ---------------------------------------------------------------------------
// Render config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime renderer configuration, merged from config file + CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Force-dispatch threshold for unterminated lines, in characters.
    pub line_flush_threshold: usize,
    /// Nesting ceiling enforced by the bounded renderer.
    pub max_list_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RenderConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            line_flush_threshold: config.renderer.line_flush_threshold,
            max_list_depth: config.limits.max_list_depth,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.markstream/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MarkstreamError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.markstream/markstream.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MarkstreamError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MarkstreamError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MarkstreamError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MarkstreamError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MarkstreamError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject settings the stream driver cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.stream.chunk_size == 0 {
        return Err(MarkstreamError::validation(
            "stream.chunk_size must be at least 1",
        ));
    }
    if config.limits.max_list_depth == 0 {
        return Err(MarkstreamError::validation(
            "limits.max_list_depth must be at least 1",
        ));
    }
    Ok(())
}
