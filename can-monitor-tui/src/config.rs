//! Display tuning configuration
//!
//! The required inputs (channel, layout files) live on the CLI; this
//! optional TOML file only tunes the display.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Application configuration (loaded from an optional TOML file)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ui: UiConfig,
}

/// Display tuning knobs
#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// Title shown in the top status bar
    #[serde(default = "default_title")]
    pub title: String,

    /// Key poll timeout per render tick, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Upper bound on renderable rows; the scroll offset is clamped
    /// against this, independent of how many ids are live
    #[serde(default = "default_virtual_height")]
    pub virtual_height: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            tick_ms: default_tick_ms(),
            virtual_height: default_virtual_height(),
        }
    }
}

fn default_title() -> String {
    "can-monitor".to_string()
}

fn default_tick_ms() -> u64 {
    100
}

fn default_virtual_height() -> usize {
    5000
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
