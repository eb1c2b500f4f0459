//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// External tools invoked by the generated scripts.
    pub tools: ToolsConfig,

    /// Naming used for generated scripts.
    pub scripts: ScriptsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// External binaries the generated scripts call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Media encoder (renders and concatenates videos).
    pub encoder: String,

    /// Media prober (reports output durations).
    pub probe: String,

    /// Metadata writer/reader (stores fingerprints in the Artist tag).
    pub metadata: String,
}

/// Script naming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Name of the orchestration script (written as `export_<name>.bash`).
    pub main_script: String,

    /// Marker replaced by the video title inside variable values and options.
    pub title_placeholder: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "vidgen=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            encoder: "ffmpeg".to_string(),
            probe: "ffprobe".to_string(),
            metadata: "exiftool".to_string(),
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            main_script: "generate".to_string(),
            title_placeholder: "{video_title}".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("vidgen").join("config.json")
}
