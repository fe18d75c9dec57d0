//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXCONVERT_CONFIG` (environment variable)
//! 2. `~/.config/mboxconvert/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxconvert\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::convert::ConvertOptions;
use crate::export::ExportOptions;
use crate::model::format::FormatSelection;
use crate::parser::archive::ParseOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Export defaults.
    pub export: ExportConfig,
    /// Archive parsing limits.
    pub parser: ParserConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Formats produced when none is requested explicitly.
    pub formats: FormatSelection,
    /// CSV field separator character (must be ASCII).
    pub csv_separator: char,
    /// Write a UTF-8 BOM at the start of CSV output.
    pub csv_bom: bool,
    /// Worksheet name in the Excel export.
    pub sheet_name: String,
    /// Maximum Excel column width, in characters.
    pub max_column_width: usize,
    /// Width of the separator rules in the text export.
    pub text_rule_width: usize,
    /// Maximum length of the output file base name.
    pub max_filename_len: usize,
}

/// Archive parsing limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum message size in bytes (default: 268435456 = 256 MB).
    pub max_message_size: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        let defaults = ExportOptions::default();
        Self {
            formats: FormatSelection::all(),
            csv_separator: char::from(defaults.csv_separator),
            csv_bom: defaults.csv_bom,
            sheet_name: defaults.sheet_name,
            max_column_width: defaults.max_column_width,
            text_rule_width: defaults.text_rule_width,
            max_filename_len: defaults.max_filename_len,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_message_size: ParseOptions::default().max_message_size,
        }
    }
}

// ── Conversion to library options ───────────────────────────────

impl Config {
    /// Build the pipeline options described by this configuration.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            parse: ParseOptions {
                max_message_size: self.parser.max_message_size,
            },
            export: self.export.export_options(),
        }
    }
}

impl ExportConfig {
    fn export_options(&self) -> ExportOptions {
        let csv_separator = if self.csv_separator.is_ascii() {
            self.csv_separator as u8
        } else {
            tracing::warn!(
                separator = %self.csv_separator,
                "CSV separator must be ASCII, using ','"
            );
            b','
        };
        ExportOptions {
            csv_separator,
            csv_bom: self.csv_bom,
            sheet_name: self.sheet_name.clone(),
            max_column_width: self.max_column_width,
            text_rule_width: self.text_rule_width,
            max_filename_len: self.max_filename_len,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MBOXCONVERT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mboxconvert").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxconvert")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mboxconvert.log")
}
