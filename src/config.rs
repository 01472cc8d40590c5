//! Configuration management for Splotty
//!
//! Application settings live in a TOML file that is loaded at startup. Every
//! section and field has a default, so a partial file (or no file) works.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/splotty/config.toml` |
//! | macOS | `~/Library/Application Support/splotty/config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use splotty::Config;
//!
//! let mut config = Config::load().unwrap_or_default();
//! config.ui.window_size = 500;
//! config.save().expect("Failed to save config");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration and fieldspec loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("Could not determine config directory")]
    NoConfigDir,
    /// IO error reading or writing a config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse a config file
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A fieldspec entry failed validation
    #[error("Invalid entry '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

impl ConfigError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Returns the path to the config file.
///
/// Creates the config directory if it doesn't exist.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join("splotty");

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.toml"))
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Display settings
    #[serde(default)]
    pub ui: UiConfig,
    /// Reserved keys and key decoding
    #[serde(default)]
    pub keys: KeyConfig,
    /// Serial data source
    #[serde(default)]
    pub serial: SerialConfig,
    /// Synthetic fallback source
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Tick rate of the main loop (in Hz)
    pub refresh_rate_hz: u32,
    /// Header height before shrinking
    pub header_rows: u16,
    /// Footer height
    pub footer_rows: u16,
    /// Smallest usable plot height
    pub min_plot_rows: u16,
    /// Columns left of the plot
    pub pad_left: u16,
    /// Columns right of the gutter
    pub pad_right: u16,
    /// Columns reserved right of the plot for the sample counter
    pub gutter_width: u16,
    /// History kept per field for autoranging
    pub window_size: usize,
    /// Print values next to plotted glyphs
    pub inline_numbers: bool,
    /// Color theme (dark/light)
    pub theme: Theme,
    /// Upper bound on data lines ingested in one tick
    pub max_lines_per_tick: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 30,
            header_rows: 2,
            footer_rows: 1,
            min_plot_rows: 3,
            pad_left: 1,
            pad_right: 1,
            gutter_width: 7,
            window_size: 200,
            inline_numbers: false,
            theme: Theme::Dark,
            max_lines_per_tick: 64,
        }
    }
}

/// Color theme options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

/// Reserved UI keys and decoder timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub quit: char,
    pub inline_numbers: char,
    /// How long a partial escape sequence waits for more bytes
    pub escape_timeout_ms: u64,
    /// Pause after reporting shortcut conflicts
    pub conflict_pause_ms: u64,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            quit: 'q',
            inline_numbers: '#',
            escape_timeout_ms: 50,
            conflict_pause_ms: 1000,
        }
    }
}

/// Serial line parity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    #[serde(rename = "N")]
    None,
    #[serde(rename = "E")]
    Even,
    #[serde(rename = "O")]
    Odd,
}

/// Serial device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path; empty selects the synthetic source
    pub device: String,
    pub baud: u32,
    pub parity: Parity,
    pub stopbits: u8,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            baud: 115_200,
            parity: Parity::None,
            stopbits: 1,
        }
    }
}

/// Synthetic generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Time between generated lines
    pub interval_ms: u64,
    /// Number of generated fields
    pub channels: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            channels: 4,
        }
    }
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Sleep between ticks
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.ui.refresh_rate_hz.max(1) as u64)
    }

    pub fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.keys.escape_timeout_ms)
    }

    pub fn conflict_pause(&self) -> Duration {
        Duration::from_millis(self.keys.conflict_pause_ms)
    }

    /// Keys that field and group shortcuts may never take
    pub fn reserved_keys(&self) -> HashSet<char> {
        [self.keys.quit, self.keys.inline_numbers].into_iter().collect()
    }
}
