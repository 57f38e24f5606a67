//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Environment variable naming an alternative configuration file
pub const CONFIG_ENV: &str = "PADWAKE_CONFIG";

/// Configuration file used when the environment variable is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub gamepad: GamepadConfig,
    pub calibration: CalibrationConfig,
    pub monitor: MonitorConfig,
}

/// Target gamepad configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GamepadConfig {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    #[serde(default = "default_product_id")]
    pub product_id: u16,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Calibration subprocess configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    #[serde(default = "default_calibration_program")]
    pub program: String,

    #[serde(default = "default_fallback_node")]
    pub fallback_node: String,

    #[serde(default = "default_calibration_timeout_s")]
    pub timeout_s: u64,
}

/// Hotplug monitor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

// Default value functions
fn default_vendor_id() -> u16 { 0x045e }
fn default_product_id() -> u16 { 0x028e }
fn default_settle_ms() -> u64 { 1000 }

fn default_calibration_program() -> String { "/bin/xbox_gamepad_calibrate.sh".to_string() }
fn default_fallback_node() -> String { "/dev/input/js0".to_string() }
fn default_calibration_timeout_s() -> u64 { 30 }

fn default_poll_interval_ms() -> u64 { 250 }

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            program: default_calibration_program(),
            fallback_node: default_fallback_node(),
            timeout_s: default_calibration_timeout_s(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gamepad: GamepadConfig::default(),
            calibration: CalibrationConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use padwake::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the conventional locations
    ///
    /// `$PADWAKE_CONFIG` wins when set; otherwise `config/default.toml` is
    /// used when present; built-in defaults apply without any file.
    ///
    /// # Errors
    ///
    /// Returns error if the chosen file cannot be loaded or fails validation.
    pub fn discover() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(path);
        }
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Self::load(DEFAULT_CONFIG_PATH);
        }
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Pause between the wake handshake and joystick resolution
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.gamepad.settle_ms)
    }

    /// Wall-clock budget for one calibration run
    #[must_use]
    pub fn calibration_timeout(&self) -> Duration {
        Duration::from_secs(self.calibration.timeout_s)
    }

    /// Bounded wait used by the monitor poll loop
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.poll_interval_ms)
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate the USB signature
        if self.gamepad.vendor_id == 0 {
            return Err(crate::error::PadwakeError::Config(
                toml::de::Error::custom("vendor_id cannot be zero")
            ));
        }

        if self.gamepad.product_id == 0 {
            return Err(crate::error::PadwakeError::Config(
                toml::de::Error::custom("product_id cannot be zero")
            ));
        }

        // Validate timing fields
        if self.gamepad.settle_ms > 10000 {
            return Err(crate::error::PadwakeError::Config(
                toml::de::Error::custom("settle_ms must be at most 10000")
            ));
        }

        if self.calibration.timeout_s == 0 || self.calibration.timeout_s > 600 {
            return Err(crate::error::PadwakeError::Config(
                toml::de::Error::custom("timeout_s must be between 1 and 600")
            ));
        }

        if self.monitor.poll_interval_ms < 10 || self.monitor.poll_interval_ms > 5000 {
            return Err(crate::error::PadwakeError::Config(
                toml::de::Error::custom("poll_interval_ms must be between 10 and 5000")
            ));
        }

        // Validate paths
        if self.calibration.program.is_empty() {
            return Err(crate::error::PadwakeError::Config(
                toml::de::Error::custom("calibration program cannot be empty")
            ));
        }

        if self.calibration.fallback_node.is_empty() {
            return Err(crate::error::PadwakeError::Config(
                toml::de::Error::custom("fallback_node cannot be empty")
            ));
        }

        Ok(())
    }
}
