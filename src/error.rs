//! # Error Types
//!
//! Custom error types for padwake using `thiserror`, one enum per failure
//! domain so callers can match on exactly the failures an operation can hit.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Hotplug monitor errors
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Establishing the udev subscription failed
    #[error("hotplug subscription failed: {0}")]
    Subscribe(#[source] std::io::Error),

    /// Waiting on the monitor socket failed
    #[error("hotplug poll failed: {0}")]
    Poll(#[source] std::io::Error),

    /// The monitor worker thread could not be spawned
    #[error("monitor worker spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
}

/// USB discovery and control transfer errors
#[derive(Debug, Error)]
pub enum UsbError {
    /// Underlying USB transport failure
    #[error("USB transport error: {0}")]
    Transport(#[from] rusb::Error),

    /// The device disappeared between discovery and use
    #[error("USB device vanished before it could be opened")]
    DeviceGone,
}

/// Device path resolution errors
#[derive(Debug, Error)]
pub enum SysfsError {
    /// A sysfs path could not be canonicalized
    #[error("failed to resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Calibration subprocess errors
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// The calibration program could not be started
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    /// The calibration program exited with a failure status
    #[error("calibration exited with {0}")]
    Failed(std::process::ExitStatus),

    /// Waiting on the calibration process failed
    #[error("failed to monitor calibration process: {0}")]
    Wait(#[source] std::io::Error),

    /// The calibration program exceeded its time budget and was killed
    #[error("calibration timed out after {0:?}")]
    TimedOut(Duration),
}

/// Any failure inside the attach workflow
///
/// Each attach event is handled in isolation; errors of this type are logged
/// and dropped so the monitor loop keeps serving subsequent events. Path
/// resolution never lands here; an unresolved joystick falls back to the
/// configured node instead.
#[derive(Debug, Error)]
pub enum AttachError {
    /// USB discovery or wake handshake failed
    #[error(transparent)]
    Usb(#[from] UsbError),

    /// Calibration failed
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// Main error type for padwake
#[derive(Debug, Error)]
pub enum PadwakeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Hotplug monitor startup errors
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),
}

/// Result type alias for padwake
pub type Result<T> = std::result::Result<T, PadwakeError>;
