//! # Gamepad Attach Workflow
//!
//! Orchestration that turns a raw hotplug notification into a woken,
//! calibrated gamepad.
//!
//! This module handles:
//! - Matching attach events to the configured USB signature
//! - The vendor wake handshake and settle delay
//! - Joystick node resolution and calibration
//! - Attach/detach notifications for the application

pub mod calibrate;
mod init;

pub use calibrate::{CalibrationRunner, ScriptRunner};
pub use init::{GamepadInitializer, GamepadTarget};

use std::path::PathBuf;

/// Application-facing lifecycle notification
///
/// Sent from the monitor worker once an attach fully completes or any input
/// device goes away. Nothing is sent for attach attempts that fail partway;
/// a device that never became usable is not reported as attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GamepadNotification {
    /// A gamepad finished the wake and calibration sequence
    Attached {
        /// Event node that announced the device
        sys_name: String,
        /// Joystick node handed to calibration
        joystick: PathBuf,
    },
    /// An input device went away
    Detached {
        /// Kernel name of the removed node
        sys_name: String,
    },
}
