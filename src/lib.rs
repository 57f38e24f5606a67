//! # padwake Library
//!
//! Wake and calibrate an Xbox gamepad when it is hot-plugged.
//!
//! This library provides the building blocks of the padwake daemon: a udev
//! hotplug monitor, USB signature matching with the vendor wake handshake,
//! sysfs correlation between event and joystick nodes, and the calibration
//! trigger.

pub mod config;
pub mod error;
pub mod gamepad;
pub mod hotplug;
pub mod sysfs;
pub mod usb;
