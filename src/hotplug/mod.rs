//! # Hotplug Monitoring Module
//!
//! Watches the kernel's input subsystem for device arrival and removal.
//!
//! This module handles:
//! - Subscribing to udev netlink uevents for subsystem `input`
//! - Converting raw uevents into plain [`HotplugEvent`] data
//! - Driving a [`DeviceHandler`] from a dedicated worker thread

pub mod event;
pub mod monitor;

pub use event::{EventAction, HotplugEvent, EVENT_NODE_PREFIX};
pub use monitor::{
    DeviceHandler, EventSource, HotplugMonitor, MonitorHandle, UdevEventSource, INPUT_SUBSYSTEM,
};
