//! # Device Path Resolution
//!
//! Correlates the input nodes of one physical gamepad by walking sysfs.
//!
//! A USB gamepad shows up as several logical nodes at once: an event node
//! (`/dev/input/event5`), a joystick node (`/dev/input/js0`) and their sysfs
//! class entries. The only reliable link between them is the physical device
//! directory they all point at, so resolution always goes through
//! `/sys/class/input/<name>/device` and compares canonical paths.
//!
//! Topology can change between any two events, so nothing here is cached;
//! every lookup re-reads the filesystem.

use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::error::SysfsError;
use crate::usb::GamepadHandle;

/// Prefix shared by all joystick nodes (`js0`, `js1`, ...)
pub const JOYSTICK_NODE_PREFIX: &str = "js";

/// Resolves an input node to its sibling joystick and owning USB interface
pub trait PathResolver {
    /// `/dev` node of the joystick backed by the same physical device as
    /// `event_sys_name`, or `None` when no joystick shares that identity
    fn sibling_joystick_node(&self, event_sys_name: &str) -> Option<PathBuf>;

    /// Name of the `input*` directory under the USB interface of `handle`
    /// that lists `input_node_name` among its children
    ///
    /// Used to confirm that a vendor/product match really is the device that
    /// raised the event, instead of a second identical unit on another port.
    fn input_interface_name(&self, handle: &GamepadHandle, input_node_name: &str)
        -> Option<String>;
}

/// Production resolver rooted at the real sysfs/devfs mount points
///
/// The roots are injectable so tests can point the same logic at a synthetic
/// tree under a temporary directory.
#[derive(Debug, Clone)]
pub struct SysfsResolver {
    class_input: PathBuf,
    dev_input: PathBuf,
    usb_devices: PathBuf,
}

impl SysfsResolver {
    /// Create a resolver over the real system paths
    #[must_use]
    pub fn new() -> Self {
        Self::with_roots("/sys/class/input", "/dev/input", "/sys/bus/usb/devices")
    }

    /// Create a resolver over custom roots
    #[must_use]
    pub fn with_roots(
        class_input: impl Into<PathBuf>,
        dev_input: impl Into<PathBuf>,
        usb_devices: impl Into<PathBuf>,
    ) -> Self {
        Self {
            class_input: class_input.into(),
            dev_input: dev_input.into(),
            usb_devices: usb_devices.into(),
        }
    }

    /// Canonical path identifying the physical device behind `sys_name`
    ///
    /// # Errors
    ///
    /// Returns [`SysfsError::Resolve`] when the class entry does not exist,
    /// which happens routinely when the device is unplugged between the
    /// notification and this lookup.
    pub fn physical_identity(&self, sys_name: &str) -> Result<PathBuf, SysfsError> {
        let class_entry = self.class_input.join(sys_name).join("device");
        fs::canonicalize(&class_entry).map_err(|source| SysfsError::Resolve {
            path: class_entry,
            source,
        })
    }

    /// Joystick node names under the dev root, sorted for a deterministic pick
    fn joystick_names(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.dev_input) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Cannot list {}: {}", self.dev_input.display(), err);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(JOYSTICK_NODE_PREFIX))
            .collect();
        names.sort();
        names
    }
}

impl Default for SysfsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver for SysfsResolver {
    fn sibling_joystick_node(&self, event_sys_name: &str) -> Option<PathBuf> {
        let target = match self.physical_identity(event_sys_name) {
            Ok(identity) => identity,
            Err(err) => {
                debug!("No physical identity for {}: {}", event_sys_name, err);
                return None;
            }
        };

        for name in self.joystick_names() {
            match self.physical_identity(&name) {
                Ok(identity) if identity == target => {
                    return Some(self.dev_input.join(name));
                }
                Ok(_) => {}
                Err(err) => debug!("Skipping {}: {}", name, err),
            }
        }
        None
    }

    fn input_interface_name(
        &self,
        handle: &GamepadHandle,
        input_node_name: &str,
    ) -> Option<String> {
        // Devices behind hubs get dotted port paths; only root-port devices
        // resolve here.
        let interface_dir = self
            .usb_devices
            .join(format!("{}-{}:1.0", handle.bus_number, handle.port_number))
            .join("input");

        let entries = fs::read_dir(&interface_dir).ok()?;
        let mut interfaces: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("input"))
            .collect();
        interfaces.sort();

        for interface in interfaces {
            let children = match fs::read_dir(interface_dir.join(&interface)) {
                Ok(children) => children,
                Err(_) => continue,
            };
            let listed = children
                .filter_map(|entry| entry.ok())
                .any(|entry| entry.file_name() == input_node_name);
            if listed {
                return Some(interface);
            }
        }
        None
    }
}
