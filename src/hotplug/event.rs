//! # Hotplug Events
//!
//! Plain-data representation of one kernel uevent. The monitor worker converts
//! each `udev::Event` into a [`HotplugEvent`] as soon as it arrives, so the
//! rest of the crate never touches libudev types.

use std::path::PathBuf;

/// Prefix shared by all input event nodes (`event0`, `event1`, ...)
pub const EVENT_NODE_PREFIX: &str = "event";

/// Kernel uevent actions the monitor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    /// Device appeared
    Add,
    /// Device vanished
    Remove,
    /// Anything else (change, bind, unbind, move)
    Other,
}

impl From<udev::EventType> for EventAction {
    fn from(event_type: udev::EventType) -> Self {
        match event_type {
            udev::EventType::Add => Self::Add,
            udev::EventType::Remove => Self::Remove,
            _ => Self::Other,
        }
    }
}

/// One hotplug notification, detached from libudev
///
/// `udev` handles are not `Send` and stay confined to the monitor worker;
/// everything downstream code needs travels in this struct instead.
#[derive(Debug, Clone)]
pub struct HotplugEvent {
    /// What happened to the device
    pub action: EventAction,
    /// Subsystem the device belongs to, when reported
    pub subsystem: Option<String>,
    /// Kernel device name, e.g. `event5` or `js0`
    pub sys_name: String,
    /// Device node under `/dev`, when one exists
    pub devnode: Option<PathBuf>,
}

impl HotplugEvent {
    /// True when the event describes an input event node (`event*`)
    #[must_use]
    pub fn is_event_node(&self) -> bool {
        self.sys_name.starts_with(EVENT_NODE_PREFIX)
    }
}

impl From<&udev::Event> for HotplugEvent {
    fn from(event: &udev::Event) -> Self {
        Self {
            action: event.event_type().into(),
            subsystem: event.subsystem().map(|s| s.to_string_lossy().into_owned()),
            sys_name: event.sysname().to_string_lossy().into_owned(),
            devnode: event.devnode().map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_event(sys_name: &str) -> HotplugEvent {
        HotplugEvent {
            action: EventAction::Add,
            subsystem: Some("input".to_string()),
            sys_name: sys_name.to_string(),
            devnode: None,
        }
    }

    #[test]
    fn test_event_node_prefix_matches() {
        assert!(add_event("event0").is_event_node());
        assert!(add_event("event12").is_event_node());
    }

    #[test]
    fn test_non_event_nodes_rejected() {
        assert!(!add_event("js0").is_event_node());
        assert!(!add_event("mouse1").is_event_node());
        assert!(!add_event("mice").is_event_node());
    }

    #[test]
    fn test_action_from_udev_event_type() {
        assert_eq!(EventAction::from(udev::EventType::Add), EventAction::Add);
        assert_eq!(
            EventAction::from(udev::EventType::Remove),
            EventAction::Remove
        );
        assert_eq!(
            EventAction::from(udev::EventType::Change),
            EventAction::Other
        );
        assert_eq!(EventAction::from(udev::EventType::Bind), EventAction::Other);
    }
}
