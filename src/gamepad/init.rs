//! # Attach Orchestration
//!
//! Sequences one attach event end to end: signature match, interface
//! confirmation, wake handshake, settle delay, joystick resolution,
//! calibration. Every step can fail without taking the monitor loop down;
//! failures are logged and the device is simply left unusable until the
//! user replugs it.

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::calibrate::CalibrationRunner;
use super::GamepadNotification;
use crate::error::AttachError;
use crate::hotplug::{DeviceHandler, HotplugEvent};
use crate::sysfs::PathResolver;
use crate::usb::{ControlRequest, UsbPort};

/// Everything the attach workflow needs to know about its target
#[derive(Debug, Clone)]
pub struct GamepadTarget {
    /// Vendor identifier to match
    pub vendor_id: u16,
    /// Product identifier to match
    pub product_id: u16,
    /// Pause between the wake handshake and joystick resolution
    pub settle: Duration,
    /// Joystick node assumed when no sibling can be resolved
    pub fallback_node: PathBuf,
}

/// What one attach event amounted to
#[derive(Debug, PartialEq, Eq)]
enum AttachOutcome {
    /// The event did not belong to the target gamepad
    NoMatch,
    /// A signature match that could not be tied to the event's input node
    Unconfirmed,
    /// Wake and calibration completed against this joystick node
    Ready(PathBuf),
}

/// Drives the attach workflow for one target gamepad
///
/// Generic over its collaborators so the whole sequence is testable with
/// recording mocks; production wiring uses [`crate::usb::RusbPort`],
/// [`crate::sysfs::SysfsResolver`] and [`super::ScriptRunner`].
pub struct GamepadInitializer<U, R, C> {
    target: GamepadTarget,
    port: U,
    resolver: R,
    calibration: C,
    notifications: mpsc::Sender<GamepadNotification>,
}

impl<U, R, C> GamepadInitializer<U, R, C>
where
    U: UsbPort,
    R: PathResolver,
    C: CalibrationRunner,
{
    #[must_use]
    pub fn new(
        target: GamepadTarget,
        port: U,
        resolver: R,
        calibration: C,
        notifications: mpsc::Sender<GamepadNotification>,
    ) -> Self {
        Self {
            target,
            port,
            resolver,
            calibration,
            notifications,
        }
    }

    fn try_attach(&self, event: &HotplugEvent) -> Result<AttachOutcome, AttachError> {
        let handle = match self
            .port
            .find(self.target.vendor_id, self.target.product_id)?
        {
            Some(handle) => handle,
            None => return Ok(AttachOutcome::NoMatch),
        };

        // A second identical pad on another port would also match by
        // signature; the sysfs interface listing ties the handle to the
        // node that actually raised this event.
        let Some(interface) = self
            .resolver
            .input_interface_name(&handle, &event.sys_name)
        else {
            return Ok(AttachOutcome::Unconfirmed);
        };
        debug!("Confirmed {} behind {}", event.sys_name, interface);

        info!("Waking {}", handle);
        self.port
            .control_read(&handle, ControlRequest::xbox_wake())?;

        // The joystick node appears shortly after the wake, not with the
        // uevent that announced the event node.
        std::thread::sleep(self.target.settle);

        let node = match self.resolver.sibling_joystick_node(&event.sys_name) {
            Some(node) => node,
            None => {
                warn!(
                    "No joystick sibling for {}, falling back to {}",
                    event.sys_name,
                    self.target.fallback_node.display()
                );
                self.target.fallback_node.clone()
            }
        };

        self.calibration.calibrate(&node)?;
        Ok(AttachOutcome::Ready(node))
    }

    fn notify(&mut self, notification: GamepadNotification) {
        if let Err(err) = self.notifications.blocking_send(notification) {
            debug!("Notification dropped: {}", err);
        }
    }
}

impl<U, R, C> DeviceHandler for GamepadInitializer<U, R, C>
where
    U: UsbPort,
    R: PathResolver,
    C: CalibrationRunner,
{
    fn on_attach(&mut self, event: &HotplugEvent) {
        debug!("Input node {} added", event.sys_name);
        match self.try_attach(event) {
            Ok(AttachOutcome::Ready(joystick)) => {
                info!("Gamepad ready, joystick at {}", joystick.display());
                self.notify(GamepadNotification::Attached {
                    sys_name: event.sys_name.clone(),
                    joystick,
                });
            }
            Ok(AttachOutcome::NoMatch) => {
                debug!("{} is not the target gamepad", event.sys_name);
            }
            Ok(AttachOutcome::Unconfirmed) => {
                warn!(
                    "Signature match not confirmed for {}, leaving it alone",
                    event.sys_name
                );
            }
            Err(AttachError::Usb(err)) => {
                warn!("USB failure while attaching {}: {}", event.sys_name, err);
            }
            Err(AttachError::Calibration(err)) => {
                warn!("Calibration failed for {}: {}", event.sys_name, err);
            }
        }
    }

    fn on_detach(&mut self, event: &HotplugEvent) {
        debug!("Input node {} removed", event.sys_name);
        self.notify(GamepadNotification::Detached {
            sys_name: event.sys_name.clone(),
        });
    }
}
