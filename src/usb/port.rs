//! Trait abstraction for USB access to enable testing

use rusb::UsbContext;
use std::time::Duration;
use tracing::{debug, trace};

use super::{ControlRequest, GamepadHandle};
use crate::error::UsbError;

/// Upper bound for one control transfer round trip
const CONTROL_TIMEOUT: Duration = Duration::from_secs(1);

/// Trait for USB discovery and control transfer operations
pub trait UsbPort {
    /// First attached device matching `vendor_id:product_id`, if any
    ///
    /// Absence is not an error. Input uevents fire for plenty of devices
    /// that are not the gamepad, and enumeration can lag the uevent, so
    /// callers treat `None` as an ordinary outcome.
    fn find(&self, vendor_id: u16, product_id: u16) -> Result<Option<GamepadHandle>, UsbError>;

    /// Issue an IN control transfer against the device behind `handle`
    ///
    /// # Errors
    ///
    /// [`UsbError::DeviceGone`] when the device vanished since `find`,
    /// [`UsbError::Transport`] for libusb failures.
    fn control_read(
        &self,
        handle: &GamepadHandle,
        request: ControlRequest,
    ) -> Result<Vec<u8>, UsbError>;
}

/// Production port over an owned libusb context
pub struct RusbPort {
    context: rusb::Context,
}

impl std::fmt::Debug for RusbPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusbPort").finish_non_exhaustive()
    }
}

impl RusbPort {
    /// Create a port with its own libusb context
    ///
    /// # Errors
    ///
    /// Fails when the libusb context cannot be initialized, which is a
    /// startup precondition failure rather than a per-event condition.
    pub fn new() -> Result<Self, UsbError> {
        Ok(Self {
            context: rusb::Context::new()?,
        })
    }

    /// Re-locate the device at the handle's bus position
    fn device_at(
        &self,
        handle: &GamepadHandle,
    ) -> Result<Option<rusb::Device<rusb::Context>>, UsbError> {
        for device in self.context.devices()?.iter() {
            if device.bus_number() == handle.bus_number && device.address() == handle.address {
                return Ok(Some(device));
            }
        }
        Ok(None)
    }
}

impl UsbPort for RusbPort {
    fn find(&self, vendor_id: u16, product_id: u16) -> Result<Option<GamepadHandle>, UsbError> {
        for device in self.context.devices()?.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    trace!("Skipping unreadable descriptor: {}", err);
                    continue;
                }
            };

            if descriptor.vendor_id() == vendor_id && descriptor.product_id() == product_id {
                let handle = GamepadHandle {
                    vendor_id,
                    product_id,
                    bus_number: device.bus_number(),
                    port_number: device.port_number(),
                    address: device.address(),
                };
                debug!("Matched {} (address {})", handle, handle.address);
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    fn control_read(
        &self,
        handle: &GamepadHandle,
        request: ControlRequest,
    ) -> Result<Vec<u8>, UsbError> {
        let device = self.device_at(handle)?.ok_or(UsbError::DeviceGone)?;
        let device_handle = device.open()?;

        let mut data = vec![0u8; request.length as usize];
        let read = device_handle.read_control(
            request.request_type,
            request.request,
            request.value,
            request.index,
            &mut data,
            CONTROL_TIMEOUT,
        )?;
        data.truncate(read);
        trace!("Control read from {} returned {} bytes", handle, read);
        Ok(data)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::usb::{XBOX_PRODUCT_ID, XBOX_VENDOR_ID};
    use std::sync::{Arc, Mutex};

    /// Mock USB port for testing
    #[derive(Clone)]
    pub struct MockPort {
        pub found: Arc<Mutex<Option<GamepadHandle>>>,
        pub requests: Arc<Mutex<Vec<ControlRequest>>>,
        pub find_calls: Arc<Mutex<u32>>,
        pub control_fails: Arc<Mutex<bool>>,
    }

    impl MockPort {
        pub fn new(found: Option<GamepadHandle>) -> Self {
            Self {
                found: Arc::new(Mutex::new(found)),
                requests: Arc::new(Mutex::new(Vec::new())),
                find_calls: Arc::new(Mutex::new(0)),
                control_fails: Arc::new(Mutex::new(false)),
            }
        }

        /// Handle for a pad sitting at bus 1 port 2
        pub fn gamepad() -> GamepadHandle {
            GamepadHandle {
                vendor_id: XBOX_VENDOR_ID,
                product_id: XBOX_PRODUCT_ID,
                bus_number: 1,
                port_number: 2,
                address: 4,
            }
        }

        pub fn get_requests(&self) -> Vec<ControlRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn get_find_calls(&self) -> u32 {
            *self.find_calls.lock().unwrap()
        }

        pub fn set_control_failure(&self) {
            *self.control_fails.lock().unwrap() = true;
        }
    }

    impl UsbPort for MockPort {
        fn find(
            &self,
            vendor_id: u16,
            product_id: u16,
        ) -> Result<Option<GamepadHandle>, UsbError> {
            *self.find_calls.lock().unwrap() += 1;
            Ok(self
                .found
                .lock()
                .unwrap()
                .filter(|handle| handle.vendor_id == vendor_id && handle.product_id == product_id))
        }

        fn control_read(
            &self,
            _handle: &GamepadHandle,
            request: ControlRequest,
        ) -> Result<Vec<u8>, UsbError> {
            self.requests.lock().unwrap().push(request);
            if *self.control_fails.lock().unwrap() {
                return Err(UsbError::DeviceGone);
            }
            Ok(vec![0; request.length as usize])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::{XBOX_PRODUCT_ID, XBOX_VENDOR_ID};

    /// Needs a usable libusb environment.
    #[test]
    #[ignore]
    fn test_context_creation() {
        RusbPort::new().expect("libusb context");
    }

    /// Needs a wired Xbox pad plugged in.
    #[test]
    #[ignore]
    fn test_find_real_gamepad() {
        let port = RusbPort::new().expect("libusb context");
        let handle = port
            .find(XBOX_VENDOR_ID, XBOX_PRODUCT_ID)
            .expect("enumeration");
        assert!(handle.is_some(), "no gamepad attached");
    }
}
