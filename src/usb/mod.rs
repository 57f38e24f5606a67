//! # USB Device Access
//!
//! Finds the target gamepad on the bus and issues the vendor wake request.
//!
//! This module handles:
//! - Scanning attached devices for a vendor/product signature
//! - Raw IN control transfers against a matched device
//! - The Xbox wake request constants

mod port;

pub use port::{RusbPort, UsbPort};

#[cfg(test)]
pub use port::mocks;

use std::fmt;

/// Microsoft vendor identifier
pub const XBOX_VENDOR_ID: u16 = 0x045e;

/// Xbox 360 wired controller product identifier
pub const XBOX_PRODUCT_ID: u16 = 0x028e;

/// Position of a matched gamepad on the USB topology
///
/// Obtained fresh from enumeration on every attach event. Bus addresses are
/// reassigned on replug, so a handle is only meaningful for the event that
/// produced it and must never be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamepadHandle {
    /// Vendor identifier from the device descriptor
    pub vendor_id: u16,
    /// Product identifier from the device descriptor
    pub product_id: u16,
    /// Bus the device is attached to
    pub bus_number: u8,
    /// Physical port on that bus
    pub port_number: u8,
    /// Address assigned by the kernel for this plug cycle
    pub address: u8,
}

impl fmt::Display for GamepadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} at bus {} port {}",
            self.vendor_id, self.product_id, self.bus_number, self.port_number
        )
    }
}

/// Vendor IN control transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    /// bmRequestType field
    pub request_type: u8,
    /// bRequest field
    pub request: u8,
    /// wValue field
    pub value: u16,
    /// wIndex field
    pub index: u16,
    /// Number of bytes to read back
    pub length: u16,
}

impl ControlRequest {
    /// Wake request that switches an Xbox pad into its reporting mode
    ///
    /// The pad enumerates fine without it but does not produce stable
    /// joystick output until this transfer has completed once.
    #[must_use]
    pub fn xbox_wake() -> Self {
        Self {
            request_type: rusb::request_type(
                rusb::Direction::In,
                rusb::RequestType::Vendor,
                rusb::Recipient::Interface,
            ),
            request: 0x01,
            value: 0x0100,
            index: 0x0000,
            length: 20,
        }
    }
}
