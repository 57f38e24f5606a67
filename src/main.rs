//! # padwake
//!
//! Wake and calibrate an Xbox gamepad when it is hot-plugged.
//!
//! This daemon watches the input subsystem for the arrival of a wired
//! Xbox-class controller, issues the vendor wake handshake and runs the
//! calibration script against the matching joystick node.

use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

mod config;
mod error;
mod gamepad;
mod hotplug;
mod sysfs;
mod usb;

use config::Config;
use gamepad::{GamepadInitializer, GamepadNotification, GamepadTarget, ScriptRunner};
use hotplug::HotplugMonitor;
use sysfs::SysfsResolver;
use usb::RusbPort;

/// Capacity of the attach/detach notification channel
const NOTIFY_BUFFER: usize = 16;

/// Main entry point for the padwake daemon
///
/// Initializes the application and runs until interrupted, reacting to
/// gamepad hotplug events as they arrive.
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (`$PADWAKE_CONFIG`, `config/default.toml`,
///      or built-in defaults)
///    - Create the libusb context and udev subscription
///    - Spawn the monitor worker thread
///
/// 2. **Main Loop**
///    - Log attach/detach notifications coming from the worker
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Cancel the monitor worker and join it
///    - Clean exit
///
/// # Errors
///
/// Returns error if:
/// - Configuration cannot be loaded or fails validation
/// - The libusb context cannot be created
/// - The udev subscription cannot be established
///
/// # Examples
///
/// Run the daemon:
/// ```bash
/// cargo run --release
/// ```
///
/// Expected output when a pad is plugged in:
/// ```text
/// INFO padwake: padwake v0.1.0 starting...
/// INFO padwake::hotplug::monitor: Monitoring input hotplug events
/// INFO padwake::gamepad::init: Waking 045e:028e at bus 1 port 2
/// INFO padwake::gamepad::calibrate: Calibrating /dev/input/js0 via /bin/xbox_gamepad_calibrate.sh
/// INFO padwake: Gamepad attached (/dev/input/js0)
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("padwake v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::discover()?;
    debug!(
        "Watching for {:04x}:{:04x}",
        config.gamepad.vendor_id, config.gamepad.product_id
    );

    // Wire the attach workflow out of its production collaborators
    let port = RusbPort::new()?;
    let resolver = SysfsResolver::new();
    let runner = ScriptRunner::new(
        config.calibration.program.clone(),
        config.calibration_timeout(),
    );
    let target = GamepadTarget {
        vendor_id: config.gamepad.vendor_id,
        product_id: config.gamepad.product_id,
        settle: config.settle(),
        fallback_node: PathBuf::from(&config.calibration.fallback_node),
    };

    let (notify_tx, mut notify_rx) = mpsc::channel(NOTIFY_BUFFER);
    let initializer = GamepadInitializer::new(target, port, resolver, runner, notify_tx);

    let monitor = HotplugMonitor::new(initializer, config.poll_interval());
    let handle = monitor.spawn(CancellationToken::new())?;

    info!("Press Ctrl+C to exit");

    // Main loop
    loop {
        tokio::select! {
            notification = notify_rx.recv() => {
                match notification {
                    Some(GamepadNotification::Attached { joystick, .. }) => {
                        info!("Gamepad attached ({})", joystick.display());
                    }
                    Some(GamepadNotification::Detached { sys_name }) => {
                        info!("Gamepad detached ({})", sys_name);
                    }
                    // All senders gone means the worker is dead; stop too.
                    None => break,
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    // Receiver drops first so a worker blocked on a full channel can exit.
    drop(notify_rx);
    handle.shutdown();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_buffer_has_headroom() {
        // Attach events are rare; a small buffer must never fill in practice
        assert!(NOTIFY_BUFFER >= 4);
    }

    #[test]
    fn test_monitor_subscribes_to_input() {
        assert_eq!(hotplug::INPUT_SUBSYSTEM, "input");
    }

    #[test]
    fn test_default_target_is_xbox_signature() {
        let config = Config::default();
        assert_eq!(config.gamepad.vendor_id, usb::XBOX_VENDOR_ID);
        assert_eq!(config.gamepad.product_id, usb::XBOX_PRODUCT_ID);
    }
}
