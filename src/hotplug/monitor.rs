//! # Hotplug Monitor
//!
//! Subscribes to input-subsystem uevents and drives a device handler from a
//! dedicated worker thread.
//!
//! This module handles:
//! - The udev netlink subscription and non-blocking socket setup
//! - A poll loop with bounded waits so cancellation is observed promptly
//! - Dispatching add/remove events to a [`DeviceHandler`]
//! - Worker thread lifecycle (startup handshake, cancel, join)

use std::os::unix::io::AsRawFd;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::event::{EventAction, HotplugEvent};
use crate::error::MonitorError;

/// Subsystem whose uevents the monitor subscribes to
pub const INPUT_SUBSYSTEM: &str = "input";

/// Trait for sources of hotplug events
///
/// The production source wraps a udev monitor socket; tests script a
/// sequence instead.
pub trait EventSource {
    /// Next event, waiting at most `timeout`
    ///
    /// `Ok(None)` means the wait elapsed without anything arriving.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<HotplugEvent>, MonitorError>;
}

/// Trait for reacting to filtered hotplug events
///
/// Handlers run on the monitor worker and handle one event at a time;
/// blocking in a handler delays later events. The kernel buffers uevents
/// on the netlink socket meanwhile, up to its receive-buffer limit.
pub trait DeviceHandler {
    /// An input event node appeared
    fn on_attach(&mut self, event: &HotplugEvent);

    /// An input device went away
    fn on_detach(&mut self, event: &HotplugEvent);
}

/// Production event source over a udev netlink monitor socket
///
/// Not `Send`; constructed inside the worker thread that polls it.
pub struct UdevEventSource {
    socket: udev::MonitorSocket,
}

impl UdevEventSource {
    /// Subscribe to input-subsystem uevents
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Subscribe`] when the netlink socket cannot
    /// be established.
    pub fn new() -> Result<Self, MonitorError> {
        let socket = Self::subscribe().map_err(MonitorError::Subscribe)?;

        // Reads must not block; all waiting happens in poll(2).
        unsafe {
            let fd = socket.as_raw_fd();
            let flags = libc::fcntl(fd, libc::F_GETFL);
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }

        Ok(Self { socket })
    }

    fn subscribe() -> std::io::Result<udev::MonitorSocket> {
        udev::MonitorBuilder::new()?
            .match_subsystem(INPUT_SUBSYSTEM)?
            .listen()
    }
}

impl EventSource for UdevEventSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<HotplugEvent>, MonitorError> {
        // Drain anything already queued before sleeping in poll(2).
        if let Some(event) = self.socket.iter().next() {
            return Ok(Some(HotplugEvent::from(&event)));
        }

        let mut fds = [libc::pollfd {
            fd: self.socket.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        }];
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), 1, timeout_ms) };

        if ready < 0 {
            let err = std::io::Error::last_os_error();
            // Signals land here; the caller just polls again.
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(None);
            }
            return Err(MonitorError::Poll(err));
        }
        if ready == 0 {
            return Ok(None);
        }

        Ok(self
            .socket
            .iter()
            .next()
            .map(|event| HotplugEvent::from(&event)))
    }
}

/// Hotplug monitor driving a handler from a poll loop
pub struct HotplugMonitor<H> {
    handler: H,
    poll_interval: Duration,
}

impl<H> HotplugMonitor<H>
where
    H: DeviceHandler,
{
    #[must_use]
    pub fn new(handler: H, poll_interval: Duration) -> Self {
        Self {
            handler,
            poll_interval,
        }
    }

    /// Drive `source` until `token` is cancelled
    ///
    /// Factored out of the worker thread so dispatch is testable with a
    /// scripted source. Source errors are logged and survived; only
    /// cancellation ends the loop.
    pub fn run<S: EventSource>(&mut self, mut source: S, token: &CancellationToken) {
        info!("Monitoring input hotplug events");
        while !token.is_cancelled() {
            match source.next_event(self.poll_interval) {
                Ok(Some(event)) => self.dispatch(&event),
                Ok(None) => {}
                Err(err) => {
                    error!("Event wait failed: {}", err);
                    thread::sleep(self.poll_interval);
                }
            }
        }
        debug!("Monitor loop stopped");
    }

    fn dispatch(&mut self, event: &HotplugEvent) {
        match event.action {
            EventAction::Add if event.is_event_node() => {
                if event.subsystem.as_deref() == Some(INPUT_SUBSYSTEM) {
                    self.handler.on_attach(event);
                } else {
                    trace!("Ignoring add of {} outside input", event.sys_name);
                }
            }
            EventAction::Remove => self.handler.on_detach(event),
            _ => trace!("Ignoring {:?} of {}", event.action, event.sys_name),
        }
    }

    /// Spawn the monitor on its own worker thread
    ///
    /// The udev subscription happens inside the worker because the socket
    /// stays confined to the thread that polls it; the outcome is reported
    /// back before this function returns, so a failed subscription still
    /// fails startup.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Subscribe`] or [`MonitorError::Spawn`] when
    /// the worker could not be brought up.
    pub fn spawn(mut self, token: CancellationToken) -> Result<MonitorHandle, MonitorError>
    where
        H: Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel();
        let worker_token = token.clone();

        let worker = thread::Builder::new()
            .name("hotplug-monitor".to_string())
            .spawn(move || {
                let source = match UdevEventSource::new() {
                    Ok(source) => {
                        if ready_tx.send(Ok(())).is_err() {
                            return;
                        }
                        source
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                self.run(source, &worker_token);
            })
            .map_err(MonitorError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(MonitorHandle { token, worker }),
            Ok(Err(err)) => {
                let _ = worker.join();
                Err(err)
            }
            Err(_) => {
                let _ = worker.join();
                Err(MonitorError::Subscribe(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "monitor worker exited before reporting readiness",
                )))
            }
        }
    }
}

/// Handle to a running monitor worker
#[derive(Debug)]
pub struct MonitorHandle {
    token: CancellationToken,
    worker: thread::JoinHandle<()>,
}

impl MonitorHandle {
    /// Cancel the worker and wait for it to finish
    pub fn shutdown(self) {
        self.token.cancel();
        if self.worker.join().is_err() {
            warn!("Monitor worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Replays a fixed sequence, then cancels the loop
    struct ScriptedSource {
        events: Vec<HotplugEvent>,
        token: CancellationToken,
    }

    impl ScriptedSource {
        fn new(events: Vec<HotplugEvent>, token: CancellationToken) -> Self {
            Self { events, token }
        }
    }

    impl EventSource for ScriptedSource {
        fn next_event(
            &mut self,
            _timeout: Duration,
        ) -> Result<Option<HotplugEvent>, MonitorError> {
            if self.events.is_empty() {
                self.token.cancel();
                return Ok(None);
            }
            Ok(Some(self.events.remove(0)))
        }
    }

    /// Fails once, then cancels the loop
    struct FailingThenCancel {
        failed: bool,
        token: CancellationToken,
    }

    impl EventSource for FailingThenCancel {
        fn next_event(
            &mut self,
            _timeout: Duration,
        ) -> Result<Option<HotplugEvent>, MonitorError> {
            if !self.failed {
                self.failed = true;
                return Err(MonitorError::Poll(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "transient",
                )));
            }
            self.token.cancel();
            Ok(None)
        }
    }

    /// Panics when polled; for asserting the loop never starts
    struct UntouchableSource;

    impl EventSource for UntouchableSource {
        fn next_event(
            &mut self,
            _timeout: Duration,
        ) -> Result<Option<HotplugEvent>, MonitorError> {
            panic!("source polled after cancellation");
        }
    }

    /// Handler recording which callbacks fired
    #[derive(Clone)]
    struct RecordingHandler {
        attached: Arc<Mutex<Vec<String>>>,
        detached: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingHandler {
        fn new() -> Self {
            Self {
                attached: Arc::new(Mutex::new(Vec::new())),
                detached: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn get_attached(&self) -> Vec<String> {
            self.attached.lock().unwrap().clone()
        }

        fn get_detached(&self) -> Vec<String> {
            self.detached.lock().unwrap().clone()
        }
    }

    impl DeviceHandler for RecordingHandler {
        fn on_attach(&mut self, event: &HotplugEvent) {
            self.attached.lock().unwrap().push(event.sys_name.clone());
        }

        fn on_detach(&mut self, event: &HotplugEvent) {
            self.detached.lock().unwrap().push(event.sys_name.clone());
        }
    }

    fn event(action: EventAction, subsystem: &str, sys_name: &str) -> HotplugEvent {
        HotplugEvent {
            action,
            subsystem: Some(subsystem.to_string()),
            sys_name: sys_name.to_string(),
            devnode: None,
        }
    }

    fn run_scripted(events: Vec<HotplugEvent>) -> RecordingHandler {
        let token = CancellationToken::new();
        let source = ScriptedSource::new(events, token.clone());
        let handler = RecordingHandler::new();
        let mut monitor = HotplugMonitor::new(handler.clone(), Duration::from_millis(1));
        monitor.run(source, &token);
        handler
    }

    #[test]
    fn test_only_event_nodes_dispatch_to_attach() {
        let handler = run_scripted(vec![
            event(EventAction::Add, "input", "event5"),
            event(EventAction::Add, "input", "js0"),
            event(EventAction::Add, "input", "mouse1"),
        ]);

        assert_eq!(handler.get_attached(), vec!["event5"]);
        assert!(handler.get_detached().is_empty());
    }

    #[test]
    fn test_remove_always_dispatches_to_detach() {
        let handler = run_scripted(vec![
            event(EventAction::Remove, "input", "event5"),
            event(EventAction::Remove, "input", "js0"),
        ]);

        assert!(handler.get_attached().is_empty());
        assert_eq!(handler.get_detached(), vec!["event5", "js0"]);
    }

    #[test]
    fn test_foreign_subsystem_add_ignored() {
        let handler = run_scripted(vec![event(EventAction::Add, "usb", "event5")]);

        assert!(handler.get_attached().is_empty());
        assert!(handler.get_detached().is_empty());
    }

    #[test]
    fn test_other_actions_ignored() {
        let handler = run_scripted(vec![event(EventAction::Other, "input", "event5")]);

        assert!(handler.get_attached().is_empty());
        assert!(handler.get_detached().is_empty());
    }

    #[test]
    fn test_cancelled_loop_never_polls() {
        let token = CancellationToken::new();
        token.cancel();
        let mut monitor = HotplugMonitor::new(RecordingHandler::new(), Duration::from_millis(1));

        monitor.run(UntouchableSource, &token);
    }

    #[test]
    fn test_source_error_survived() {
        let token = CancellationToken::new();
        let source = FailingThenCancel {
            failed: false,
            token: token.clone(),
        };
        let handler = RecordingHandler::new();
        let mut monitor = HotplugMonitor::new(handler.clone(), Duration::from_millis(1));

        monitor.run(source, &token);

        assert!(handler.get_attached().is_empty());
        assert!(handler.get_detached().is_empty());
    }

    /// Needs udev netlink access.
    #[test]
    #[ignore]
    fn test_real_subscription_spawns_and_stops() {
        let token = CancellationToken::new();
        let monitor = HotplugMonitor::new(RecordingHandler::new(), Duration::from_millis(50));
        let handle = monitor.spawn(token).expect("udev subscription");
        thread::sleep(Duration::from_millis(100));
        handle.shutdown();
    }
}
