//! # Calibration Runner
//!
//! Launches the external calibration program against a joystick node.
//!
//! The program receives the node path as its only argument and signals
//! success by exiting zero. A wall-clock budget bounds the wait; a wedged
//! script would otherwise stall the monitor worker forever.

use std::path::Path;
use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::CalibrationError;

/// How often a live child is checked for exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Trait for triggering gamepad calibration
pub trait CalibrationRunner {
    /// Run calibration against `node`, blocking until it finishes
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError`] when the program cannot be started,
    /// exits non-zero, or outlives its time budget.
    fn calibrate(&self, node: &Path) -> Result<(), CalibrationError>;
}

/// Runs an external executable with the node path as its argument
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    program: String,
    timeout: Duration,
}

impl ScriptRunner {
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Wait for `child` to exit, killing it once the budget is spent
    fn wait_bounded(&self, mut child: Child) -> Result<ExitStatus, CalibrationError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CalibrationError::TimedOut(self.timeout));
                    }
                    std::thread::sleep(EXIT_POLL_INTERVAL);
                }
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CalibrationError::Wait(source));
                }
            }
        }
    }
}

impl CalibrationRunner for ScriptRunner {
    fn calibrate(&self, node: &Path) -> Result<(), CalibrationError> {
        info!("Calibrating {} via {}", node.display(), self.program);
        let child = Command::new(&self.program)
            .arg(node)
            .spawn()
            .map_err(|source| CalibrationError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let status = self.wait_bounded(child)?;
        if status.success() {
            debug!("Calibration finished cleanly");
            Ok(())
        } else {
            Err(CalibrationError::Failed(status))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn runner(program: &str) -> ScriptRunner {
        ScriptRunner::new(program, Duration::from_secs(5))
    }

    #[test]
    fn test_successful_exit_is_ok() {
        runner("true")
            .calibrate(Path::new("/dev/input/js0"))
            .expect("true exits zero");
    }

    #[test]
    fn test_nonzero_exit_reported_as_failed() {
        let err = runner("false")
            .calibrate(Path::new("/dev/input/js0"))
            .unwrap_err();
        match err {
            CalibrationError::Failed(status) => assert_eq!(status.code(), Some(1)),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_program_reported_as_launch() {
        let err = runner("/nonexistent/calibrate")
            .calibrate(Path::new("/dev/input/js0"))
            .unwrap_err();
        assert!(matches!(err, CalibrationError::Launch { .. }));
    }

    #[test]
    fn test_node_path_passed_as_first_argument() {
        let dir = TempDir::new().expect("tempdir");
        let script = dir.path().join("check.sh");
        fs::write(&script, "#!/bin/sh\ntest \"$1\" = \"/dev/input/js7\"\n").expect("write script");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");

        let runner = ScriptRunner::new(script.to_string_lossy(), Duration::from_secs(5));
        runner
            .calibrate(Path::new("/dev/input/js7"))
            .expect("argument matches");
        assert!(matches!(
            runner.calibrate(Path::new("/dev/input/js0")),
            Err(CalibrationError::Failed(_))
        ));
    }

    #[test]
    fn test_overlong_run_times_out() {
        let runner = ScriptRunner::new("sleep", Duration::from_millis(200));
        let err = runner.calibrate(Path::new("5")).unwrap_err();
        match err {
            CalibrationError::TimedOut(timeout) => {
                assert_eq!(timeout, Duration::from_millis(200));
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
    }
}
