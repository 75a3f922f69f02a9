//! Scoped capture of device system logs.

use std::fs::{self, File};
use std::path::Path;
use std::process::{Child, Command};

use anyhow::Context;
use chrono::Local;
use log::{debug, info, warn};

use crate::cleanup::{self, CleanupHandle};
use crate::device::DeviceTool;
use crate::error::{Result, RunError};

/// A system-log capture scoped to one run.
///
/// While the session is held, a device tool child streams device logs
/// (from a "since now" marker, so only this run's output lands) into a
/// timestamped file under the logs directory. The capture is released on
/// every exit path: explicitly via [`LogSession::stop`], by the guard's
/// drop, or by the process-wide cleanup registry on termination signals.
pub struct LogSession {
    child: Option<Child>,
    cleanup: Option<CleanupHandle>,
}

impl LogSession {
    /// Starts capturing, or returns a disabled session when no logs
    /// directory is configured.
    pub fn start(device: &DeviceTool, logs_dir: Option<&Path>) -> Result<Self> {
        match logs_dir {
            Some(dir) => Self::start_capture(device, dir)
                .map_err(|e| RunError::Connection(format!("{e:#}"))),
            None => Ok(Self::disabled()),
        }
    }

    fn start_capture(device: &DeviceTool, dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create logs directory {}", dir.display()))?;
        let sink_path = dir.join(format!(
            "system_log_{}.txt",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let sink = File::create(&sink_path)
            .with_context(|| format!("failed to create log sink {}", sink_path.display()))?;

        info!("capturing device system logs to {}", sink_path.display());
        let child = device
            .spawn_streamed(&["log", "watch", "--since", "now"], sink)
            .context("failed to start system log capture")?;

        let pid = child.id();
        let cleanup = cleanup::register("system log capture", move || {
            let _ = Command::new("kill").arg(pid.to_string()).status();
        });

        Ok(LogSession {
            child: Some(child),
            cleanup: Some(cleanup),
        })
    }

    fn disabled() -> Self {
        debug!("no logs directory configured, system log capture disabled");
        LogSession {
            child: None,
            cleanup: None,
        }
    }

    /// Stops the capture child. Idempotent; a disabled session is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(handle) = self.cleanup.take() {
            handle.disarm();
        }
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        debug!("stopping system log capture");
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("log capture already exited: {status}");
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                return Err(RunError::Connection(format!(
                    "failed to poll log capture: {e}"
                )));
            }
        }
        child
            .kill()
            .map_err(|e| RunError::Connection(format!("failed to stop log capture: {e}")))?;
        child
            .wait()
            .map_err(|e| RunError::Connection(format!("failed to reap log capture: {e}")))?;
        Ok(())
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("log session teardown failed: {e}");
        }
    }
}
