//! Device controller tool wrapper.
//!
//! Every interaction with the target device goes through a controller CLI
//! (`devctl` unless overridden):
//!
//! ```text
//! devctl [--target <id>] target echo
//! devctl [--target <id>] log watch --since now
//! devctl [--target <id>] repo serve start --repo <dir> [--port <port>]
//! devctl [--target <id>] repo serve stop --repo <dir>
//! devctl [--target <id>] test run <package> [-- <args>...]
//! ```
//!
//! The wrapper injects the target flag, enforces the per-command timeout
//! and keeps the exit-code convention: a command that timed out or died on
//! a signal reports -1.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use log::{debug, warn};

use crate::cleanup;
use crate::config::RunConfig;
use crate::error::RunError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long a still-open output stream may trail after its child is gone.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Captured output of a finished tool invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Handle to the device controller executable for one target.
#[derive(Debug, Clone)]
pub struct DeviceTool {
    program: PathBuf,
    target_id: Option<String>,
    timeout: Duration,
}

impl DeviceTool {
    pub fn new(program: PathBuf, target_id: Option<String>, timeout: Duration) -> Self {
        DeviceTool {
            program,
            target_id,
            timeout,
        }
    }

    /// Resolves the controller executable: explicit flag, then the `DEVCTL`
    /// environment variable, then the copy bundled with the build output,
    /// then whatever `devctl` PATH lookup finds.
    pub fn from_config(config: &RunConfig) -> Self {
        let program = config
            .device_tool
            .clone()
            .or_else(|| std::env::var_os("DEVCTL").map(PathBuf::from))
            .unwrap_or_else(|| {
                let bundled = config.out_dir.join("host-tools").join("devctl");
                if bundled.exists() {
                    bundled
                } else {
                    PathBuf::from("devctl")
                }
            });
        debug!("device controller: {}", program.display());
        Self::new(program, config.target_id.clone(), config.command_timeout)
    }

    /// Builds a tool invocation with the target flag injected.
    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(target) = &self.target_id {
            cmd.arg("--target").arg(target);
        }
        cmd.args(args);
        cmd
    }

    /// Probes device reachability. Nothing else should run when this fails.
    pub fn check_connection(&self) -> crate::error::Result<()> {
        debug!("probing target device");
        match self.run_captured(&["target", "echo"]) {
            Ok(output) if output.exit_code == 0 => Ok(()),
            Ok(output) => Err(RunError::Connection(format!(
                "probe exited with {}: {}",
                output.exit_code,
                output.stderr.trim()
            ))),
            Err(e) => Err(RunError::Connection(format!("{e:#}"))),
        }
    }

    /// Runs a tool command to completion, capturing its output. The output
    /// pipes are drained while the command runs; the child is killed once
    /// the timeout elapses and reported as exit code -1.
    pub fn run_captured(&self, args: &[&str]) -> anyhow::Result<CommandOutput> {
        cleanup::hold_on_termination();
        let mut cmd = self.command(args);
        debug!("running device tool: {cmd:?}");
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start device tool {}", self.program.display()))?;

        let stdout_rx = drain_pipe(child.stdout.take());
        let stderr_rx = drain_pipe(child.stderr.take());

        let timed_out = self.wait_with_timeout(&mut child)?;
        let stdout = collect_pipe(&stdout_rx, "stdout");
        let stderr = collect_pipe(&stderr_rx, "stderr");

        let exit_code = if timed_out {
            -1
        } else {
            match child.wait().context("failed to reap device tool")?.code() {
                Some(code) => code,
                None => -1,
            }
        };
        debug!("device tool finished: exit_code={exit_code}");
        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    /// Runs a tool command with stdio attached to this process, so test
    /// output streams through as it is produced. Returns the exit code;
    /// -1 on timeout or signal death. While the command runs, a kill of
    /// the child is registered for signal-driven teardown.
    pub fn run_streaming(&self, args: &[&str]) -> anyhow::Result<i32> {
        cleanup::hold_on_termination();
        let mut cmd = self.command(args);
        debug!("running device tool: {cmd:?}");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to start device tool {}", self.program.display()))?;

        let pid = child.id();
        let guard = cleanup::register("device test process", move || {
            let _ = Command::new("kill").arg(pid.to_string()).status();
        });

        let timed_out = self.wait_with_timeout(&mut child)?;
        guard.disarm();
        if timed_out {
            return Ok(-1);
        }
        match child.wait().context("failed to reap device tool")?.code() {
            Some(code) => Ok(code),
            None => Ok(-1),
        }
    }

    /// Spawns a long-lived tool command whose stdout is redirected to
    /// `sink`. The caller owns the child.
    pub fn spawn_streamed(&self, args: &[&str], sink: std::fs::File) -> anyhow::Result<Child> {
        let mut cmd = self.command(args);
        debug!("spawning device tool: {cmd:?}");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(sink))
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start device tool {}", self.program.display()))
    }

    fn wait_with_timeout(&self, child: &mut Child) -> anyhow::Result<bool> {
        let start = Instant::now();
        loop {
            cleanup::hold_on_termination();
            if child
                .try_wait()
                .context("failed to poll device tool")?
                .is_some()
            {
                return Ok(false);
            }
            if start.elapsed() > self.timeout {
                warn!("device tool timed out after {:?}, killing it", self.timeout);
                child.kill().context("failed to kill timed out device tool")?;
                child.wait().context("failed to reap timed out device tool")?;
                return Ok(true);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Consumes a child output pipe on a background thread, forwarding chunks
/// as they arrive so the child never blocks on a full pipe buffer.
fn drain_pipe(pipe: Option<impl Read + Send + 'static>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let Some(mut pipe) = pipe else { return };
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Collects a drained stream. A pipe still open past the grace period (a
/// forked survivor of the child holding it) yields what arrived so far.
fn collect_pipe(rx: &mpsc::Receiver<Vec<u8>>, stream: &str) -> String {
    let deadline = Instant::now() + PIPE_DRAIN_TIMEOUT;
    let mut bytes = Vec::new();
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("device tool left its {stream} open, dropping the rest");
                break;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
