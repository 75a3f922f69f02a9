//! Package server control.

use anyhow::{Context, bail};
use log::{debug, info, warn};

use crate::cleanup::{self, CleanupHandle};
use crate::device::DeviceTool;
use crate::error::{Result, RunError};
use crate::publish::PackageIndex;
use crate::repo::ResourceRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    Stopped,
    Running,
}

/// Controller for the package-serving service bound to one repository.
///
/// `start` refuses repositories without published packages. `stop` is
/// idempotent, so teardown may call it unconditionally: stopping a server
/// that never started (or already stopped) does nothing and invokes no
/// tool command.
pub struct PackageServer<'a> {
    device: &'a DeviceTool,
    repo: &'a ResourceRepo,
    port: Option<u16>,
    state: ServerState,
    cleanup: Option<CleanupHandle>,
}

impl<'a> PackageServer<'a> {
    pub fn new(device: &'a DeviceTool, repo: &'a ResourceRepo, port: Option<u16>) -> Self {
        PackageServer {
            device,
            repo,
            port,
            state: ServerState::Stopped,
            cleanup: None,
        }
    }

    /// Starts serving the repository to the device.
    pub fn start(&mut self) -> Result<()> {
        self.start_inner()
            .map_err(|e| RunError::Serve(format!("{e:#}")))
    }

    fn start_inner(&mut self) -> anyhow::Result<()> {
        let index = PackageIndex::load(self.repo.path())
            .context("repository has no readable package index")?;
        if index.is_empty() {
            bail!(
                "repository {} has no published packages",
                self.repo.path().display()
            );
        }

        let repo_arg = self.repo.path().display().to_string();
        let port_arg;
        let mut args = vec!["repo", "serve", "start", "--repo", repo_arg.as_str()];
        if let Some(port) = self.port {
            port_arg = port.to_string();
            args.push("--port");
            args.push(port_arg.as_str());
        }

        info!("starting package server for {repo_arg}");
        let output = self.device.run_captured(&args)?;
        if output.exit_code != 0 {
            bail!(
                "serve start exited with {}: {}",
                output.exit_code,
                output.stderr.trim()
            );
        }
        if !output.stdout.trim().is_empty() {
            debug!("serve start reported: {}", output.stdout.trim());
        }

        self.state = ServerState::Running;
        let device = self.device.clone();
        let repo_path = self.repo.path().to_path_buf();
        self.cleanup = Some(cleanup::register("package server", move || {
            let repo_arg = repo_path.display().to_string();
            let _ = device.run_captured(&["repo", "serve", "stop", "--repo", &repo_arg]);
        }));
        Ok(())
    }

    /// Stops the server. A no-op when it is not running.
    pub fn stop(&mut self) -> Result<()> {
        cleanup::hold_on_termination();
        if self.state != ServerState::Running {
            debug!("package server not running, nothing to stop");
            return Ok(());
        }
        // Mark stopped before talking to the tool so a failed stop is not
        // retried by the teardown path.
        self.state = ServerState::Stopped;
        let handle = self.cleanup.take();

        let repo_arg = self.repo.path().display().to_string();
        info!("stopping package server for {repo_arg}");
        let stop_args = ["repo", "serve", "stop", "--repo", repo_arg.as_str()];
        // Claiming the registry entry and invoking the tool is one step, so
        // a termination signal cannot land between them and lose the stop.
        let output = match handle {
            Some(handle) => cleanup::run_claimed(handle, || self.device.run_captured(&stop_args)),
            None => self.device.run_captured(&stop_args),
        }
        .map_err(|e| RunError::Serve(format!("{e:#}")))?;
        if output.exit_code != 0 {
            return Err(RunError::Serve(format!(
                "serve stop exited with {}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    /// Whether a successful start has not yet been matched by a stop.
    pub fn is_running(&self) -> bool {
        self.state == ServerState::Running
    }
}

impl Drop for PackageServer<'_> {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop() {
                warn!("package server stop failed during teardown: {e}");
            }
        }
    }
}
