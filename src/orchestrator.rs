//! End-to-end run orchestration.
//!
//! The sequence is strict: probe the device before acquiring anything,
//! resolve the strategy's package list, then hold the log session for the
//! rest of the run, resolve and populate the repository, serve it, run the
//! test, and always stop the server before the repository can go away.
//! Failures after acquisition begin surface only once teardown ran, and a
//! teardown failure is logged without masking the run's own result.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::config::RunConfig;
use crate::device::DeviceTool;
use crate::error::Result;
use crate::log_session::LogSession;
use crate::publish::publish_packages;
use crate::repo::ResourceRepo;
use crate::server::PackageServer;
use crate::strategy::{TestOutcome, TestStrategy, select_strategy};

/// Runs one complete test: connection check, resource acquisition,
/// strategy execution and teardown.
pub fn run(config: &RunConfig) -> Result<TestOutcome> {
    let device = DeviceTool::from_config(config);
    let mut strategy = select_strategy(config);
    run_with(config, &device, strategy.as_mut())
}

pub(crate) fn run_with(
    config: &RunConfig,
    device: &DeviceTool,
    strategy: &mut dyn TestStrategy,
) -> Result<TestOutcome> {
    device.check_connection()?;
    info!("target device is reachable");

    let package_paths = strategy.package_paths()?;
    debug!("required package archives: {package_paths:?}");

    let mut log_session = LogSession::start(device, config.logs_dir.as_deref())?;
    let result = serve_and_run(config, device, &package_paths, strategy);
    if let Err(e) = log_session.stop() {
        warn!("failed to stop system log capture: {e}");
    }
    result
}

fn serve_and_run(
    config: &RunConfig,
    device: &DeviceTool,
    package_paths: &[PathBuf],
    strategy: &mut dyn TestStrategy,
) -> Result<TestOutcome> {
    // Declared before the server so an unwind drops the server first.
    let mut repo = ResourceRepo::resolve(config.repo_path.as_deref())?;
    publish_packages(package_paths, &repo, config.repo_init)?;

    let mut server = PackageServer::new(device, &repo, config.serve_port);
    server.start()?;

    let result = strategy.run(device);
    match &result {
        Ok(outcome) => info!(
            "{} finished: {:?} (exit code {})",
            strategy.name(),
            outcome.verdict,
            outcome.exit_code
        ),
        Err(e) => warn!("{} did not finish: {e}", strategy.name()),
    }

    // Teardown runs no matter how the test went: stop the server first,
    // only then let the repository go away.
    if let Err(e) = server.stop() {
        warn!("failed to stop package server: {e}");
    }
    drop(server);
    if let Err(e) = repo.delete() {
        warn!("failed to delete temporary repository: {e}");
    }

    result
}
