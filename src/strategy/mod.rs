//! Pluggable test-execution strategies.

use std::path::{Path, PathBuf};

use crate::config::{RunConfig, TestKind};
use crate::device::DeviceTool;
use crate::error::{Result, RunError};

pub mod browser_engine;
pub mod executable;

pub use browser_engine::BrowserEngineStrategy;
pub use executable::ExecutableStrategy;

/// Verdict carried by a finished test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    /// The test produced no regular exit code (timeout or signal death).
    Error,
}

/// Final result of a test run; the process exit code mirrors `exit_code`.
#[derive(Debug, Clone, Copy)]
pub struct TestOutcome {
    pub exit_code: i32,
    pub verdict: Verdict,
}

impl TestOutcome {
    /// Classifies a device-side exit code.
    pub fn from_exit_code(exit_code: i32) -> Self {
        let verdict = match exit_code {
            0 => Verdict::Pass,
            code if code < 0 => Verdict::Error,
            _ => Verdict::Fail,
        };
        TestOutcome { exit_code, verdict }
    }
}

/// One way of executing a test on the device.
///
/// Strategies name the package archives they need published and run the
/// test itself; they own neither the repository nor the server.
pub trait TestStrategy {
    /// Strategy name for logging.
    fn name(&self) -> &str;

    /// Package archives the test needs, resolved against the build output
    /// directory. Fails when an archive is missing.
    fn package_paths(&self) -> Result<Vec<PathBuf>>;

    /// Runs the test against the device and reports its outcome.
    fn run(&mut self, device: &DeviceTool) -> Result<TestOutcome>;
}

/// Selects the strategy for the configured test kind.
pub fn select_strategy(config: &RunConfig) -> Box<dyn TestStrategy> {
    match &config.test_kind {
        TestKind::BrowserEngine => Box::new(BrowserEngineStrategy::new(
            config.out_dir.clone(),
            config.test_args.clone(),
            config.target_id.clone(),
        )),
        TestKind::Executable(name) => Box::new(ExecutableStrategy::new(
            config.out_dir.clone(),
            config.test_args.clone(),
            name.clone(),
            config.target_id.clone(),
            config.expectations_file.clone(),
        )),
    }
}

/// Resolves archive names under `<out_dir>/packages`, failing when one is
/// missing.
pub(crate) fn required_archives(out_dir: &Path, names: &[&str]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(names.len());
    for name in names {
        let path = out_dir.join("packages").join(name);
        if !path.exists() {
            return Err(RunError::Strategy(format!(
                "package archive {} is missing from the build output",
                path.display()
            )));
        }
        paths.push(path);
    }
    Ok(paths)
}
