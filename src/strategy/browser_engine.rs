//! Browser-engine test strategy.

use std::path::PathBuf;

use log::info;

use crate::device::DeviceTool;
use crate::error::{Result, RunError};
use crate::strategy::{TestOutcome, TestStrategy, required_archives};

/// Archives a browser-engine run needs, relative to `<out-dir>/packages`.
const REQUIRED_PACKAGES: [&str; 2] = ["web_engine.pkg", "blink_shell.pkg"];
/// The component the tests are launched through.
const SHELL_PACKAGE: &str = "blink_shell";

/// Runs blink web tests through the blink shell.
pub struct BrowserEngineStrategy {
    out_dir: PathBuf,
    test_args: Vec<String>,
    target_id: Option<String>,
}

impl BrowserEngineStrategy {
    pub fn new(out_dir: PathBuf, test_args: Vec<String>, target_id: Option<String>) -> Self {
        BrowserEngineStrategy {
            out_dir,
            test_args,
            target_id,
        }
    }
}

impl TestStrategy for BrowserEngineStrategy {
    fn name(&self) -> &str {
        "blink"
    }

    fn package_paths(&self) -> Result<Vec<PathBuf>> {
        required_archives(&self.out_dir, &REQUIRED_PACKAGES)
    }

    fn run(&mut self, device: &DeviceTool) -> Result<TestOutcome> {
        info!(
            "running blink tests on {}",
            self.target_id.as_deref().unwrap_or("the default target")
        );
        let mut args = vec![
            "test".to_string(),
            "run".to_string(),
            SHELL_PACKAGE.to_string(),
        ];
        if !self.test_args.is_empty() {
            args.push("--".to_string());
            args.extend(self.test_args.iter().cloned());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let exit_code = device
            .run_streaming(&arg_refs)
            .map_err(|e| RunError::Strategy(format!("{e:#}")))?;
        Ok(TestOutcome::from_exit_code(exit_code))
    }
}
