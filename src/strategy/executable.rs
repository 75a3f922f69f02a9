//! Generic executable (gtest-style) test strategy.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{debug, info};

use crate::device::DeviceTool;
use crate::error::{Result, RunError};
use crate::strategy::{TestOutcome, TestStrategy, required_archives};

/// Runs a named gtest-style executable test on the device.
pub struct ExecutableStrategy {
    out_dir: PathBuf,
    test_args: Vec<String>,
    test_name: String,
    target_id: Option<String>,
    expectations_file: Option<PathBuf>,
}

impl ExecutableStrategy {
    pub fn new(
        out_dir: PathBuf,
        test_args: Vec<String>,
        test_name: String,
        target_id: Option<String>,
        expectations_file: Option<PathBuf>,
    ) -> Self {
        ExecutableStrategy {
            out_dir,
            test_args,
            test_name,
            target_id,
            expectations_file,
        }
    }

    /// Assembles the device-side argument list, folding the expectations
    /// file (when given) into a gtest filter.
    fn device_args(&self) -> Result<Vec<String>> {
        let mut args = self.test_args.clone();
        let expectations = read_expectations(self.expectations_file.as_deref())
            .map_err(|e| RunError::Strategy(format!("{e:#}")))?;
        if !expectations.is_empty() {
            args.push(format!("--gtest_filter={}", expectations.join(":")));
        }
        Ok(args)
    }
}

impl TestStrategy for ExecutableStrategy {
    fn name(&self) -> &str {
        &self.test_name
    }

    fn package_paths(&self) -> Result<Vec<PathBuf>> {
        let archive = format!("{}.pkg", self.test_name);
        required_archives(&self.out_dir, &[archive.as_str()])
    }

    fn run(&mut self, device: &DeviceTool) -> Result<TestOutcome> {
        info!(
            "running {} on {}",
            self.test_name,
            self.target_id.as_deref().unwrap_or("the default target")
        );
        let device_args = self.device_args()?;
        let mut args = vec![
            "test".to_string(),
            "run".to_string(),
            self.test_name.clone(),
        ];
        if !device_args.is_empty() {
            args.push("--".to_string());
            args.extend(device_args);
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let exit_code = device
            .run_streaming(&arg_refs)
            .map_err(|e| RunError::Strategy(format!("{e:#}")))?;
        Ok(TestOutcome::from_exit_code(exit_code))
    }
}

/// Reads a test-expectations file: one test name per line, blank lines and
/// `#` comments ignored. Unset or missing files yield an empty list.
fn read_expectations(path: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    if !path.exists() {
        debug!("expectations file {} does not exist, ignoring", path.display());
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read expectations file {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
