//! Validated, immutable inputs of a single test run.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::cli_args::CliArgs;
use crate::error::{Result, RunError};

/// Which strategy the run dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestKind {
    /// Browser-engine tests run through the blink shell.
    BrowserEngine,
    /// A gtest-style executable test, carrying the executable name.
    Executable(String),
}

impl TestKind {
    fn from_test_type(test_type: &str) -> Self {
        if test_type == "blink" {
            TestKind::BrowserEngine
        } else {
            TestKind::Executable(test_type.to_string())
        }
    }
}

/// Everything one orchestrated run needs to know, checked up front so the
/// run itself never re-validates inputs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub test_kind: TestKind,
    pub target_id: Option<String>,
    pub out_dir: PathBuf,
    pub logs_dir: Option<PathBuf>,
    pub repo_path: Option<PathBuf>,
    pub repo_init: bool,
    pub serve_port: Option<u16>,
    pub device_tool: Option<PathBuf>,
    pub command_timeout: Duration,
    pub expectations_file: Option<PathBuf>,
    pub test_args: Vec<String>,
}

impl RunConfig {
    /// Validates the raw command line into a run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Configuration`] when the output directory is
    /// missing or empty, or when a browser-engine run lacks a target id.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let out_dir = match args.out_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => {
                return Err(RunError::Configuration(
                    "--out-dir must be specified".to_string(),
                ));
            }
        };

        if args.test_type.trim().is_empty() {
            return Err(RunError::Configuration(
                "test type must not be empty".to_string(),
            ));
        }

        let test_kind = TestKind::from_test_type(&args.test_type);
        if test_kind == TestKind::BrowserEngine && args.target_id.is_none() {
            return Err(RunError::Configuration(
                "blink tests require --target-id".to_string(),
            ));
        }

        Ok(RunConfig {
            test_kind,
            target_id: args.target_id,
            out_dir,
            logs_dir: args.logs_dir,
            repo_path: args.repo,
            repo_init: !args.no_repo_init,
            serve_port: args.serve_port,
            device_tool: args.device_tool,
            command_timeout: Duration::from_secs(args.command_timeout),
            expectations_file: args.expectations_file,
            test_args: args.test_args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::parse_from(argv)
    }

    #[test]
    fn missing_out_dir_is_a_configuration_error() {
        let args = parse(&["run_test", "base_unittests"]);
        let err = RunConfig::from_args(args).unwrap_err();
        assert!(matches!(err, RunError::Configuration(_)));
        assert!(err.to_string().contains("--out-dir"));
    }

    #[test]
    fn empty_out_dir_is_rejected() {
        let args = parse(&["run_test", "base_unittests", "--out-dir", ""]);
        assert!(RunConfig::from_args(args).is_err());
    }

    #[test]
    fn blink_selects_the_browser_engine_kind() {
        let args = parse(&[
            "run_test", "blink", "--out-dir", "/o", "--target-id", "dev1",
        ]);
        let config = RunConfig::from_args(args).unwrap();
        assert_eq!(config.test_kind, TestKind::BrowserEngine);
        assert_eq!(config.target_id.as_deref(), Some("dev1"));
    }

    #[test]
    fn blink_without_a_target_is_rejected() {
        let args = parse(&["run_test", "blink", "--out-dir", "/o"]);
        let err = RunConfig::from_args(args).unwrap_err();
        assert!(err.to_string().contains("--target-id"));
    }

    #[test]
    fn gtest_names_select_the_executable_kind() {
        let args = parse(&["run_test", "base_unittests", "--out-dir", "/o"]);
        let config = RunConfig::from_args(args).unwrap();
        assert_eq!(
            config.test_kind,
            TestKind::Executable("base_unittests".to_string())
        );
    }

    #[test]
    fn repo_init_is_on_by_default_and_disabled_by_the_flag() {
        let args = parse(&["run_test", "base_unittests", "--out-dir", "/o"]);
        assert!(RunConfig::from_args(args).unwrap().repo_init);

        let args = parse(&[
            "run_test",
            "base_unittests",
            "--out-dir",
            "/o",
            "--repo",
            "/srv/repo",
            "--no-repo-init",
        ]);
        let config = RunConfig::from_args(args).unwrap();
        assert!(!config.repo_init);
        assert_eq!(config.repo_path.as_deref(), Some(std::path::Path::new("/srv/repo")));
    }

    #[test]
    fn command_timeout_defaults_to_five_minutes() {
        let args = parse(&["run_test", "base_unittests", "--out-dir", "/o"]);
        let config = RunConfig::from_args(args).unwrap();
        assert_eq!(config.command_timeout, Duration::from_secs(300));
    }

    #[test]
    fn trailing_arguments_are_forwarded_verbatim() {
        let args = parse(&[
            "run_test",
            "base_unittests",
            "--out-dir",
            "/o",
            "--",
            "--gtest_filter=Foo.*",
            "--gtest_repeat=2",
        ]);
        let config = RunConfig::from_args(args).unwrap();
        assert_eq!(
            config.test_args,
            vec!["--gtest_filter=Foo.*", "--gtest_repeat=2"]
        );
    }

    #[test]
    fn verbosity_counts_repeats() {
        let args = parse(&["run_test", "base_unittests", "--out-dir", "/o", "-vv"]);
        assert_eq!(args.verbose, 2);
    }
}
