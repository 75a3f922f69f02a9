use clap::Parser;
use std::path::PathBuf;

// run_test - publish, serve and run a single test against a target device
#[derive(Parser, Debug)]
#[clap(
    name = "run_test",
    version,
    about = "Publish, serve and run a single test against a target device",
    override_usage = "run_test <TEST_TYPE> --out-dir <DIR> [OPTIONS] [-- <TEST_ARGS>...]",
    after_help = "TEST TYPES:\n  blink                  Browser-engine test run through the blink shell\n  <gtest name>           Any gtest-style executable test, e.g. base_unittests\n\nDEVICE TOOL LOOKUP:\n  --device-tool, then $DEVCTL, then <out-dir>/host-tools/devctl,\n  then `devctl` on PATH\n\nEXAMPLES:\n  run_test blink --out-dir out/device --target-id dev1\n  run_test base_unittests --out-dir out/device -- --gtest_repeat=3\n  run_test blink --out-dir out/device --repo /srv/repo --no-repo-init\n  run_test net_unittests --out-dir out/device --logs-dir /tmp/logs -vv"
)]
pub struct CliArgs {
    // Test type - 'blink' for browser-engine tests, otherwise a gtest name
    #[clap(value_name = "TEST_TYPE", help = "Test to run: 'blink' or a gtest name")]
    pub test_type: String,

    // Target device - which device the run is directed at
    #[clap(long = "target-id", value_name = "ID", help = "Target device identifier")]
    pub target_id: Option<String>,

    // Build output directory - holds package archives and bundled host tools
    #[clap(long = "out-dir", value_name = "DIR", help = "Build output directory")]
    pub out_dir: Option<PathBuf>,

    // System log capture directory - capture is disabled when unset
    #[clap(long = "logs-dir", value_name = "DIR", help = "Directory for device system log capture")]
    pub logs_dir: Option<PathBuf>,

    // Package repository - a temporary one is created and removed when unset
    #[clap(long = "repo", value_name = "DIR", help = "Existing package repository to publish into")]
    pub repo: Option<PathBuf>,

    // Skip package index initialization - the repository must already have one
    #[clap(long = "no-repo-init", help = "Do not initialize the repository package index")]
    pub no_repo_init: bool,

    // Package server port on the host
    #[clap(long = "serve-port", value_name = "PORT", help = "Host port for the package server")]
    pub serve_port: Option<u16>,

    // Device controller executable override
    #[clap(long = "device-tool", value_name = "PATH", help = "Device controller executable")]
    pub device_tool: Option<PathBuf>,

    // Per-command timeout (seconds)
    #[clap(
        long = "command-timeout",
        value_name = "SECS",
        default_value = "300",
        help = "Device command timeout in seconds"
    )]
    pub command_timeout: u64,

    // Test expectations file - one test name per line, '#' comments allowed
    #[clap(long = "expectations-file", value_name = "FILE", help = "File listing tests to run")]
    pub expectations_file: Option<PathBuf>,

    // Verbosity - repeat for more detail (-v info, -vv debug)
    #[clap(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase log verbosity"
    )]
    pub verbose: u8,

    // Everything unrecognized is forwarded verbatim to the selected test
    #[clap(
        value_name = "TEST_ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Arguments forwarded to the test"
    )]
    pub test_args: Vec<String>,
}

impl CliArgs {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
