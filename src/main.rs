mod cleanup;
mod config;
mod device;
mod error;
mod log_session;
mod logging;
mod orchestrator;
mod publish;
mod repo;
mod server;
mod strategy;

use log::error;

use crate::config::{CliArgs, RunConfig};
use crate::error::Result;
use crate::strategy::TestOutcome;

fn main() {
    let args = CliArgs::parse_args();
    logging::init(args.verbose);
    cleanup::install_signal_hook();

    std::process::exit(match run(args) {
        Ok(outcome) => outcome.exit_code,
        Err(e) => {
            error!("test run failed: {e}");
            1
        }
    });
}

fn run(args: CliArgs) -> Result<TestOutcome> {
    let config = RunConfig::from_args(args)?;
    orchestrator::run(&config)
}
