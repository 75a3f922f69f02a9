//! Run configuration: the command-line surface and its validated form.

pub mod cli_args;
pub mod run_config;

pub use cli_args::CliArgs;
pub use run_config::{RunConfig, TestKind};
