//! Process logging setup.
//!
//! Records go to stdout in the fleet tooling's shape: severity initial,
//! seconds since startup right-aligned, issuing thread, message. The
//! startup instant is captured when the logger is built, so elapsed times
//! are scoped to this process rather than to any global state.

use std::fmt;
use std::io::Write;
use std::time::Instant;

use env_logger::{Builder, Env, Target};
use log::{Level, LevelFilter};

/// Maps a `-v` count to the default severity threshold.
pub fn level_for(verbose_count: u8) -> LevelFilter {
    match verbose_count {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Initializes the global logger. `RUST_LOG` still overrides the threshold
/// derived from the verbosity count.
pub fn init(verbose_count: u8) {
    let started = Instant::now();
    let env = Env::default().default_filter_or(level_for(verbose_count).as_str());
    Builder::from_env(env)
        .target(Target::Stdout)
        .format(move |buf, record| {
            let line = format_record(
                record.level(),
                started.elapsed().as_secs(),
                &thread_label(),
                record.args(),
            );
            writeln!(buf, "{line}")
        })
        .init();
}

/// Shortens the main thread's label; other threads keep their name.
fn thread_label() -> String {
    match std::thread::current().name() {
        Some("main") => "Main".to_string(),
        Some(name) => name.to_string(),
        None => "?".to_string(),
    }
}

fn format_record(
    level: Level,
    elapsed_secs: u64,
    thread: &str,
    message: &dyn fmt::Display,
) -> String {
    format!(
        "{} {:>4}s {:<4}  {}",
        level_initial(level),
        elapsed_secs,
        thread,
        message
    )
}

fn level_initial(level: Level) -> char {
    match level {
        Level::Error => 'E',
        Level::Warn => 'W',
        Level::Info => 'I',
        Level::Debug => 'D',
        Level::Trace => 'T',
    }
}
