//! Error taxonomy for a test run.

use thiserror::Error;

/// Classified failures of a test run, roughly ordered by the stage in which
/// they can occur.
#[derive(Debug, Error)]
pub enum RunError {
    /// Required input is missing or invalid; nothing was acquired yet.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The target device did not answer, or device-side plumbing could not
    /// be set up.
    #[error("target device unreachable: {0}")]
    Connection(String),

    /// Publishing packages into the repository failed.
    #[error("package publication failed: {0}")]
    Publish(String),

    /// The package server could not be started or stopped.
    #[error("package server failed: {0}")]
    Serve(String),

    /// The selected test strategy failed before or while running the test.
    #[error("test strategy failed: {0}")]
    Strategy(String),
}

pub type Result<T> = std::result::Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_failure_stage() {
        let err = RunError::Configuration("--out-dir must be specified".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: --out-dir must be specified"
        );

        let err = RunError::Serve("serve start exited with 3".to_string());
        assert!(err.to_string().starts_with("package server failed"));
    }
}
