//! Metrics oracle errors.
//!
//! Every variant raised while talking to TeX carries the text being
//! measured and whatever TeX printed, so a failed render can show the
//! TeX error that caused it.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`crate::MetricsOracle`].
#[derive(Debug, Error)]
pub enum OracleError {
    /// TeX could not be started or rejected the header (missing font,
    /// broken preamble).
    #[error("{program} failed to start: {message}")]
    Startup {
        program: String,
        message: String,
        output: String,
    },
    /// The TeX process exited or closed its output mid-query.
    #[error("TeX halted while processing `{text}`")]
    ProcessHalted { text: String, output: String },
    /// TeX answered, but not with three dimensions.
    #[error("cannot parse TeX metrics for `{text}`: got `{reply}`")]
    MetricsParse {
        text: String,
        reply: String,
        output: String,
    },
    /// No prompt within the configured timeout.
    #[error("TeX did not answer within {}s while processing `{text}`", timeout.as_secs_f64())]
    Timeout {
        text: String,
        timeout: Duration,
        output: String,
    },
    /// The session's cancel token fired during a query.
    #[error("query cancelled while processing `{text}`")]
    Cancelled { text: String, output: String },
    /// The oracle was shut down, by request or after an earlier failure.
    #[error("the metrics oracle has been terminated")]
    Terminated,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OracleError {
    /// Captured TeX output, if the error carries any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Startup { output, .. }
            | Self::ProcessHalted { output, .. }
            | Self::MetricsParse { output, .. }
            | Self::Timeout { output, .. }
            | Self::Cancelled { output, .. } => Some(output),
            Self::Terminated | Self::Io(_) => None,
        }
    }
}
