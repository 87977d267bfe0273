//! Text metrics from a long-lived TeX subprocess.
//!
//! Correct text extents need TeX's own font stack, so the
//! [`MetricsOracle`] keeps one TeX process at its interactive prompt and
//! asks it for box dimensions. Answers are cached for the life of the
//! oracle; the font setup is fixed when it starts.
//!
//! The process itself sits behind the [`TexEngine`] trait. [`SystemTex`]
//! runs the configured TeX binary; the `scripted` feature adds an
//! in-memory stand-in for tests.

pub mod engine;
pub mod error;
pub mod metrics;
pub mod oracle;
pub mod stream;

#[cfg(any(test, feature = "scripted"))]
pub mod scripted;

pub use engine::{BatchOutput, SystemTex, TexEngine, TexProcess};
pub use error::OracleError;
pub use metrics::MetricsResult;
pub use oracle::MetricsOracle;
pub use stream::CancelToken;
