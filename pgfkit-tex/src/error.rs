//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or interpreting a [`crate::TexConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration text is not valid JSON for [`crate::TexConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A TeX engine name other than `xelatex`, `lualatex` or `pdflatex`.
    #[error("unknown TeX system `{0}` (expected xelatex, lualatex or pdflatex)")]
    UnknownTexSystem(String),
    /// A font style name that is not `normal`, `italic` or `oblique`.
    #[error("unknown font style `{0}`")]
    UnknownFontStyle(String),
    /// A font weight that is neither a known name nor a number in 1..=1000.
    #[error("unknown font weight `{0}`")]
    UnknownFontWeight(String),
}
