use thiserror::Error;

/// Errors returned by graphics operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphicsError {
    /// A resolution must be a finite, positive number of pixels per inch.
    #[error("invalid resolution: {0} dpi")]
    InvalidResolution(f64),
    /// Line widths cannot be negative or non-finite.
    #[error("invalid line width: {0}")]
    InvalidLineWidth(f64),
    /// Opacity outside `0..=1`.
    #[error("invalid opacity: {0}")]
    InvalidOpacity(f64),
}
