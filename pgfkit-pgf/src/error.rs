//! Render errors.

use std::path::PathBuf;

use pgfkit_graphics::GraphicsError;
use pgfkit_oracle::OracleError;
use thiserror::Error;

/// Errors returned while rendering a scene.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Text measurement failed; the render is abandoned.
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Graphics(#[from] GraphicsError),
    #[error("image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },
    /// Pixel buffer and dimensions disagree.
    #[error("invalid raster image: {0}")]
    InvalidImage(String),
    /// The scene draws an image but the output has no directory to put it in.
    #[error("the scene contains images but no image directory was given")]
    NoImageTarget,
    #[error("unsupported output format `{0}` (expected .pgf or .pdf)")]
    UnsupportedFormat(String),
}

/// The TeX compile step of a standalone document failed.
#[derive(Debug, Error)]
#[error("{program} failed ({status}) while compiling the figure")]
pub struct CompileError {
    pub program: String,
    pub status: String,
    /// What TeX printed.
    pub output: String,
    /// The picture code that was being compiled.
    pub fragment: String,
}
