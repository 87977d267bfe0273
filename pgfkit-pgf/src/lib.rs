//! PGF backend for vector scenes.
//!
//! Converts the draw calls of a [`Scene`] into PGF picture code: paths,
//! markers, hatches, raster images and text. The output can be a fragment
//! for `\input` into another document, or a standalone PDF compiled with
//! the configured TeX engine.
//!
//! Key design points:
//! - Coordinates are converted from device pixels to TeX points exactly
//!   once, at emission, through the scene's [`Resolution`].
//! - Every draw call is wrapped in its own `pgfscope`, so no graphics
//!   state leaks between calls.
//! - Text sizes come from a real TeX process (`pgfkit-oracle`), started
//!   on the first measurement of a render and stopped when it ends.
//!
//! [`Resolution`]: pgfkit_graphics::Resolution

pub mod compile;
pub mod driver;
pub mod emit;
pub mod error;
pub mod image;
pub mod scene;
pub mod text;
pub mod writer;

pub use compile::{CommandOutput, CommandRunner, SystemRunner};
pub use driver::{ImageTarget, RenderOptions, Renderer};
pub use error::{CompileError, RenderError};
pub use image::RasterImage;
pub use scene::{DrawSink, HAlign, Scene, TextExtent, TextItem, VAlign};
