//! Raster images, stored beside the picture and referenced by name.

use std::io::{self, Write};
use std::path::Path;

use ::image::{ImageFormat, RgbaImage};
use kurbo::Point;
use pgfkit_graphics::{Device, GraphicsState};

use crate::emit::Emitter;
use crate::error::RenderError;

/// An 8-bit RGBA bitmap.
///
/// Rows are stored bottom-up, the first row being the lowest on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RasterImage {
    /// Wrap `rgba`, four bytes per pixel, bottom row first.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, RenderError> {
        let expected = u64::from(width) * u64::from(height) * 4;
        if rgba.len() as u64 != expected {
            return Err(RenderError::InvalidImage(format!(
                "{width}x{height} needs {expected} bytes, got {}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Load a PNG file. The file's top row becomes the last row.
    pub fn from_png_file(path: &Path) -> Result<Self, RenderError> {
        let decoded = ::image::open(path)
            .map_err(|source| RenderError::Image {
                path: path.to_owned(),
                source,
            })?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let rgba = flip_rows(decoded.as_raw(), width);
        Self::new(width, height, rgba)
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.rgba
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Write as PNG, top row first.
    pub fn write_png(&self, path: &Path) -> Result<(), RenderError> {
        let to_error = |source| RenderError::Image {
            path: path.to_owned(),
            source,
        };
        let flipped = flip_rows(&self.rgba, self.width);
        let Some(buffer) = RgbaImage::from_raw(self.width, self.height, flipped) else {
            return Err(RenderError::InvalidImage(format!(
                "{}x{} pixel buffer is too short",
                self.width, self.height
            )));
        };
        buffer
            .save_with_format(path, ImageFormat::Png)
            .map_err(to_error)
    }
}

fn flip_rows(rgba: &[u8], width: u32) -> Vec<u8> {
    let stride = width as usize * 4;
    if stride == 0 {
        return rgba.to_vec();
    }
    rgba.chunks_exact(stride).rev().flatten().copied().collect()
}

impl<W: Write> Emitter<W> {
    /// Reference an image file of `width` x `height` device pixels with its
    /// lower-left corner at `origin`.
    pub fn image(
        &mut self,
        gc: &GraphicsState,
        origin: Point,
        width: u32,
        height: u32,
        file_name: &str,
    ) -> io::Result<()> {
        self.out.line(r"\begin{pgfscope}")?;
        self.clip(gc)?;
        let at = self.resolution.point_to_tex(origin);
        let shift = format!(
            r"\pgfsys@transformshift{{{}}}{{{}}}",
            self.out.dim(at.x),
            self.out.dim(at.y)
        );
        self.out.line(&shift)?;
        let w = self.out.dim(self.resolution.to_tex(Device(f64::from(width))));
        let h = self.out.dim(self.resolution.to_tex(Device(f64::from(height))));
        self.out.line(&format!(
            r"\pgftext[left,bottom]{{\pgfimage[interpolate=true,width={w},height={h}]{{{file_name}}}}}"
        ))?;
        self.out.line(r"\end{pgfscope}")
    }
}
