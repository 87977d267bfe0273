//! The host side of a render.
//!
//! A [`Scene`] knows its physical size and replays its draw calls into a
//! [`DrawSink`]. The renderer is the only sink in this crate; hosts never
//! see PGF.

use kurbo::Point;
use pgfkit_graphics::{Device, GraphicsState, Inches, Path, Resolution, Rgba};
use pgfkit_tex::FontDescriptor;

use crate::error::RenderError;
use crate::image::RasterImage;

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Horizontal text alignment, relative to the text's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    #[default]
    Left,
    Right,
    Center,
}

impl HAlign {
    /// The `\pgftext` anchor keyword; centered text takes none.
    pub const fn anchor(self) -> Option<&'static str> {
        match self {
            Self::Left => Some("left"),
            Self::Right => Some("right"),
            Self::Center => None,
        }
    }
}

/// Vertical text alignment, relative to the text's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    Bottom,
    #[default]
    Baseline,
    Center,
}

impl VAlign {
    pub const fn anchor(self) -> Option<&'static str> {
        match self {
            Self::Top => Some("top"),
            Self::Bottom => Some("bottom"),
            Self::Baseline => Some("base"),
            Self::Center => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// A positioned piece of text.
///
/// `halign` and `valign` pick the anchor in the text's own frame, before
/// `angle` is applied. Text rotated by 90 degrees is not re-anchored, so a
/// `Right`/`Top` label keeps the `right,top` corner of the unrotated box
/// at `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    /// Raw host text; may contain `$...$` math.
    pub text: String,
    /// Anchor point in device space.
    pub position: Point,
    pub font: FontDescriptor,
    /// Counter-clockwise rotation in degrees.
    pub angle: f64,
    pub halign: HAlign,
    pub valign: VAlign,
    pub color: Rgba,
    pub visible: bool,
}

impl TextItem {
    pub fn new(text: impl Into<String>, position: Point, font: FontDescriptor) -> Self {
        Self {
            text: text.into(),
            position,
            font,
            angle: 0.0,
            halign: HAlign::default(),
            valign: VAlign::default(),
            color: Rgba::BLACK,
            visible: true,
        }
    }
}

/// Rendered size of a text box in device units.
///
/// `height` includes `descent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: Device,
    pub height: Device,
    pub descent: Device,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Receiver of draw calls.
///
/// All errors are fatal to the render; a sink never substitutes default
/// values for failed work.
pub trait DrawSink {
    /// Stroke and/or fill a path.
    fn draw_path(&mut self, gc: &GraphicsState, path: &Path) -> Result<(), RenderError>;

    /// Stamp `marker` (in offsets from the vertex) at every vertex of `path`.
    fn draw_markers(
        &mut self,
        gc: &GraphicsState,
        marker: &Path,
        path: &Path,
    ) -> Result<(), RenderError>;

    fn draw_text(&mut self, item: &TextItem) -> Result<(), RenderError>;

    /// Embed a bitmap with its lower-left corner at `origin`.
    fn draw_image(
        &mut self,
        gc: &GraphicsState,
        origin: Point,
        image: &RasterImage,
    ) -> Result<(), RenderError>;

    /// Measure how large `text` renders with `font`.
    ///
    /// # Errors
    ///
    /// Fails when the metrics oracle cannot answer; there is no fallback.
    fn text_extent(
        &mut self,
        text: &str,
        font: &FontDescriptor,
    ) -> Result<TextExtent, RenderError>;
}

/// A drawable figure.
pub trait Scene {
    /// Physical width and height.
    fn size(&self) -> (Inches, Inches);

    /// Device pixels per inch.
    fn resolution(&self) -> Resolution;

    /// Replay every draw call into `sink`, in paint order.
    fn draw(&self, sink: &mut dyn DrawSink) -> Result<(), RenderError>;

    /// Text objects placed after the draw stream.
    fn texts(&self) -> Vec<TextItem> {
        Vec::new()
    }
}
