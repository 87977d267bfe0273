//! Graphics state shared by every draw call.
//!
//! A [`GraphicsState`] is a read-only snapshot: the host builds one per
//! draw call and the emitter only ever borrows it.

use kurbo::Rect;

use crate::error::GraphicsError;
use crate::path::Path;
use crate::units::Device;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// RGB color with alpha, all components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// An opaque color.
    #[inline]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[inline]
    pub const fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// The color components clamped to [0, 1].
    #[inline]
    pub fn rgb(self) -> [f64; 3] {
        [
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        ]
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

// ---------------------------------------------------------------------------
// LineCap / LineJoin
// ---------------------------------------------------------------------------

/// Stroke line-cap styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Projecting,
}

/// Stroke line-join styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    Miter,
    #[default]
    Round,
    Bevel,
}

// ---------------------------------------------------------------------------
// Line style and dashes
// ---------------------------------------------------------------------------

/// A dash pattern: alternating on/off lengths with an offset.
#[derive(Debug, Clone, PartialEq)]
pub struct DashPattern {
    /// Alternating on, off, on, off, ... lengths.
    pub dashes: Vec<Device>,
    /// Starting offset into the pattern.
    pub offset: Device,
}

/// Named line styles. The named dashes scale with the line width.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    DashDot,
    Dotted,
    /// Host-supplied dash list, used as given.
    Custom { offset: Device, dashes: Vec<Device> },
}

impl LineStyle {
    /// The dash pattern for a stroke of width `width`, or `None` for a
    /// continuous line.
    pub fn dash_pattern(&self, width: Device) -> Option<DashPattern> {
        let dashes = match self {
            Self::Solid => return None,
            Self::Dashed => vec![width * 2.5, width * 2.5],
            Self::DashDot => vec![width * 3.0, width * 3.0, width, width * 3.0],
            Self::Dotted => vec![width, width * 3.0],
            Self::Custom { offset, dashes } => {
                if dashes.is_empty() {
                    return None;
                }
                return Some(DashPattern {
                    dashes: dashes.clone(),
                    offset: *offset,
                });
            }
        };
        Some(DashPattern {
            dashes,
            offset: Device::ZERO,
        })
    }
}

// ---------------------------------------------------------------------------
// Hatch
// ---------------------------------------------------------------------------

/// A hatch fill: `tile` is drawn in a unit square and repeated over the
/// filled region at one tile per inch.
#[derive(Debug, Clone, PartialEq)]
pub struct Hatch {
    pub tile: Path,
    pub color: Rgba,
    pub line_width: Device,
}

// ---------------------------------------------------------------------------
// GraphicsState
// ---------------------------------------------------------------------------

/// Drawing parameters for one draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    pub stroke: Rgba,
    /// `None` means the shape is not filled.
    pub fill: Option<Rgba>,
    pub line_width: Device,
    pub cap: LineCap,
    pub join: LineJoin,
    pub line_style: LineStyle,
    /// Axis-aligned clip box in device space.
    pub clip_rect: Option<Rect>,
    /// Arbitrary clip path; intersected with `clip_rect` when both are set.
    pub clip_path: Option<Path>,
    /// Overrides the alpha of both colors when set.
    pub alpha: Option<f64>,
    pub hatch: Option<Hatch>,
}

impl GraphicsState {
    /// Opacity for strokes.
    pub fn stroke_opacity(&self) -> f64 {
        self.alpha.unwrap_or(self.stroke.a)
    }

    /// Opacity for fills, or `None` if nothing is filled.
    pub fn fill_opacity(&self) -> Option<f64> {
        self.fill.map(|fill| self.alpha.unwrap_or(fill.a))
    }

    /// Whether a stroke is drawn at all.
    pub fn strokes(&self) -> bool {
        self.line_width != Device::ZERO
    }

    pub const fn fills(&self) -> bool {
        self.fill.is_some()
    }

    /// The dash pattern derived from the line style and width.
    pub fn dash_pattern(&self) -> Option<DashPattern> {
        self.line_style.dash_pattern(self.line_width)
    }

    /// Check the numeric fields.
    ///
    /// # Errors
    ///
    /// Reports the first negative or non-finite line width or an opacity
    /// outside `0..=1`.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if !self.line_width.is_finite() || self.line_width.value() < 0.0 {
            return Err(GraphicsError::InvalidLineWidth(self.line_width.value()));
        }
        if let Some(alpha) = self.alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(GraphicsError::InvalidOpacity(alpha));
            }
        }
        Ok(())
    }

    // -- builder-style setters --

    #[must_use]
    pub fn with_stroke(mut self, color: Rgba) -> Self {
        self.stroke = color;
        self
    }

    #[must_use]
    pub fn with_fill(mut self, color: Rgba) -> Self {
        self.fill = Some(color);
        self
    }

    #[must_use]
    pub fn with_line_width(mut self, width: Device) -> Self {
        self.line_width = width;
        self
    }

    #[must_use]
    pub fn with_line_style(mut self, style: LineStyle) -> Self {
        self.line_style = style;
        self
    }

    #[must_use]
    pub fn with_clip_rect(mut self, rect: Rect) -> Self {
        self.clip_rect = Some(rect);
        self
    }

    #[must_use]
    pub fn with_clip_path(mut self, path: Path) -> Self {
        self.clip_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    #[must_use]
    pub fn with_hatch(mut self, hatch: Hatch) -> Self {
        self.hatch = Some(hatch);
        self
    }
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            stroke: Rgba::BLACK,
            fill: None,
            line_width: Device(1.0),
            cap: LineCap::default(),
            join: LineJoin::default(),
            line_style: LineStyle::Solid,
            clip_rect: None,
            clip_path: None,
            alpha: None,
            hatch: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
