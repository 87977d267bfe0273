//! JSON scene files.
//!
//! A scene file describes one figure: its size in inches, its resolution
//! and an ordered list of draw calls in device pixels. Images are PNG files
//! referenced relative to the scene file.
//!
//! ```json
//! {
//!   "width": 4, "height": 3, "dpi": 100,
//!   "draws": [
//!     { "type": "path",
//!       "gc": { "stroke": [0, 0, 1], "line_width": 2, "dash": "dashed" },
//!       "path": { "segments": [{ "move": [10, 10] }, { "line": [390, 290] }] } },
//!     { "type": "text", "text": "$y = x$", "x": 200, "y": 150, "halign": "center" }
//!   ],
//!   "texts": []
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use kurbo::{Affine, Point, Rect};
use pgfkit_graphics::{
    Device, GraphicsState, Hatch, Inches, LineCap, LineJoin, LineStyle, Path as GraphicsPath,
    PathSegment, Points, Resolution, Rgba,
};
use pgfkit_pgf::{DrawSink, HAlign, RasterImage, RenderError, Scene, TextItem, VAlign};
use pgfkit_tex::{ConfigError, FontDescriptor, FontFamily, FontStyle, FontWeight};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading a scene file.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid scene file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid scene: {0}")]
    Invalid(String),
    #[error(transparent)]
    Font(#[from] ConfigError),
    #[error("cannot load image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: RenderError,
    },
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneFile {
    width: f64,
    height: f64,
    #[serde(default = "default_dpi")]
    dpi: f64,
    #[serde(default)]
    draws: Vec<DrawDto>,
    #[serde(default)]
    texts: Vec<TextDto>,
}

const fn default_dpi() -> f64 {
    100.0
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum DrawDto {
    Path {
        #[serde(default)]
        gc: GcDto,
        path: PathDto,
    },
    Markers {
        #[serde(default)]
        gc: GcDto,
        marker: PathDto,
        path: PathDto,
    },
    Text(TextDto),
    Image {
        #[serde(default)]
        gc: GcDto,
        x: f64,
        y: f64,
        file: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SegmentDto {
    Move([f64; 2]),
    Line([f64; 2]),
    Quad([[f64; 2]; 2]),
    Cubic([[f64; 2]; 3]),
    Close,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathDto {
    segments: Vec<SegmentDto>,
    /// `[a, b, c, d, e, f]` as in `kurbo::Affine::new`.
    #[serde(default)]
    transform: Option<[f64; 6]>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DashDto {
    Named(String),
    Custom { offset: f64, dashes: Vec<f64> },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GcDto {
    stroke: Option<Vec<f64>>,
    fill: Option<Vec<f64>>,
    line_width: Option<f64>,
    cap: Option<String>,
    join: Option<String>,
    dash: Option<DashDto>,
    clip_rect: Option<[f64; 4]>,
    clip_path: Option<PathDto>,
    alpha: Option<f64>,
    hatch: Option<HatchDto>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HatchDto {
    tile: PathDto,
    #[serde(default)]
    color: Option<Vec<f64>>,
    #[serde(default = "default_hatch_width")]
    line_width: f64,
}

const fn default_hatch_width() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WeightDto {
    Numeric(u16),
    Named(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FontDto {
    family: Option<String>,
    size: Option<f64>,
    style: Option<String>,
    weight: Option<WeightDto>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TextDto {
    text: String,
    x: f64,
    y: f64,
    #[serde(default)]
    font: FontDto,
    #[serde(default)]
    angle: f64,
    #[serde(default)]
    halign: HAlign,
    #[serde(default)]
    valign: VAlign,
    #[serde(default)]
    color: Option<Vec<f64>>,
    #[serde(default = "default_visible")]
    visible: bool,
}

const fn default_visible() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

fn color(values: &[f64]) -> Result<Rgba, SceneError> {
    match *values {
        [r, g, b] => Ok(Rgba::new(r, g, b)),
        [r, g, b, a] => Ok(Rgba::new(r, g, b).with_alpha(a)),
        _ => Err(SceneError::Invalid(format!(
            "a color needs 3 or 4 components, got {}",
            values.len()
        ))),
    }
}

fn path(dto: &PathDto) -> GraphicsPath {
    let point = |[x, y]: [f64; 2]| Point::new(x, y);
    let segments = dto.segments.iter().map(|s| match *s {
        SegmentDto::Move(p) => PathSegment::MoveTo(point(p)),
        SegmentDto::Line(p) => PathSegment::LineTo(point(p)),
        SegmentDto::Quad([c, e]) => PathSegment::QuadraticCurveTo {
            control: point(c),
            end: point(e),
        },
        SegmentDto::Cubic([c1, c2, e]) => PathSegment::CubicCurveTo {
            control1: point(c1),
            control2: point(c2),
            end: point(e),
        },
        SegmentDto::Close => PathSegment::ClosePath,
    });
    let path: GraphicsPath = segments.collect();
    match dto.transform {
        Some(coeffs) => path.with_transform(Affine::new(coeffs)),
        None => path,
    }
}

fn keyword<T>(value: Option<&str>, what: &str, table: &[(&str, T)]) -> Result<Option<T>, SceneError>
where
    T: Copy,
{
    let Some(value) = value else {
        return Ok(None);
    };
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|&(_, v)| Some(v))
        .ok_or_else(|| SceneError::Invalid(format!("unknown {what} `{value}`")))
}

fn line_style(dto: &DashDto) -> Result<LineStyle, SceneError> {
    match dto {
        DashDto::Named(name) => match name.to_ascii_lowercase().as_str() {
            "solid" | "-" => Ok(LineStyle::Solid),
            "dashed" | "--" => Ok(LineStyle::Dashed),
            "dashdot" | "-." => Ok(LineStyle::DashDot),
            "dotted" | ":" => Ok(LineStyle::Dotted),
            _ => Err(SceneError::Invalid(format!("unknown dash style `{name}`"))),
        },
        DashDto::Custom { offset, dashes } => Ok(LineStyle::Custom {
            offset: Device(*offset),
            dashes: dashes.iter().copied().map(Device).collect(),
        }),
    }
}

fn graphics_state(dto: &GcDto) -> Result<GraphicsState, SceneError> {
    let mut gc = GraphicsState::default();
    if let Some(stroke) = &dto.stroke {
        gc.stroke = color(stroke)?;
    }
    gc.fill = dto.fill.as_deref().map(color).transpose()?;
    if let Some(width) = dto.line_width {
        gc.line_width = Device(width);
    }
    let caps = [
        ("butt", LineCap::Butt),
        ("round", LineCap::Round),
        ("projecting", LineCap::Projecting),
    ];
    if let Some(cap) = keyword(dto.cap.as_deref(), "cap style", &caps)? {
        gc.cap = cap;
    }
    let joins = [
        ("miter", LineJoin::Miter),
        ("round", LineJoin::Round),
        ("bevel", LineJoin::Bevel),
    ];
    if let Some(join) = keyword(dto.join.as_deref(), "join style", &joins)? {
        gc.join = join;
    }
    if let Some(dash) = &dto.dash {
        gc.line_style = line_style(dash)?;
    }
    gc.clip_rect = dto
        .clip_rect
        .map(|[x0, y0, x1, y1]| Rect::new(x0, y0, x1, y1));
    gc.clip_path = dto.clip_path.as_ref().map(path);
    gc.alpha = dto.alpha;
    gc.hatch = match &dto.hatch {
        Some(h) => Some(Hatch {
            tile: path(&h.tile),
            color: h.color.as_deref().map_or(Ok(gc.stroke), color)?,
            line_width: Device(h.line_width),
        }),
        None => None,
    };
    Ok(gc)
}

fn font(dto: &FontDto) -> Result<FontDescriptor, SceneError> {
    let mut font = FontDescriptor::default();
    if let Some(family) = &dto.family {
        font.family = FontFamily::from(family.as_str());
    }
    if let Some(size) = dto.size {
        font.size = Points(size);
    }
    if let Some(style) = &dto.style {
        font.style = style.parse::<FontStyle>()?;
    }
    font.weight = match &dto.weight {
        None => font.weight,
        Some(WeightDto::Numeric(w)) => FontWeight::from_numeric(*w),
        Some(WeightDto::Named(name)) => name.parse()?,
    };
    Ok(font)
}

fn text_item(dto: &TextDto) -> Result<TextItem, SceneError> {
    let mut item = TextItem::new(dto.text.clone(), Point::new(dto.x, dto.y), font(&dto.font)?);
    item.angle = dto.angle;
    item.halign = dto.halign;
    item.valign = dto.valign;
    if let Some(c) = &dto.color {
        item.color = color(c)?;
    }
    item.visible = dto.visible;
    Ok(item)
}

// ---------------------------------------------------------------------------
// Loaded scene
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Draw {
    Path(GraphicsState, GraphicsPath),
    Markers(GraphicsState, GraphicsPath, GraphicsPath),
    Text(TextItem),
    Image(GraphicsState, Point, RasterImage),
}

/// A scene read from a file, with its images loaded.
#[derive(Debug)]
pub struct FileScene {
    width: Inches,
    height: Inches,
    resolution: Resolution,
    draws: Vec<Draw>,
    texts: Vec<TextItem>,
}

impl FileScene {
    /// Read and validate `path`.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = fs::read_to_string(path).map_err(|source| SceneError::Read {
            path: path.to_owned(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json(&text, base).map_err(|e| match e {
            SceneError::Parse { source, .. } => SceneError::Parse {
                path: path.to_owned(),
                source,
            },
            other => other,
        })
    }

    /// Parse scene JSON; image files are resolved against `base`.
    pub fn from_json(text: &str, base: &Path) -> Result<Self, SceneError> {
        let file: SceneFile = serde_json::from_str(text).map_err(|source| SceneError::Parse {
            path: base.to_owned(),
            source,
        })?;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(file.width) || !positive(file.height) {
            return Err(SceneError::Invalid(format!(
                "figure size must be positive, got {}x{} in",
                file.width, file.height
            )));
        }
        let resolution = Resolution::new(file.dpi)
            .map_err(|e| SceneError::Invalid(e.to_string()))?;

        let mut draws = Vec::with_capacity(file.draws.len());
        for dto in &file.draws {
            draws.push(match dto {
                DrawDto::Path { gc, path: p } => Draw::Path(graphics_state(gc)?, path(p)),
                DrawDto::Markers { gc, marker, path: p } => {
                    Draw::Markers(graphics_state(gc)?, path(marker), path(p))
                }
                DrawDto::Text(t) => Draw::Text(text_item(t)?),
                DrawDto::Image { gc, x, y, file } => {
                    let image_path = base.join(file);
                    let image = RasterImage::from_png_file(&image_path).map_err(|source| {
                        SceneError::Image {
                            path: image_path.clone(),
                            source,
                        }
                    })?;
                    Draw::Image(graphics_state(gc)?, Point::new(*x, *y), image)
                }
            });
        }
        let texts = file.texts.iter().map(text_item).collect::<Result<_, _>>()?;

        Ok(Self {
            width: Inches(file.width),
            height: Inches(file.height),
            resolution,
            draws,
            texts,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }
}

impl Scene for FileScene {
    fn size(&self) -> (Inches, Inches) {
        (self.width, self.height)
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn draw(&self, sink: &mut dyn DrawSink) -> Result<(), RenderError> {
        for draw in &self.draws {
            match draw {
                Draw::Path(gc, path) => sink.draw_path(gc, path)?,
                Draw::Markers(gc, marker, path) => sink.draw_markers(gc, marker, path)?,
                Draw::Text(item) => sink.draw_text(item)?,
                Draw::Image(gc, origin, image) => sink.draw_image(gc, *origin, image)?,
            }
        }
        Ok(())
    }

    fn texts(&self) -> Vec<TextItem> {
        self.texts.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
