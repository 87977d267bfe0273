//! Path and style emission.
//!
//! One draw call becomes one `pgfscope`: clip, then style (cap, join,
//! fill, stroke, dash), then the path, then a single `\pgfusepath`. PGF
//! graphics state is sticky, so this order is fixed.

use std::io::{self, Write};

use kurbo::{Affine, Point};
use pgfkit_graphics::bbox::path_extents;
use pgfkit_graphics::units::TEX_POINTS_PER_INCH;
use pgfkit_graphics::{
    Device, GraphicsState, Hatch, Inches, LineCap, LineJoin, Path, PathSegment, Resolution,
    TexPoint, TexPoints,
};

use crate::writer::PgfWriter;

/// Name of the reusable marker object.
const MARKER_OBJECT: &str = "currentmarker";

/// Name of the reusable hatch tile object.
const PATTERN_OBJECT: &str = "currentpattern";

const fn cap_command(cap: LineCap) -> &'static str {
    match cap {
        LineCap::Butt => r"\pgfsetbuttcap",
        LineCap::Round => r"\pgfsetroundcap",
        LineCap::Projecting => r"\pgfsetrectcap",
    }
}

const fn join_command(join: LineJoin) -> &'static str {
    match join {
        LineJoin::Miter => r"\pgfsetmiterjoin",
        LineJoin::Round => r"\pgfsetroundjoin",
        LineJoin::Bevel => r"\pgfsetbeveljoin",
    }
}

fn is_opaque(alpha: f64) -> bool {
    (alpha - 1.0).abs() < f64::EPSILON
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Writes draw calls as PGF, converting device coordinates on the way.
#[derive(Debug)]
pub struct Emitter<W> {
    pub(crate) out: PgfWriter<W>,
    pub(crate) resolution: Resolution,
}

impl<W: Write> Emitter<W> {
    pub const fn new(out: PgfWriter<W>, resolution: Resolution) -> Self {
        Self { out, resolution }
    }

    pub fn into_writer(self) -> PgfWriter<W> {
        self.out
    }

    pub const fn writer(&mut self) -> &mut PgfWriter<W> {
        &mut self.out
    }

    fn tex(&self, d: Device) -> TexPoints {
        self.resolution.to_tex(d)
    }

    fn device_point(&self, p: Point) -> TexPoint {
        self.resolution.point_to_tex(p)
    }

    // -- draw calls --

    /// Stroke and/or fill `path`, then overlay the hatch if there is one.
    pub fn path(&mut self, gc: &GraphicsState, path: &Path) -> io::Result<()> {
        self.out.line(r"\begin{pgfscope}")?;
        self.clip(gc)?;
        self.styles(gc)?;
        let res = self.resolution;
        self.segments(path.iter_transformed(Affine::IDENTITY), |p| res.point_to_tex(p))?;
        self.use_path(gc.strokes(), gc.fills())?;
        self.out.line(r"\end{pgfscope}")?;

        if let Some(hatch) = &gc.hatch {
            self.hatch(gc, path, hatch)?;
        }
        Ok(())
    }

    /// Define `marker` once and place it at every vertex of `path`.
    ///
    /// Returns the number of placements. Vertices TeX cannot represent are
    /// skipped.
    pub fn markers(&mut self, gc: &GraphicsState, marker: &Path, path: &Path) -> io::Result<usize> {
        let extents = path_extents(marker, Affine::IDENTITY);
        if !extents.is_valid() {
            log::debug!("empty marker path, nothing to draw");
            return Ok(0);
        }

        self.out.line(r"\begin{pgfscope}")?;
        self.clip(gc)?;
        self.styles(gc)?;

        let lower = self.device_point(extents.min_point());
        let upper = self.device_point(extents.max_point());
        let define = format!(
            r"\pgfsys@defobject{{{MARKER_OBJECT}}}{{{}}}{{{}}}{{",
            self.out.point(lower),
            self.out.point(upper)
        );
        self.out.line(&define)?;
        let res = self.resolution;
        self.segments(marker.iter_transformed(Affine::IDENTITY), |p| res.point_to_tex(p))?;
        self.use_path(gc.strokes(), gc.fills())?;
        self.out.line("}")?;

        let mut placed = 0;
        let mut skipped = 0;
        for vertex in path.vertices() {
            let at = self.device_point(vertex);
            if !at.fits_tex() {
                skipped += 1;
                continue;
            }
            self.out.line(r"\begin{pgfscope}")?;
            let shift = format!(
                r"\pgfsys@transformshift{{{}}}{{{}}}",
                self.out.dim(at.x),
                self.out.dim(at.y)
            );
            self.out.line(&shift)?;
            self.out
                .line(&format!(r"\pgfsys@useobject{{{MARKER_OBJECT}}}{{}}"))?;
            self.out.line(r"\end{pgfscope}")?;
            placed += 1;
        }
        if skipped > 0 {
            log::warn!("skipped {skipped} markers outside the largest TeX dimension");
        }

        self.out.line(r"\end{pgfscope}")?;
        Ok(placed)
    }

    /// Tile `hatch` over the extents of `path`, clipped to the path.
    fn hatch(&mut self, gc: &GraphicsState, path: &Path, hatch: &Hatch) -> io::Result<()> {
        let extents = path_extents(path, Affine::IDENTITY);
        if !extents.is_valid() {
            return Ok(());
        }

        let res = self.resolution;
        let low = self.device_point(extents.min_point());
        let reps = |span: Device| -> u64 {
            let inches = res.to_inches(span).value().ceil().max(0.0);
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "ceil of a non-negative finite span"
            )]
            let n = inches as u64;
            n
        };
        let repx = reps(Device(extents.width()));
        let repy = reps(Device(extents.height()));
        #[expect(clippy::cast_precision_loss, reason = "tile counts are small")]
        let far = TexPoint::new(
            TexPoints(low.x.0 + repx as f64 * TEX_POINTS_PER_INCH),
            TexPoints(low.y.0 + repy as f64 * TEX_POINTS_PER_INCH),
        );
        if !low.fits_tex() || !far.fits_tex() {
            log::warn!("skipped a hatch whose tiles exceed the largest TeX dimension");
            return Ok(());
        }

        self.out.line(r"\begin{pgfscope}")?;
        self.clip(gc)?;
        self.segments(path.iter_transformed(Affine::IDENTITY), |p| res.point_to_tex(p))?;
        self.out.line(r"\pgfusepath{clip}")?;

        let origin = TexPoint::new(TexPoints::ZERO, TexPoints::ZERO);
        let inch = Inches(1.0).to_tex();
        let corner = TexPoint::new(inch, inch);
        let define = format!(
            r"\pgfsys@defobject{{{PATTERN_OBJECT}}}{{{}}}{{{}}}{{",
            self.out.point(origin),
            self.out.point(corner)
        );
        self.out.line(&define)?;
        self.out.line(r"\begin{pgfscope}")?;
        let tile = format!(
            r"\pgfpathrectangle{{{}}}{{{}}}",
            self.out.point(origin),
            self.out.point(corner)
        );
        self.out.line(&tile)?;
        self.out.line(r"\pgfusepath{clip}")?;
        let width = format!(r"\pgfsetlinewidth{{{}}}", self.out.dim(self.tex(hatch.line_width)));
        self.out.line(&width)?;
        let color = format!(r"\definecolor{{currentstroke}}{{rgb}}{{{}}}", self.out.rgb(hatch.color));
        self.out.line(&color)?;
        self.out.line(r"\pgfsetstrokecolor{currentstroke}")?;
        self.out.line(r"\pgfsetdash{}{0pt}")?;
        let unit = |p: Point| TexPoint::new(Inches(p.x).to_tex(), Inches(p.y).to_tex());
        self.segments(hatch.tile.iter_transformed(Affine::IDENTITY), unit)?;
        self.use_path(true, false)?;
        self.out.line(r"\end{pgfscope}")?;
        self.out.line("}")?;

        let shift = |out: &PgfWriter<W>, x: TexPoints, y: TexPoints| {
            format!(r"\pgfsys@transformshift{{{}}}{{{}}}", out.dim(x), out.dim(y))
        };
        self.out.line(&shift(&self.out, low.x, low.y))?;
        #[expect(clippy::cast_precision_loss, reason = "tile counts are small")]
        let row_back = TexPoints(-(repx as f64) * TEX_POINTS_PER_INCH);
        for _ in 0..repy {
            for _ in 0..repx {
                self.out
                    .line(&format!(r"\pgfsys@useobject{{{PATTERN_OBJECT}}}{{}}"))?;
                self.out.line(&shift(&self.out, inch, TexPoints::ZERO))?;
            }
            self.out.line(&shift(&self.out, row_back, TexPoints::ZERO))?;
            self.out.line(&shift(&self.out, TexPoints::ZERO, inch))?;
        }
        self.out.line(r"\end{pgfscope}")
    }

    // -- building blocks --

    /// Clip rectangle, then clip path; both apply when both are set.
    pub fn clip(&mut self, gc: &GraphicsState) -> io::Result<()> {
        if let Some(rect) = gc.clip_rect {
            let origin = self.device_point(Point::new(rect.x0, rect.y0));
            let size = TexPoint::new(self.tex(Device(rect.width())), self.tex(Device(rect.height())));
            let command = format!(
                r"\pgfpathrectangle{{{}}}{{{}}}",
                self.out.point(origin),
                self.out.point(size)
            );
            self.out.line(&command)?;
            self.out.line(r"\pgfusepath{clip}")?;
        }
        if let Some(clip) = &gc.clip_path {
            let res = self.resolution;
            self.segments(clip.iter_transformed(Affine::IDENTITY), |p| res.point_to_tex(p))?;
            self.out.line(r"\pgfusepath{clip}")?;
        }
        Ok(())
    }

    /// Cap, join, fill, stroke and dash settings, in that order.
    pub fn styles(&mut self, gc: &GraphicsState) -> io::Result<()> {
        self.out.line(cap_command(gc.cap))?;
        self.out.line(join_command(gc.join))?;

        if let Some(fill) = gc.fill {
            let define = format!(r"\definecolor{{currentfill}}{{rgb}}{{{}}}", self.out.rgb(fill));
            self.out.line(&define)?;
            self.out.line(r"\pgfsetfillcolor{currentfill}")?;
        }
        if let Some(opacity) = gc.fill_opacity().filter(|&a| !is_opaque(a)) {
            let command = format!(r"\pgfsetfillopacity{{{}}}", self.out.num(opacity));
            self.out.line(&command)?;
        }

        let width = format!(r"\pgfsetlinewidth{{{}}}", self.out.dim(self.tex(gc.line_width)));
        self.out.line(&width)?;
        let define = format!(r"\definecolor{{currentstroke}}{{rgb}}{{{}}}", self.out.rgb(gc.stroke));
        self.out.line(&define)?;
        self.out.line(r"\pgfsetstrokecolor{currentstroke}")?;
        let opacity = gc.stroke_opacity();
        if !is_opaque(opacity) {
            let command = format!(r"\pgfsetstrokeopacity{{{}}}", self.out.num(opacity));
            self.out.line(&command)?;
        }

        match gc.dash_pattern() {
            None => self.out.line(r"\pgfsetdash{}{0pt}"),
            Some(pattern) => {
                let dashes: String = pattern
                    .dashes
                    .iter()
                    .map(|&d| format!("{{{}}}", self.out.dim(self.tex(d))))
                    .collect();
                let command = format!(
                    r"\pgfsetdash{{{dashes}}}{{{}}}",
                    self.out.dim(self.tex(pattern.offset))
                );
                self.out.line(&command)
            }
        }
    }

    /// Path construction commands, one per segment.
    pub fn segments(
        &mut self,
        segments: impl Iterator<Item = PathSegment>,
        to_tex: impl Fn(Point) -> TexPoint,
    ) -> io::Result<()> {
        for segment in segments {
            let command = match segment {
                PathSegment::MoveTo(p) => {
                    format!(r"\pgfpathmoveto{{{}}}", self.out.point(to_tex(p)))
                }
                PathSegment::LineTo(p) => {
                    format!(r"\pgfpathlineto{{{}}}", self.out.point(to_tex(p)))
                }
                PathSegment::QuadraticCurveTo { control, end } => format!(
                    r"\pgfpathquadraticcurveto{{{}}}{{{}}}",
                    self.out.point(to_tex(control)),
                    self.out.point(to_tex(end))
                ),
                PathSegment::CubicCurveTo {
                    control1,
                    control2,
                    end,
                } => format!(
                    r"\pgfpathcurveto{{{}}}{{{}}}{{{}}}",
                    self.out.point(to_tex(control1)),
                    self.out.point(to_tex(control2)),
                    self.out.point(to_tex(end))
                ),
                PathSegment::ClosePath => r"\pgfpathclose".to_owned(),
            };
            self.out.line(&command)?;
        }
        Ok(())
    }

    /// `\pgfusepath` with `stroke` and/or `fill`, or `discard` for neither.
    pub fn use_path(&mut self, stroke: bool, fill: bool) -> io::Result<()> {
        let action = match (stroke, fill) {
            (true, true) => "stroke,fill",
            (true, false) => "stroke",
            (false, true) => "fill",
            (false, false) => "discard",
        };
        self.out.line(&format!(r"\pgfusepath{{{action}}}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests may panic")]
mod tests {
    use super::*;
    use kurbo::Rect;
    use pgfkit_graphics::{LineStyle, Rgba};

    /// 72.27 dpi makes one device pixel exactly one TeX point.
    fn emitter() -> Emitter<Vec<u8>> {
        Emitter::new(PgfWriter::new(Vec::new(), 6), Resolution::new(72.27).unwrap())
    }

    fn lines(e: Emitter<Vec<u8>>) -> Vec<String> {
        String::from_utf8(e.into_writer().into_inner())
            .unwrap()
            .lines()
            .map(|l| l.trim_end_matches('%').to_owned())
            .collect()
    }

    fn square() -> Path {
        Path::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn filled_rectangle_command_order() {
        let gc = GraphicsState::default()
            .with_stroke(Rgba::new(1.0, 0.0, 0.0))
            .with_fill(Rgba::new(0.0, 0.0, 1.0))
            .with_line_width(Device(1.5));
        let mut e = emitter();
        e.path(&gc, &square()).unwrap();
        assert_eq!(
            lines(e),
            vec![
                r"\begin{pgfscope}",
                r"\pgfsetbuttcap",
                r"\pgfsetroundjoin",
                r"\definecolor{currentfill}{rgb}{0,0,1}",
                r"\pgfsetfillcolor{currentfill}",
                r"\pgfsetlinewidth{1.5pt}",
                r"\definecolor{currentstroke}{rgb}{1,0,0}",
                r"\pgfsetstrokecolor{currentstroke}",
                r"\pgfsetdash{}{0pt}",
                r"\pgfpathmoveto{\pgfqpoint{0pt}{0pt}}",
                r"\pgfpathlineto{\pgfqpoint{10pt}{0pt}}",
                r"\pgfpathlineto{\pgfqpoint{10pt}{10pt}}",
                r"\pgfpathlineto{\pgfqpoint{0pt}{10pt}}",
                r"\pgfpathclose",
                r"\pgfusepath{stroke,fill}",
                r"\end{pgfscope}",
            ]
        );
    }

    #[test]
    fn opacity_only_when_translucent() {
        let gc = GraphicsState::default()
            .with_fill(Rgba::new(0.0, 0.0, 1.0).with_alpha(0.25))
            .with_stroke(Rgba::new(1.0, 0.0, 0.0).with_alpha(0.5));
        let mut e = emitter();
        e.styles(&gc).unwrap();
        let out = lines(e);
        assert!(out.contains(&r"\pgfsetfillopacity{0.25}".to_owned()));
        assert!(out.contains(&r"\pgfsetstrokeopacity{0.5}".to_owned()));

        let mut e = emitter();
        e.styles(&GraphicsState::default()).unwrap();
        let out = lines(e);
        assert!(!out.iter().any(|l| l.contains("opacity")), "{out:?}");
        assert!(!out.iter().any(|l| l.contains("currentfill")), "{out:?}");
    }

    #[test]
    fn forced_alpha_applies_to_both() {
        let gc = GraphicsState::default()
            .with_fill(Rgba::new(0.0, 0.0, 1.0))
            .with_alpha(0.3);
        let mut e = emitter();
        e.styles(&gc).unwrap();
        let out = lines(e);
        assert!(out.contains(&r"\pgfsetfillopacity{0.3}".to_owned()));
        assert!(out.contains(&r"\pgfsetstrokeopacity{0.3}".to_owned()));
    }

    #[test]
    fn dash_patterns_scale_and_convert() {
        let gc = GraphicsState::default()
            .with_line_width(Device(2.0))
            .with_line_style(LineStyle::DashDot);
        let mut e = emitter();
        e.styles(&gc).unwrap();
        assert_eq!(
            lines(e).last().unwrap(),
            r"\pgfsetdash{{6pt}{6pt}{2pt}{6pt}}{0pt}"
        );

        // at 144.54 dpi two pixels are one TeX point
        let gc = GraphicsState::default().with_line_style(LineStyle::Custom {
            offset: Device(1.0),
            dashes: vec![Device(4.0), Device(2.0)],
        });
        let mut e = Emitter::new(PgfWriter::new(Vec::new(), 6), Resolution::new(144.54).unwrap());
        e.styles(&gc).unwrap();
        assert_eq!(lines(e).last().unwrap(), r"\pgfsetdash{{2pt}{1pt}}{0.5pt}");
    }

    #[test]
    fn caps_and_joins() {
        let mut gc = GraphicsState::default();
        gc.cap = LineCap::Projecting;
        gc.join = LineJoin::Bevel;
        let mut e = emitter();
        e.styles(&gc).unwrap();
        let out = lines(e);
        assert_eq!(out[0], r"\pgfsetrectcap");
        assert_eq!(out[1], r"\pgfsetbeveljoin");
    }

    #[test]
    fn use_path_actions() {
        let mut e = emitter();
        e.use_path(true, false).unwrap();
        e.use_path(false, true).unwrap();
        e.use_path(false, false).unwrap();
        assert_eq!(
            lines(e),
            vec![r"\pgfusepath{stroke}", r"\pgfusepath{fill}", r"\pgfusepath{discard}"]
        );
    }

    #[test]
    fn curves_and_transform() {
        let mut p = Path::new();
        p.move_to((0.0, 0.0));
        p.quad_to((1.0, 2.0), (3.0, 0.0));
        p.curve_to((1.0, 1.0), (2.0, 2.0), (3.0, 3.0));
        let p = p.with_transform(Affine::scale(2.0));
        let gc = GraphicsState::default().with_line_width(Device::ZERO);
        let mut e = emitter();
        e.path(&gc, &p).unwrap();
        let out = lines(e);
        assert!(out.contains(&r"\pgfpathquadraticcurveto{\pgfqpoint{2pt}{4pt}}{\pgfqpoint{6pt}{0pt}}".to_owned()));
        assert!(out.contains(
            &r"\pgfpathcurveto{\pgfqpoint{2pt}{2pt}}{\pgfqpoint{4pt}{4pt}}{\pgfqpoint{6pt}{6pt}}".to_owned()
        ));
        assert!(out.contains(&r"\pgfusepath{discard}".to_owned()));
    }

    #[test]
    fn clip_rect_then_clip_path() {
        let gc = GraphicsState::default()
            .with_clip_rect(Rect::new(1.0, 2.0, 11.0, 22.0))
            .with_clip_path(square());
        let mut e = emitter();
        e.clip(&gc).unwrap();
        let out = lines(e);
        assert_eq!(
            out[0],
            r"\pgfpathrectangle{\pgfqpoint{1pt}{2pt}}{\pgfqpoint{10pt}{20pt}}"
        );
        assert_eq!(out[1], r"\pgfusepath{clip}");
        assert_eq!(out[2], r"\pgfpathmoveto{\pgfqpoint{0pt}{0pt}}");
        assert_eq!(out.last().unwrap(), r"\pgfusepath{clip}");
        assert_eq!(out.len(), 2 + 5 + 1);
    }

    #[test]
    fn markers_defined_once_placed_per_vertex() {
        let marker = Path::rectangle(Rect::new(-2.0, -2.0, 2.0, 2.0));
        let mut path = Path::new();
        for i in 0..50 {
            let x = f64::from(i);
            if i == 0 {
                path.move_to((x, x));
            } else {
                path.line_to((x, x));
            }
        }
        let mut e = emitter();
        let placed = e.markers(&GraphicsState::default(), &marker, &path).unwrap();
        assert_eq!(placed, 50);
        let out = lines(e);
        let defs = out.iter().filter(|l| l.starts_with(r"\pgfsys@defobject")).count();
        let uses = out
            .iter()
            .filter(|l| *l == r"\pgfsys@useobject{currentmarker}{}")
            .count();
        assert_eq!(defs, 1);
        assert_eq!(uses, 50);
        assert!(out.contains(
            &r"\pgfsys@defobject{currentmarker}{\pgfqpoint{-2pt}{-2pt}}{\pgfqpoint{2pt}{2pt}}{".to_owned()
        ));
        assert!(out.contains(&r"\pgfsys@transformshift{49pt}{49pt}".to_owned()));
        // exactly one path inside the object
        let moves = out.iter().filter(|l| l.starts_with(r"\pgfpathmoveto")).count();
        assert_eq!(moves, 1);
    }

    #[test]
    fn markers_outside_tex_range_are_skipped() {
        let marker = Path::rectangle(Rect::new(-1.0, -1.0, 1.0, 1.0));
        let mut path = Path::new();
        path.move_to((10.0, 10.0));
        path.line_to((1.0e7, 10.0));
        path.line_to((20.0, 20.0));
        let mut e = emitter();
        let placed = e.markers(&GraphicsState::default(), &marker, &path).unwrap();
        assert_eq!(placed, 2);
    }

    #[test]
    fn empty_marker_draws_nothing() {
        let mut e = emitter();
        let placed = e
            .markers(&GraphicsState::default(), &Path::new(), &square())
            .unwrap();
        assert_eq!(placed, 0);
        assert!(lines(e).is_empty());
    }

    #[test]
    fn hatch_tiles_cover_extents() {
        // 2.5in x 1.2in at 72.27 dpi
        let region = Path::rectangle(Rect::new(0.0, 0.0, 2.5 * 72.27, 1.2 * 72.27));
        let mut tile = Path::new();
        tile.move_to((0.0, 0.0));
        tile.line_to((1.0, 1.0));
        let gc = GraphicsState::default()
            .with_fill(Rgba::WHITE)
            .with_hatch(Hatch {
                tile,
                color: Rgba::BLACK,
                line_width: Device(0.8),
            });
        let mut e = emitter();
        e.path(&gc, &region).unwrap();
        let out = lines(e);
        let defs = out
            .iter()
            .filter(|l| l.starts_with(r"\pgfsys@defobject{currentpattern}"))
            .count();
        assert_eq!(defs, 1);
        let uses = out
            .iter()
            .filter(|l| *l == r"\pgfsys@useobject{currentpattern}{}")
            .count();
        assert_eq!(uses, 3 * 2);
        assert!(out.contains(&r"\pgfpathlineto{\pgfqpoint{72.27pt}{72.27pt}}".to_owned()));
        assert!(out.contains(&r"\pgfsys@transformshift{-216.81pt}{0pt}".to_owned()));
        // two scopes for the draw and the hatch, one inside the pattern
        let scopes = out.iter().filter(|l| *l == r"\begin{pgfscope}").count();
        assert_eq!(scopes, 3);
    }

    #[test]
    fn oversized_hatch_is_skipped() {
        // 500in square: far beyond the largest TeX dimension
        let side = 500.0 * 72.27;
        let region = Path::rectangle(Rect::new(0.0, 0.0, side, side));
        let mut tile = Path::new();
        tile.move_to((0.0, 0.0));
        tile.line_to((1.0, 1.0));
        let gc = GraphicsState::default()
            .with_fill(Rgba::WHITE)
            .with_hatch(Hatch {
                tile,
                color: Rgba::BLACK,
                line_width: Device(0.8),
            });
        let mut e = emitter();
        e.path(&gc, &region).unwrap();
        let out = lines(e);
        assert!(!out.iter().any(|l| l.contains("currentpattern")));
        // the path itself is still drawn
        let scopes = out.iter().filter(|l| *l == r"\begin{pgfscope}").count();
        assert_eq!(scopes, 1);
    }
}
