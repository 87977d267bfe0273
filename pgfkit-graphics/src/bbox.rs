//! Axis-aligned bounding box computation.
//!
//! Provides [`BoundingBox`] and [`path_extents`], the tight bounds of a
//! path after its transform. Marker objects and hatch tiling both need
//! them.

use kurbo::{Affine, CubicBez, ParamCurveExtrema, Point, QuadBez};

use crate::path::{Path, PathSegment};

// ---------------------------------------------------------------------------
// BoundingBox type
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box in device space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// An empty (inverted) bounding box.
    pub const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    /// Check if this bounding box is valid (non-empty).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// Width.
    #[must_use]
    pub fn width(&self) -> f64 {
        if self.is_valid() {
            self.max_x - self.min_x
        } else {
            0.0
        }
    }

    /// Height.
    #[must_use]
    pub fn height(&self) -> f64 {
        if self.is_valid() {
            self.max_y - self.min_y
        } else {
            0.0
        }
    }

    /// Lower-left corner.
    #[must_use]
    pub const fn min_point(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    /// Upper-right corner.
    #[must_use]
    pub const fn max_point(&self) -> Point {
        Point::new(self.max_x, self.max_y)
    }

    /// Expand to include a point.
    pub fn include_point(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    fn include_rect(&mut self, r: kurbo::Rect) {
        self.include_point(Point::new(r.x0, r.y0));
        self.include_point(Point::new(r.x1, r.y1));
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ---------------------------------------------------------------------------
// Path extents
// ---------------------------------------------------------------------------

/// Tight bounds of `path` after its own transform and then `outer`.
///
/// Curves contribute their extrema, not their control points. A path that
/// does not start with `MoveTo` is treated as starting at its first point.
#[must_use]
pub fn path_extents(path: &Path, outer: Affine) -> BoundingBox {
    let mut bb = BoundingBox::EMPTY;
    let mut current: Option<Point> = None;

    for seg in path.iter_transformed(outer) {
        match seg {
            PathSegment::MoveTo(p) | PathSegment::LineTo(p) => {
                bb.include_point(p);
                current = Some(p);
            }
            PathSegment::QuadraticCurveTo { control, end } => {
                match current {
                    Some(start) => {
                        bb.include_rect(QuadBez::new(start, control, end).bounding_box());
                    }
                    None => bb.include_point(end),
                }
                current = Some(end);
            }
            PathSegment::CubicCurveTo {
                control1,
                control2,
                end,
            } => {
                match current {
                    Some(start) => bb.include_rect(
                        CubicBez::new(start, control1, control2, end).bounding_box(),
                    ),
                    None => bb.include_point(end),
                }
                current = Some(end);
            }
            PathSegment::ClosePath => {}
        }
    }

    bb
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_bounding_box_empty() {
        let bb = BoundingBox::EMPTY;
        assert!(!bb.is_valid());
        assert!(bb.width().abs() < TOL);
        assert!(bb.height().abs() < TOL);
    }

    #[test]
    fn test_bounding_box_include_point() {
        let mut bb = BoundingBox::EMPTY;
        bb.include_point(Point::new(1.0, 2.0));
        bb.include_point(Point::new(5.0, 8.0));
        assert!(bb.is_valid());
        assert!((bb.min_x - 1.0).abs() < TOL);
        assert!((bb.min_y - 2.0).abs() < TOL);
        assert!((bb.max_x - 5.0).abs() < TOL);
        assert!((bb.max_y - 8.0).abs() < TOL);
    }

    #[test]
    fn extents_apply_transforms() {
        let path = Path::rectangle(kurbo::Rect::new(-1.0, -1.0, 1.0, 1.0))
            .with_transform(Affine::scale(3.0));
        let bb = path_extents(&path, Affine::translate((10.0, 0.0)));
        assert!((bb.min_x - 7.0).abs() < TOL, "{bb:?}");
        assert!((bb.max_x - 13.0).abs() < TOL, "{bb:?}");
        assert!((bb.min_y + 3.0).abs() < TOL, "{bb:?}");
        assert!((bb.max_y - 3.0).abs() < TOL, "{bb:?}");
    }

    #[test]
    fn curve_extents_are_tight() {
        // Control points reach y = 10 but the curve only reaches 7.5.
        let mut path = Path::new();
        path.move_to((0.0, 0.0));
        path.curve_to((0.0, 10.0), (10.0, 10.0), (10.0, 0.0));
        let bb = path_extents(&path, Affine::IDENTITY);
        assert!((bb.max_y - 7.5).abs() < 1e-6, "{bb:?}");
        assert!((bb.width() - 10.0).abs() < TOL);
    }

    #[test]
    fn quad_extents_are_tight() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0));
        path.quad_to((5.0, 10.0), (10.0, 0.0));
        let bb = path_extents(&path, Affine::IDENTITY);
        assert!((bb.max_y - 5.0).abs() < 1e-6, "{bb:?}");
    }
}
