//! Paths as the host hands them over.
//!
//! A [`Path`] is a flat list of [`PathSegment`]s plus an affine transform
//! that is applied lazily, when the path is walked for emission. The
//! segment coordinates and the transformed coordinates are both device
//! space; output units only appear once the emitter converts them.

use kurbo::{Affine, Point, Rect};

// ---------------------------------------------------------------------------
// PathSegment
// ---------------------------------------------------------------------------

/// One drawing instruction of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    QuadraticCurveTo { control: Point, end: Point },
    CubicCurveTo {
        control1: Point,
        control2: Point,
        end: Point,
    },
    ClosePath,
}

impl PathSegment {
    /// The on-curve point this segment ends at, if any.
    pub const fn end_point(&self) -> Option<Point> {
        match *self {
            Self::MoveTo(p) | Self::LineTo(p) => Some(p),
            Self::QuadraticCurveTo { end, .. } | Self::CubicCurveTo { end, .. } => Some(end),
            Self::ClosePath => None,
        }
    }

    /// Apply an affine transform to every point of the segment.
    #[must_use]
    pub fn transformed(&self, t: Affine) -> Self {
        match *self {
            Self::MoveTo(p) => Self::MoveTo(t * p),
            Self::LineTo(p) => Self::LineTo(t * p),
            Self::QuadraticCurveTo { control, end } => Self::QuadraticCurveTo {
                control: t * control,
                end: t * end,
            },
            Self::CubicCurveTo {
                control1,
                control2,
                end,
            } => Self::CubicCurveTo {
                control1: t * control1,
                control2: t * control2,
                end: t * end,
            },
            Self::ClosePath => Self::ClosePath,
        }
    }
}

// ---------------------------------------------------------------------------
// Path
// ---------------------------------------------------------------------------

/// An ordered sequence of segments with a pending transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    segments: Vec<PathSegment>,
    transform: Affine,
}

impl Path {
    /// Create an empty path with the identity transform.
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
            transform: Affine::IDENTITY,
        }
    }

    pub const fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self {
            segments,
            transform: Affine::IDENTITY,
        }
    }

    /// A closed axis-aligned rectangle.
    pub fn rectangle(rect: Rect) -> Self {
        Self::from_segments(vec![
            PathSegment::MoveTo(Point::new(rect.x0, rect.y0)),
            PathSegment::LineTo(Point::new(rect.x1, rect.y0)),
            PathSegment::LineTo(Point::new(rect.x1, rect.y1)),
            PathSegment::LineTo(Point::new(rect.x0, rect.y1)),
            PathSegment::ClosePath,
        ])
    }

    /// Replace the pending transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub const fn transform(&self) -> Affine {
        self.transform
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    // -- construction helpers --

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn move_to(&mut self, p: impl Into<Point>) {
        self.push(PathSegment::MoveTo(p.into()));
    }

    pub fn line_to(&mut self, p: impl Into<Point>) {
        self.push(PathSegment::LineTo(p.into()));
    }

    pub fn quad_to(&mut self, control: impl Into<Point>, end: impl Into<Point>) {
        self.push(PathSegment::QuadraticCurveTo {
            control: control.into(),
            end: end.into(),
        });
    }

    pub fn curve_to(
        &mut self,
        control1: impl Into<Point>,
        control2: impl Into<Point>,
        end: impl Into<Point>,
    ) {
        self.push(PathSegment::CubicCurveTo {
            control1: control1.into(),
            control2: control2.into(),
            end: end.into(),
        });
    }

    pub fn close(&mut self) {
        self.push(PathSegment::ClosePath);
    }

    // -- queries --

    /// Walk the segments with the path's own transform applied, followed
    /// by `outer`.
    pub fn iter_transformed(&self, outer: Affine) -> impl Iterator<Item = PathSegment> + '_ {
        let t = outer * self.transform;
        self.segments.iter().map(move |s| s.transformed(t))
    }

    /// On-curve vertices after the path transform. `ClosePath` contributes
    /// nothing.
    pub fn vertices(&self) -> impl Iterator<Item = Point> + '_ {
        self.iter_transformed(Affine::IDENTITY)
            .filter_map(|s| s.end_point())
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self::from_segments(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
