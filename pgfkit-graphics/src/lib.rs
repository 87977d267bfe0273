//! Geometry, units and graphics state for the pgfkit PGF backend.
//!
//! Everything in this crate lives in host device space; conversion to
//! output lengths goes through [`units::Resolution`].

pub mod bbox;
pub mod error;
pub mod path;
pub mod types;
pub mod units;

pub use bbox::BoundingBox;
pub use error::GraphicsError;
pub use path::{Path, PathSegment};
pub use types::{DashPattern, GraphicsState, Hatch, LineCap, LineJoin, LineStyle, Rgba};
pub use units::{Device, Inches, Points, Resolution, TexPoint, TexPoints};

pub use kurbo::{Affine, Point, Rect};
