//! Length units and the conversions between them.
//!
//! Three coordinate spaces meet in a PGF render:
//! - [`Device`]: the host's pixels, resolution dependent.
//! - [`Points`]: PostScript points, exactly 1/72 in.
//! - [`TexPoints`]: TeX points, 1/72.27 in. This is the unit written into
//!   the picture code and the unit TeX reports box dimensions in.
//!
//! Each space has its own newtype. A value only moves between spaces
//! through [`Resolution`] (for anything involving device pixels) or the
//! explicit `to_*` methods, so a conversion cannot be applied twice or
//! forgotten without a type error.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use kurbo::Point;

use crate::error::GraphicsError;

/// PostScript points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// TeX points per inch.
pub const TEX_POINTS_PER_INCH: f64 = 72.27;

/// Largest dimension TeX can represent (`\maxdimen`).
pub const TEX_MAX_DIMENSION: TexPoints = TexPoints(16_383.999_98);

// ---------------------------------------------------------------------------
// Length newtypes
// ---------------------------------------------------------------------------

macro_rules! length_unit {
    ($(#[$meta:meta])* $name:ident, $suffix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
        pub struct $name(pub f64);

        impl $name {
            pub const ZERO: Self = Self(0.0);

            /// The raw magnitude.
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub const fn abs(self) -> Self {
                Self(self.0.abs())
            }

            #[inline]
            pub const fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl Add for $name {
            type Output = Self;
            #[inline]
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            #[inline]
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = Self;
            #[inline]
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            #[inline]
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;
            #[inline]
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", self.0, $suffix)
            }
        }
    };
}

length_unit!(
    /// A length in host device pixels.
    Device,
    "px"
);

length_unit!(
    /// A length in PostScript points (1/72 in).
    Points,
    "bp"
);

length_unit!(
    /// A length in TeX points (1/72.27 in), the output length unit.
    TexPoints,
    "pt"
);

length_unit!(
    /// A length in inches.
    Inches,
    "in"
);

impl Points {
    #[inline]
    pub fn to_inches(self) -> Inches {
        Inches(self.0 / POINTS_PER_INCH)
    }

    #[inline]
    pub fn to_tex(self) -> TexPoints {
        self.to_inches().to_tex()
    }
}

impl TexPoints {
    #[inline]
    pub fn to_inches(self) -> Inches {
        Inches(self.0 / TEX_POINTS_PER_INCH)
    }

    #[inline]
    pub fn to_points(self) -> Points {
        self.to_inches().to_points()
    }

    /// Whether TeX can hold this dimension in a register.
    #[inline]
    pub fn fits_tex(self) -> bool {
        self.0.is_finite() && self.abs() <= TEX_MAX_DIMENSION
    }
}

impl Inches {
    #[inline]
    pub fn to_points(self) -> Points {
        Points(self.0 * POINTS_PER_INCH)
    }

    #[inline]
    pub fn to_tex(self) -> TexPoints {
        TexPoints(self.0 * TEX_POINTS_PER_INCH)
    }
}

/// A point in output space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexPoint {
    pub x: TexPoints,
    pub y: TexPoints,
}

impl TexPoint {
    #[inline]
    pub const fn new(x: TexPoints, y: TexPoints) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn fits_tex(self) -> bool {
        self.x.fits_tex() && self.y.fits_tex()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Device resolution: the only bridge between device pixels and
/// physical lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    dpi: f64,
}

impl Resolution {
    /// Create a resolution of `dpi` device pixels per inch.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidResolution`] unless `dpi` is finite
    /// and strictly positive.
    pub fn new(dpi: f64) -> Result<Self, GraphicsError> {
        if dpi.is_finite() && dpi > 0.0 {
            Ok(Self { dpi })
        } else {
            Err(GraphicsError::InvalidResolution(dpi))
        }
    }

    #[inline]
    pub const fn dpi(self) -> f64 {
        self.dpi
    }

    #[inline]
    pub fn to_inches(self, d: Device) -> Inches {
        Inches(d.0 / self.dpi)
    }

    #[inline]
    pub fn from_inches(self, i: Inches) -> Device {
        Device(i.0 * self.dpi)
    }

    #[inline]
    pub fn to_points(self, d: Device) -> Points {
        self.to_inches(d).to_points()
    }

    #[inline]
    pub fn to_tex(self, d: Device) -> TexPoints {
        self.to_inches(d).to_tex()
    }

    #[inline]
    pub fn from_tex(self, t: TexPoints) -> Device {
        self.from_inches(t.to_inches())
    }

    /// Convert a device-space point to output space.
    #[inline]
    pub fn point_to_tex(self, p: Point) -> TexPoint {
        TexPoint::new(self.to_tex(Device(p.x)), self.to_tex(Device(p.y)))
    }
}

// ---------------------------------------------------------------------------
// Number formatting
// ---------------------------------------------------------------------------

/// Format a scalar to the given precision, stripping trailing zeros.
///
/// Negative zero prints as `0`.
pub fn fmt_scalar(v: f64, precision: usize) -> String {
    let s = format!("{v:.precision$}");
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        s
    };
    if s == "-0" { "0".to_owned() } else { s }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests may panic")]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn rejects_bad_dpi() {
        assert!(Resolution::new(0.0).is_err());
        assert!(Resolution::new(-72.0).is_err());
        assert!(Resolution::new(f64::NAN).is_err());
        assert!(Resolution::new(f64::INFINITY).is_err());
        assert!(Resolution::new(100.0).is_ok());
    }

    #[test]
    fn device_to_tex_uses_tex_point() {
        let res = Resolution::new(100.0).unwrap();
        // 100 px at 100 dpi is one inch = 72.27 TeX points
        let t = res.to_tex(Device(100.0));
        assert!((t.0 - 72.27).abs() < TOL, "got {t}");
        // but 72 PostScript points
        let p = res.to_points(Device(100.0));
        assert!((p.0 - 72.0).abs() < TOL, "got {p}");
    }

    #[test]
    fn device_tex_roundtrip() {
        for dpi in [72.0, 96.0, 100.0, 300.0, 1234.5] {
            let res = Resolution::new(dpi).unwrap();
            for v in [0.0, 0.5, 1.0, 17.25, 640.0, -33.3, 1e5] {
                let back = res.from_tex(res.to_tex(Device(v)));
                assert!((back.0 - v).abs() < 1e-9 * v.abs().max(1.0), "dpi {dpi}, v {v}: {back}");
            }
        }
    }

    #[test]
    fn points_tex_roundtrip() {
        let p = Points(12.0);
        let back = p.to_tex().to_points();
        assert!((back.0 - 12.0).abs() < TOL);
        // a TeX point is slightly smaller than a PostScript point
        assert!(p.to_tex().0 > 12.0);
    }

    #[test]
    fn tex_max_dimension() {
        assert!(TexPoints(16_383.0).fits_tex());
        assert!(!TexPoints(16_384.0).fits_tex());
        assert!(!TexPoints(f64::NAN).fits_tex());
        assert!(TexPoint::new(TexPoints(-100.0), TexPoints(100.0)).fits_tex());
    }

    #[test]
    fn point_conversion() {
        let res = Resolution::new(72.27).unwrap();
        let p = res.point_to_tex(Point::new(1.0, -2.0));
        assert!((p.x.0 - 1.0).abs() < TOL);
        assert!((p.y.0 + 2.0).abs() < TOL);
    }

    #[test]
    fn fmt_scalar_trims() {
        assert_eq!(fmt_scalar(1.0, 4), "1");
        assert_eq!(fmt_scalar(1.5, 4), "1.5");
        assert_eq!(fmt_scalar(1.25, 6), "1.25");
        assert_eq!(fmt_scalar(-0.0, 3), "0");
        assert_eq!(fmt_scalar(-0.000_000_1, 3), "0");
        assert_eq!(fmt_scalar(12.0, 0), "12");
    }

    #[test]
    fn arithmetic_stays_in_unit() {
        let w = Device(2.0);
        assert_eq!(w * 2.5, Device(5.0));
        assert_eq!(w + Device(1.0), Device(3.0));
        assert_eq!(-w, Device(-2.0));
        assert_eq!(format!("{}", TexPoints(3.5)), "3.5pt");
    }
}
