//! Box dimensions as reported by TeX.

use pgfkit_graphics::{Device, Resolution, TexPoints};

/// Unit suffix TeX appends to every `\the` dimension.
const UNIT_SUFFIX: &str = "pt";

/// Extent of a typeset text box.
///
/// `height` is the full extent, ascent plus descent. TeX reports the
/// ascent alone as the box height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsResult {
    pub width: TexPoints,
    pub height: TexPoints,
    pub descent: TexPoints,
}

impl MetricsResult {
    /// Build from TeX's `\wd`, `\ht` and `\dp`.
    pub fn from_tex_box(width: TexPoints, ascent: TexPoints, descent: TexPoints) -> Self {
        Self {
            width,
            height: ascent + descent,
            descent,
        }
    }

    /// Width, height and descent in device units.
    pub fn to_device(self, resolution: Resolution) -> (Device, Device, Device) {
        (
            resolution.from_tex(self.width),
            resolution.from_tex(self.height),
            resolution.from_tex(self.descent),
        )
    }
}

/// Parse a `W,H,D` reply line such as `12.34pt,8.9pt,2.1pt`.
///
/// Returns `None` unless there are exactly three comma-separated finite
/// dimensions, each ending in `pt`.
pub fn parse_reply(line: &str) -> Option<MetricsResult> {
    let mut fields = line.trim().split(',');
    let width = parse_dimension(fields.next()?)?;
    let ascent = parse_dimension(fields.next()?)?;
    let descent = parse_dimension(fields.next()?)?;
    if fields.next().is_some() {
        return None;
    }
    Some(MetricsResult::from_tex_box(width, ascent, descent))
}

fn parse_dimension(token: &str) -> Option<TexPoints> {
    let value: f64 = token.trim().strip_suffix(UNIT_SUFFIX)?.parse().ok()?;
    value.is_finite().then_some(TexPoints(value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
