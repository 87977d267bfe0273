//! Font descriptors and their translation to LaTeX font commands.

use std::str::FromStr;
use std::sync::Arc;

use pgfkit_graphics::Points;

use crate::config::TexSystem;
use crate::error::ConfigError;
use crate::lookup::FontLookup;

/// Baseline-to-baseline distance as a multiple of the font size.
pub const LEADING_RATIO: f64 = 1.2;

// ---------------------------------------------------------------------------
// Descriptor parts
// ---------------------------------------------------------------------------

/// A generic font class or an explicit family name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Serif,
    SansSerif,
    Monospace,
    Named(String),
}

impl From<&str> for FontFamily {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "serif" => Self::Serif,
            "sans-serif" | "sans" => Self::SansSerif,
            "monospace" => Self::Monospace,
            _ => Self::Named(name.trim().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FromStr for FontStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "italic" => Ok(Self::Italic),
            "oblique" => Ok(Self::Oblique),
            _ => Err(ConfigError::UnknownFontStyle(s.to_owned())),
        }
    }
}

/// Named font weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontWeight {
    UltraLight,
    Light,
    #[default]
    Normal,
    Medium,
    SemiBold,
    DemiBold,
    Demi,
    Bold,
    Heavy,
    ExtraBold,
    Black,
}

impl FontWeight {
    /// Whether LaTeX should select the bold series for this weight.
    pub const fn is_bold(self) -> bool {
        matches!(
            self,
            Self::SemiBold
                | Self::DemiBold
                | Self::Demi
                | Self::Bold
                | Self::Heavy
                | Self::ExtraBold
                | Self::Black
        )
    }

    /// The named weight closest to a numeric CSS-style weight.
    pub const fn from_numeric(weight: u16) -> Self {
        match weight {
            0..=249 => Self::UltraLight,
            250..=349 => Self::Light,
            350..=449 => Self::Normal,
            450..=549 => Self::Medium,
            550..=649 => Self::SemiBold,
            650..=749 => Self::Bold,
            750..=849 => Self::ExtraBold,
            _ => Self::Black,
        }
    }
}

impl FromStr for FontWeight {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let weight = match name.as_str() {
            "ultralight" | "thin" => Self::UltraLight,
            "light" => Self::Light,
            "normal" | "regular" | "book" | "roman" => Self::Normal,
            "medium" => Self::Medium,
            "semibold" => Self::SemiBold,
            "demibold" => Self::DemiBold,
            "demi" => Self::Demi,
            "bold" => Self::Bold,
            "heavy" => Self::Heavy,
            "extra bold" | "extrabold" => Self::ExtraBold,
            "black" => Self::Black,
            _ => match name.parse::<u16>() {
                Ok(n @ 1..=1000) => Self::from_numeric(n),
                _ => return Err(ConfigError::UnknownFontWeight(s.to_owned())),
            },
        };
        Ok(weight)
    }
}

// ---------------------------------------------------------------------------
// FontDescriptor
// ---------------------------------------------------------------------------

/// Everything the translator needs to select a font.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    pub family: FontFamily,
    pub size: Points,
    pub style: FontStyle,
    pub weight: FontWeight,
}

impl FontDescriptor {
    /// An upright, normal-weight font.
    pub fn new(family: impl Into<FontFamily>, size: Points) -> Self {
        Self {
            family: family.into(),
            size,
            style: FontStyle::Normal,
            weight: FontWeight::Normal,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self::new(FontFamily::SansSerif, Points(10.0))
    }
}

// ---------------------------------------------------------------------------
// FontTranslator
// ---------------------------------------------------------------------------

/// Turns a [`FontDescriptor`] into a LaTeX font-selection command string.
#[derive(Clone)]
pub struct FontTranslator {
    lookup: Arc<dyn FontLookup>,
    texsystem: TexSystem,
}

impl FontTranslator {
    pub fn new(lookup: Arc<dyn FontLookup>, texsystem: TexSystem) -> Self {
        Self { lookup, texsystem }
    }

    pub fn lookup(&self) -> &dyn FontLookup {
        self.lookup.as_ref()
    }

    pub const fn texsystem(&self) -> TexSystem {
        self.texsystem
    }

    /// The individual commands, in application order: family, size,
    /// shape, series, `\selectfont`. Commands that select nothing are
    /// left out.
    pub fn command_list(&self, font: &FontDescriptor) -> Vec<String> {
        let mut commands = Vec::with_capacity(5);

        match &font.family {
            FontFamily::Serif => commands.push(r"\rmfamily".to_owned()),
            FontFamily::SansSerif => commands.push(r"\sffamily".to_owned()),
            FontFamily::Monospace => commands.push(r"\ttfamily".to_owned()),
            FontFamily::Named(name)
                if self.texsystem.uses_fontspec() && self.lookup.is_installed(name) =>
            {
                commands.push(format!(r"\setmainfont{{{name}}}\rmfamily"));
            }
            FontFamily::Named(name) => {
                log::warn!("font family `{name}` is not available, using the document default");
            }
        }

        let size = font.size.value();
        commands.push(format!(
            r"\fontsize{{{size:.6}}}{{{:.6}}}",
            size * LEADING_RATIO
        ));

        match font.style {
            FontStyle::Normal => {}
            FontStyle::Italic => commands.push(r"\itshape".to_owned()),
            FontStyle::Oblique => commands.push(r"\slshape".to_owned()),
        }

        if font.weight.is_bold() {
            commands.push(r"\bfseries".to_owned());
        }

        commands.push(r"\selectfont".to_owned());
        commands
    }

    /// The commands concatenated, ready to prefix text.
    pub fn commands(&self, font: &FontDescriptor) -> String {
        self.command_list(font).concat()
    }
}

impl std::fmt::Debug for FontTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontTranslator")
            .field("texsystem", &self.texsystem)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
