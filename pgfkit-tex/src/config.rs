//! Render configuration shared by the metrics oracle and the compile step.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// TexSystem
// ---------------------------------------------------------------------------

/// The TeX engine used for both metrics and compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TexSystem {
    #[default]
    Xelatex,
    Lualatex,
    Pdflatex,
}

impl TexSystem {
    /// The executable name.
    pub const fn program(self) -> &'static str {
        match self {
            Self::Xelatex => "xelatex",
            Self::Lualatex => "lualatex",
            Self::Pdflatex => "pdflatex",
        }
    }

    /// Whether the engine can load system fonts through `fontspec`.
    pub const fn uses_fontspec(self) -> bool {
        !matches!(self, Self::Pdflatex)
    }
}

impl fmt::Display for TexSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for TexSystem {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xelatex" => Ok(Self::Xelatex),
            "lualatex" => Ok(Self::Lualatex),
            "pdflatex" => Ok(Self::Pdflatex),
            _ => Err(ConfigError::UnknownTexSystem(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// FontFamilies
// ---------------------------------------------------------------------------

/// Candidate font names per generic family, in order of preference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FontFamilies {
    pub serif: Vec<String>,
    pub sans_serif: Vec<String>,
    pub monospace: Vec<String>,
}

impl Default for FontFamilies {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|&n| n.to_owned()).collect();
        Self {
            serif: owned(&["CMU Serif", "DejaVu Serif", "Times New Roman"]),
            sans_serif: owned(&["CMU Sans Serif", "DejaVu Sans", "Arial"]),
            monospace: owned(&["CMU Typewriter Text", "DejaVu Sans Mono", "Courier New"]),
        }
    }
}

// ---------------------------------------------------------------------------
// TexConfig
// ---------------------------------------------------------------------------

/// Options fixed for the lifetime of a render session.
///
/// Every field has a default, so a config file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TexConfig {
    /// Trace subprocess traffic and keep more diagnostics.
    pub debug: bool,
    pub texsystem: TexSystem,
    /// Extra preamble lines for every generated document.
    pub preamble: Vec<String>,
    /// Derive the document fonts from [`Self::font_families`].
    pub rcfonts: bool,
    /// Typeset inline math in display style.
    pub display_math: bool,
    pub font_families: FontFamilies,
    /// Upper bound on every wait for TeX output, in seconds.
    pub timeout_secs: u64,
}

impl Default for TexConfig {
    fn default() -> Self {
        Self {
            debug: false,
            texsystem: TexSystem::default(),
            preamble: Vec::new(),
            rcfonts: true,
            display_math: true,
            font_families: FontFamilies::default(),
            timeout_secs: 30,
        }
    }
}

impl TexConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// The read timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests may panic")]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TexConfig::default();
        assert_eq!(config.texsystem, TexSystem::Xelatex);
        assert!(config.rcfonts);
        assert!(config.display_math);
        assert!(!config.debug);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.font_families.serif[0], "CMU Serif");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = TexConfig::from_json_str(
            r#"{ "texsystem": "lualatex", "preamble": ["\\usepackage{siunitx}"] }"#,
        )
        .unwrap();
        assert_eq!(config.texsystem, TexSystem::Lualatex);
        assert_eq!(config.preamble, vec![r"\usepackage{siunitx}".to_owned()]);
        assert!(config.rcfonts);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn nested_font_families() {
        let config =
            TexConfig::from_json_str(r#"{ "font_families": { "serif": ["Libertinus Serif"] } }"#)
                .unwrap();
        assert_eq!(config.font_families.serif, vec!["Libertinus Serif".to_owned()]);
        assert_eq!(config.font_families.monospace, FontFamilies::default().monospace);
    }

    #[test]
    fn rejects_unknown_fields_and_engines() {
        assert!(matches!(
            TexConfig::from_json_str(r#"{ "texsytem": "xelatex" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            TexConfig::from_json_str(r#"{ "texsystem": "context" }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn texsystem_from_str() {
        assert_eq!("XeLaTeX".parse::<TexSystem>().unwrap(), TexSystem::Xelatex);
        assert_eq!("pdflatex".parse::<TexSystem>().unwrap(), TexSystem::Pdflatex);
        assert!(matches!(
            "tectonic".parse::<TexSystem>(),
            Err(ConfigError::UnknownTexSystem(name)) if name == "tectonic"
        ));
        assert!(!TexSystem::Pdflatex.uses_fontspec());
        assert!(TexSystem::Lualatex.uses_fontspec());
        assert_eq!(TexSystem::Lualatex.to_string(), "lualatex");
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = TexConfig::from_json_file(Path::new("/nonexistent/pgfkit.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "{err}");
    }
}
