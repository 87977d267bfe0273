//! The TeX side of the pgfkit backend: configuration, text sanitizing,
//! font selection commands and the preamble every TeX run shares.
//!
//! Nothing in here talks to a TeX process; `pgfkit-oracle` and
//! `pgfkit-pgf` assemble these pieces into the inputs they send.

pub mod config;
pub mod error;
pub mod font;
pub mod lookup;
pub mod preamble;
pub mod sanitize;

pub use config::{FontFamilies, TexConfig, TexSystem};
pub use error::ConfigError;
pub use font::{FontDescriptor, FontFamily, FontStyle, FontTranslator, FontWeight};
pub use lookup::{FamilySet, FontLookup, SystemFonts};
pub use sanitize::texify;
