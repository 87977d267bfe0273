//! Preamble lines shared by the metrics oracle and the standalone document.
//!
//! Both TeX runs must see the same fonts, or measured text would not match
//! the compiled figure.

use crate::config::TexConfig;
use crate::lookup::FontLookup;

/// `fontspec` setup for the configured engine.
///
/// Loads `fontspec` unless the engine is `pdflatex`. With `rcfonts` set,
/// also selects the first installed candidate of each generic family as
/// the main, sans and mono font. Families with no installed candidate
/// keep the TeX default.
pub fn fontspec_lines(config: &TexConfig, lookup: &dyn FontLookup) -> Vec<String> {
    let mut lines = Vec::new();
    if !config.texsystem.uses_fontspec() {
        return lines;
    }
    lines.push(r"\usepackage{fontspec}".to_owned());
    if !config.rcfonts {
        return lines;
    }

    let families = &config.font_families;
    let slots = [
        (r"\setmainfont", &families.serif),
        (r"\setsansfont", &families.sans_serif),
        (r"\setmonofont", &families.monospace),
    ];
    for (command, candidates) in slots {
        match candidates.iter().find(|name| lookup.is_installed(name)) {
            Some(name) => lines.push(format!("{command}{{{name}}}")),
            None => log::debug!("no installed font for {command}, keeping the TeX default"),
        }
    }
    lines
}

/// User preamble followed by font setup.
pub fn setup_lines(config: &TexConfig, lookup: &dyn FontLookup) -> Vec<String> {
    let mut lines = config.preamble.clone();
    lines.extend(fontspec_lines(config, lookup));
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
