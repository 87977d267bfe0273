//! Font availability lookup.
//!
//! The backend only ever asks one question of the host's fonts: is a
//! family with this name installed? [`FontLookup`] is that question;
//! [`SystemFonts`] answers it from the system font database and
//! [`FamilySet`] from a fixed list.

use std::collections::HashSet;

/// Trait for checking whether a font family is installed.
///
/// Family names are matched case-insensitively.
pub trait FontLookup: Send + Sync {
    /// Whether a family named `family` is available to TeX.
    fn is_installed(&self, family: &str) -> bool;
}

// ---------------------------------------------------------------------------
// FamilySet
// ---------------------------------------------------------------------------

/// An in-memory set of family names.
#[derive(Debug, Clone, Default)]
pub struct FamilySet {
    families: HashSet<String>,
}

impl FamilySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a family. The name is normalized to lowercase.
    pub fn insert(&mut self, family: &str) {
        self.families.insert(family.to_lowercase());
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for FamilySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for family in iter {
            set.insert(family.as_ref());
        }
        set
    }
}

impl FontLookup for FamilySet {
    fn is_installed(&self, family: &str) -> bool {
        self.families.contains(&family.to_lowercase())
    }
}

// ---------------------------------------------------------------------------
// SystemFonts
// ---------------------------------------------------------------------------

/// Families found in the system font directories.
///
/// The scan happens once, at construction.
#[derive(Debug, Clone)]
pub struct SystemFonts {
    families: FamilySet,
}

impl SystemFonts {
    /// Scan the system font directories.
    pub fn load() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let families: FamilySet = db
            .faces()
            .flat_map(|face| face.families.iter().map(|(name, _)| name.as_str()))
            .collect();
        log::debug!("found {} installed font families", families.len());
        Self { families }
    }
}

impl FontLookup for SystemFonts {
    fn is_installed(&self, family: &str) -> bool {
        self.families.is_installed(family)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_set_is_case_insensitive() {
        let set: FamilySet = ["DejaVu Sans", "Libertinus Serif"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.is_installed("dejavu sans"));
        assert!(set.is_installed("LIBERTINUS SERIF"));
        assert!(!set.is_installed("Comic Sans MS"));
    }

    #[test]
    fn duplicates_collapse() {
        let set: FamilySet = ["Arial", "arial", "ARIAL"].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
        assert!(FamilySet::new().is_empty());
    }

    #[test]
    fn system_fonts_never_report_nonsense() {
        // The host may have no fonts at all; a made-up family is never found.
        let fonts = SystemFonts::load();
        assert!(!fonts.is_installed("pgfkit-no-such-family-0xdeadbeef"));
    }
}
