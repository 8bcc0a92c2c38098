//! Rewrite presets.

use crate::ImgToAmpImg;
use ampfit_core::RewriteBox;

/// Preset rewrite tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Every built-in rewrite.
    #[default]
    Standard,
    /// No rewrites; elements without a rule are removed instead.
    None,
}

impl Preset {
    /// Returns the rewrites for this preset.
    #[must_use]
    pub fn rewrites(self) -> Vec<RewriteBox> {
        match self {
            Self::Standard => default_rewrites(),
            Self::None => Vec::new(),
        }
    }

    /// Parses a preset name as used on the command line.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Returns the built-in rewrite table.
///
/// Includes:
/// - `img` → `amp-img`
#[must_use]
pub fn default_rewrites() -> Vec<RewriteBox> {
    vec![Box::new(ImgToAmpImg::new())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_rewrites() {
        let standard = Preset::Standard.rewrites();
        assert_eq!(standard.len(), 1);
        assert_eq!(standard[0].source_tag(), "img");
        assert!(Preset::None.rewrites().is_empty());
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(Preset::from_name("Standard"), Some(Preset::Standard));
        assert_eq!(Preset::from_name("none"), Some(Preset::None));
        assert_eq!(Preset::from_name("strict"), None);
    }
}
