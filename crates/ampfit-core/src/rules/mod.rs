//! Declarative tag and attribute rules driven by TOML.
//!
//! # Architecture
//!
//! ```text
//! TOML text
//!   ↓ serde (DTO layer)
//! config_dto types
//!   ↓ validate + convert
//! RuleSet (pure domain model)
//!   ↓ RuleStore::new()
//! indexed, format-filtered view used by the converter
//! ```

pub mod config_dto;
pub mod loader;
pub mod model;

use miette::Diagnostic;

/// Rule set shipped with the crate, used when no rule text is supplied.
pub const DEFAULT_RULES: &str = include_str!("../../rules/validator.toml");

/// Errors from parsing TOML and loading rules.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum LoadRulesError {
    /// TOML deserialization failed.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(ampfit::rules::toml))]
    Toml(#[from] toml::de::Error),

    /// Domain model validation failed.
    #[error("{0}")]
    #[diagnostic(
        code(ampfit::rules::invalid),
        help("check the rule source against the `[[tags]]` / `[[attr-lists]]` format")
    )]
    Load(#[from] loader::LoadError),
}

/// Parses rule text into a validated [`model::RuleSet`].
///
/// Blank text selects [`DEFAULT_RULES`].
///
/// # Errors
///
/// Returns an error if TOML parsing or model validation fails.
pub fn load_rules(text: &str) -> Result<model::RuleSet, LoadRulesError> {
    let text = if text.trim().is_empty() {
        DEFAULT_RULES
    } else {
        text
    };
    let dto: config_dto::RuleSourceDto = toml::from_str(text)?;
    Ok(loader::load(dto)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{HtmlFormat, GLOBAL_ATTRS};

    #[test]
    fn default_rules_load() {
        let set = load_rules("").unwrap();
        assert!(!set.is_empty());
        assert!(set.group(GLOBAL_ATTRS).is_some());
        assert!(set.tags()[0].is_doctype());
    }

    #[test]
    fn default_rules_cover_boilerplate() {
        let set = load_rules("").unwrap();
        for name in [
            "head > style[amp-boilerplate]",
            "noscript enclosure for boilerplate",
            "noscript > style[amp-boilerplate]",
            "style amp-custom",
        ] {
            assert!(
                set.tags().iter().any(|t| t.spec_name() == Some(name)),
                "missing {name}"
            );
        }
    }

    #[test]
    fn default_rules_have_one_html_rule_per_format() {
        let set = load_rules("").unwrap();
        for format in [HtmlFormat::Amp, HtmlFormat::Amp4Ads, HtmlFormat::Amp4Email] {
            let count = set
                .tags()
                .iter()
                .filter(|t| t.names_tag("html") && t.applies_to(format))
                .count();
            assert_eq!(count, 1, "{format}");
        }
    }

    #[test]
    fn invalid_toml_is_reported() {
        assert!(matches!(
            load_rules("[[tags]"),
            Err(LoadRulesError::Toml(_))
        ));
    }
}
