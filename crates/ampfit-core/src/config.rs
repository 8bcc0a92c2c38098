//! Configuration types for ampfit.

use crate::rules::model::HtmlFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default size budget of the custom stylesheet, in bytes.
pub const DEFAULT_STYLE_BUDGET: usize = 50_000;

/// Top-level configuration, usually read from `ampfit.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Conversion settings.
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Optional post-fit checks.
    #[serde(default)]
    pub checks: ChecksConfig,

    /// Rule source selection.
    #[serde(default)]
    pub rules: RulesConfig,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Reads the configured rule source.
    ///
    /// A relative `rules.path` is resolved against `base`. Returns an empty
    /// string when no path is configured, which selects the default rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule file cannot be read.
    pub fn rule_source(&self, base: &Path) -> Result<String, ConfigError> {
        let Some(path) = &self.rules.path else {
            return Ok(String::new());
        };
        let path = if path.is_absolute() {
            path.clone()
        } else {
            base.join(path)
        };
        std::fs::read_to_string(&path).map_err(|e| ConfigError::Io { path, source: e })
    }
}

/// Converter-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConverterConfig {
    /// URL of the canonical page; relative resources resolve against it.
    #[serde(default = "default_canonical_url")]
    pub canonical_url: String,

    /// Emit explanatory comments into the output.
    #[serde(default)]
    pub debug: bool,

    /// Output dialect.
    #[serde(default)]
    pub target_format: HtmlFormat,

    /// Custom stylesheet budget in bytes.
    #[serde(default = "default_style_budget")]
    pub style_budget: usize,

    /// How `blacklisted-value-regex` is interpreted.
    #[serde(default)]
    pub blacklist_polarity: BlacklistPolarity,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            canonical_url: default_canonical_url(),
            debug: false,
            target_format: HtmlFormat::default(),
            style_budget: DEFAULT_STYLE_BUDGET,
            blacklist_polarity: BlacklistPolarity::default(),
        }
    }
}

fn default_canonical_url() -> String {
    "/".to_string()
}

fn default_style_budget() -> usize {
    DEFAULT_STYLE_BUDGET
}

/// Interpretation of a blacklist pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlacklistPolarity {
    /// A value that does NOT match the pattern is a violation.
    #[default]
    Inverted,
    /// A value that matches the pattern is a violation.
    Standard,
}

impl BlacklistPolarity {
    /// Returns true if a value with the given match outcome is acceptable.
    #[must_use]
    pub const fn accepts(self, pattern_matched: bool) -> bool {
        match self {
            Self::Inverted => pattern_matched,
            Self::Standard => !pattern_matched,
        }
    }
}

/// Optional checks run after fitting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ChecksConfig {
    /// Report every `requires` id that no matched rule satisfies.
    #[serde(default)]
    pub verify_requires: bool,

    /// Reject absolute URLs whose scheme is not in the allowed list.
    #[serde(default)]
    pub enforce_allowed_protocols: bool,
}

/// Rule source selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Custom rule file; the built-in rules are used when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading a file.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.converter.canonical_url, "/");
        assert!(!config.converter.debug);
        assert_eq!(config.converter.target_format, HtmlFormat::Amp);
        assert_eq!(config.converter.style_budget, DEFAULT_STYLE_BUDGET);
        assert_eq!(
            config.converter.blacklist_polarity,
            BlacklistPolarity::Inverted
        );
        assert!(!config.checks.verify_requires);
        assert!(config.rules.path.is_none());
    }

    #[test]
    fn parse_full_config() {
        let config = Config::parse(
            r#"
[converter]
canonical-url = "https://example.com/article"
debug = true
target-format = "AMP4EMAIL"
style-budget = 1000
blacklist-polarity = "standard"

[checks]
verify-requires = true
enforce-allowed-protocols = true

[rules]
path = "rules.toml"
"#,
        )
        .unwrap();
        assert_eq!(config.converter.target_format, HtmlFormat::Amp4Email);
        assert_eq!(config.converter.style_budget, 1000);
        assert_eq!(
            config.converter.blacklist_polarity,
            BlacklistPolarity::Standard
        );
        assert!(config.checks.verify_requires && config.checks.enforce_allowed_protocols);
        assert_eq!(config.rules.path, Some(PathBuf::from("rules.toml")));
    }

    #[test]
    fn unknown_key_is_an_error() {
        let err = Config::parse("[converter]\ncanonical = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn polarity_accepts() {
        assert!(BlacklistPolarity::Inverted.accepts(true));
        assert!(!BlacklistPolarity::Inverted.accepts(false));
        assert!(BlacklistPolarity::Standard.accepts(false));
    }

    #[test]
    fn rule_source_empty_without_path() {
        let config = Config::new();
        assert_eq!(config.rule_source(Path::new(".")).unwrap(), "");
    }
}
