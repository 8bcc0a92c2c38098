//! Helpers that wire configuration, rules and rewrites into a conversion.

use ampfit_core::{Config, Conversion, ConvertError, Converter, ConverterBuilder};
use ampfit_dom::parse_html;
use ampfit_rules::Preset;
use std::path::Path;
use tracing::debug;

/// Creates a converter builder from a configuration.
///
/// The rule source named by `rules.path` is read relative to `config_dir`;
/// without one the built-in rules are used. The rewrites of `preset` are
/// registered.
///
/// # Errors
///
/// Returns an error if the rule file cannot be read.
pub fn builder_from_config(
    config: &Config,
    config_dir: &Path,
    preset: Preset,
) -> Result<ConverterBuilder, ConvertError> {
    let rules = config.rule_source(config_dir)?;
    if !rules.is_empty() {
        debug!("Using custom rule source ({} bytes)", rules.len());
    }
    Ok(Converter::builder()
        .config(config.clone())
        .rules_text(rules)
        .rewrites(preset.rewrites()))
}

/// Parses `html` and converts it.
///
/// # Errors
///
/// Returns an error if a linked resource cannot be read or the stylesheet
/// cannot be minified.
pub fn convert_html(converter: &Converter, html: &str) -> Result<Conversion, ConvertError> {
    converter.convert(parse_html(html))
}
