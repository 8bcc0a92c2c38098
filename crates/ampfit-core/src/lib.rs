//! # ampfit-core
//!
//! Rule-driven engine that converts ordinary HTML into AMP HTML.
//!
//! The engine is driven by a declarative rule set (TOML) describing which
//! tags and attributes AMP allows. It includes:
//!
//! - [`rules`]: the rule model and its TOML loader
//! - [`Matcher`] for deciding which rules a tag satisfies
//! - [`Converter`] for orchestrating a conversion
//! - [`TagRewrite`] for typed element replacements such as `img → amp-img`
//! - [`Fetcher`] and [`ImageStats`] for reading linked resources
//! - [`Diagnostic`] for representing findings
//!
//! ## Example
//!
//! ```ignore
//! use ampfit_core::{Converter, FileFetcher};
//! use ampfit_dom::parse_html;
//! use std::sync::Arc;
//!
//! let converter = Converter::builder()
//!     .canonical_url("https://example.com/article")
//!     .fetcher(Arc::new(FileFetcher::new("./public")))
//!     .build()?;
//!
//! let conversion = converter.convert(parse_html(&html))?;
//! println!("{}", conversion.to_html());
//! print!("{}", conversion.diagnostics.format_report(Severity::Warning));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod converter;
mod fetch;
mod fitter;
mod matcher;
mod properties;
mod repair;
mod rewrite;
mod scaffold;
mod store;
mod stylesheet;
mod synth;
mod transform;
mod types;

/// Declarative tag and attribute rules.
pub mod rules;

pub use config::{
    BlacklistPolarity, ChecksConfig, Config, ConfigError, ConverterConfig, RulesConfig,
    DEFAULT_STYLE_BUDGET,
};
pub use context::{ConversionContext, DependencyLedger, Provenance};
pub use converter::{Conversion, ConvertError, Converter, ConverterBuilder};
pub use fetch::{
    canonical_base, parse_lenient, resolve_resource_url, FetchError, Fetcher, FetcherRef,
    FetchingImageStats, FileFetcher, HttpFetcher, ImageSize, ImageStats, ImageStatsRef,
};
pub use fitter::Fitter;
pub use matcher::Matcher;
pub use properties::{Property, PropertyList};
pub use repair::Repairer;
pub use rewrite::{find_rewrite, is_rewrite_target, RewriteBox, RewriteContext, TagRewrite};
pub use rules::model::{HtmlFormat, RuleId, RuleSet, TagRule};
pub use rules::{load_rules, LoadRulesError, DEFAULT_RULES};
pub use scaffold::ensure_skeleton;
pub use store::RuleStore;
pub use stylesheet::{
    inject_stylesheet, inline_style_class, CssMinifier, DefaultMinifier, StyleMap,
};
pub use synth::{
    Synthesizer, HEAD_BOILERPLATE_CSS, NOSCRIPT_BOILERPLATE_CSS,
};
pub use transform::{Resources, Transformer};
pub use types::{Cause, Diagnostic, DiagnosticKind, Diagnostics, Severity};
