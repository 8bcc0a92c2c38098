//! Converter orchestrating transformation, scaffolding, styling and fitting.

use crate::config::{BlacklistPolarity, ChecksConfig, Config, ConfigError};
use crate::context::{ConversionContext, DependencyLedger, Provenance};
use crate::fetch::{
    canonical_base, FetchError, FetcherRef, FetchingImageStats, HttpFetcher, ImageStatsRef,
};
use crate::fitter::Fitter;
use crate::matcher::Matcher;
use crate::repair::Repairer;
use crate::rewrite::{RewriteBox, TagRewrite};
use crate::rules::model::{HtmlFormat, RuleSet};
use crate::rules::{load_rules, LoadRulesError};
use crate::scaffold::ensure_skeleton;
use crate::store::RuleStore;
use crate::stylesheet::{inject_stylesheet, CssMinifier, DefaultMinifier};
use crate::synth::Synthesizer;
use crate::transform::{Resources, Transformer};
use crate::types::Diagnostics;
use ampfit_dom::Document;
use miette::Diagnostic;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Errors that abort a conversion.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ConvertError {
    /// The rule source could not be loaded.
    #[error("failed to load rules: {0}")]
    #[diagnostic(code(ampfit::convert::rules))]
    Rules(#[from] LoadRulesError),

    /// The configuration could not be read.
    #[error("configuration error: {0}")]
    #[diagnostic(code(ampfit::convert::config))]
    Config(#[from] ConfigError),

    /// A stylesheet or image could not be fetched.
    #[error(transparent)]
    #[diagnostic(
        code(ampfit::convert::fetch),
        help("check that the canonical URL points at the site serving these resources")
    )]
    Fetch(#[from] FetchError),

    /// The canonical URL is not a URL.
    #[error("invalid canonical URL `{url}`: {source}")]
    #[diagnostic(code(ampfit::convert::canonical_url))]
    InvalidCanonicalUrl {
        /// Configured value.
        url: String,
        /// Parse failure.
        source: url::ParseError,
    },

    /// A resource reference in the document cannot be resolved.
    #[error("cannot resolve `{reference}`: {source}")]
    #[diagnostic(code(ampfit::convert::resource_url))]
    InvalidResourceUrl {
        /// Reference as written in the document.
        reference: String,
        /// Parse failure.
        source: url::ParseError,
    },

    /// No fetcher was supplied and none can be derived.
    #[error("a fetcher is required: canonical URL `{url}` has no host")]
    #[diagnostic(
        code(ampfit::convert::fetcher_required),
        help("set an absolute canonical URL or supply a fetcher such as `FileFetcher`")
    )]
    FetcherRequired {
        /// Configured canonical URL.
        url: String,
    },

    /// The CSS minifier failed.
    #[error("failed to minify stylesheet: {message}")]
    #[diagnostic(code(ampfit::convert::minify))]
    Minify {
        /// Minifier message.
        message: String,
    },
}

// ────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────

enum RuleSource {
    Text(String),
    Set(Arc<RuleSet>),
}

/// Builder for configuring a [`Converter`].
///
/// Values set directly on the builder take precedence over those of a
/// [`Config`] passed to [`ConverterBuilder::config`].
#[derive(Default)]
pub struct ConverterBuilder {
    rules: Option<RuleSource>,
    config: Config,
    canonical_url: Option<String>,
    debug: Option<bool>,
    format: Option<HtmlFormat>,
    style_budget: Option<usize>,
    polarity: Option<BlacklistPolarity>,
    checks: Option<ChecksConfig>,
    fetcher: Option<FetcherRef>,
    image_stats: Option<ImageStatsRef>,
    rewrites: Vec<RewriteBox>,
    minifier: Option<Box<dyn CssMinifier>>,
}

impl ConverterBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses rules parsed from TOML text. Blank text selects the built-in rules.
    #[must_use]
    pub fn rules_text(mut self, text: impl Into<String>) -> Self {
        self.rules = Some(RuleSource::Text(text.into()));
        self
    }

    /// Uses an already loaded rule set.
    #[must_use]
    pub fn rule_set(mut self, rules: Arc<RuleSet>) -> Self {
        self.rules = Some(RuleSource::Set(rules));
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the canonical URL (default: `/`).
    #[must_use]
    pub fn canonical_url(mut self, url: impl Into<String>) -> Self {
        self.canonical_url = Some(url.into());
        self
    }

    /// Enables explanatory comments in the output (default: false).
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Sets the output dialect (default: AMP).
    #[must_use]
    pub fn format(mut self, format: HtmlFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets the custom stylesheet budget in bytes.
    #[must_use]
    pub fn style_budget(mut self, budget: usize) -> Self {
        self.style_budget = Some(budget);
        self
    }

    /// Sets how blacklist patterns are interpreted.
    #[must_use]
    pub fn blacklist_polarity(mut self, polarity: BlacklistPolarity) -> Self {
        self.polarity = Some(polarity);
        self
    }

    /// Sets the optional checks.
    #[must_use]
    pub fn checks(mut self, checks: ChecksConfig) -> Self {
        self.checks = Some(checks);
        self
    }

    /// Sets the stylesheet fetcher.
    #[must_use]
    pub fn fetcher(mut self, fetcher: FetcherRef) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the image metadata source.
    #[must_use]
    pub fn image_stats(mut self, stats: ImageStatsRef) -> Self {
        self.image_stats = Some(stats);
        self
    }

    /// Adds a tag rewrite.
    #[must_use]
    pub fn rewrite<R: TagRewrite + 'static>(mut self, rewrite: R) -> Self {
        self.rewrites.push(Box::new(rewrite));
        self
    }

    /// Adds boxed tag rewrites.
    #[must_use]
    pub fn rewrites<I>(mut self, rewrites: I) -> Self
    where
        I: IntoIterator<Item = RewriteBox>,
    {
        self.rewrites.extend(rewrites);
        self
    }

    /// Sets the CSS minifier.
    #[must_use]
    pub fn minifier<M: CssMinifier + 'static>(mut self, minifier: M) -> Self {
        self.minifier = Some(Box::new(minifier));
        self
    }

    /// Builds the converter.
    ///
    /// Without an explicit fetcher an HTTP fetcher is created, which needs a
    /// canonical URL with a host. Without explicit image stats, images are
    /// read through the fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be loaded, the canonical URL is
    /// invalid, or no fetcher can be provided.
    pub fn build(self) -> Result<Converter, ConvertError> {
        let settings = self.config.converter;

        let rules = match self.rules {
            Some(RuleSource::Set(set)) => set,
            Some(RuleSource::Text(text)) => Arc::new(load_rules(&text)?),
            None => Arc::new(load_rules("")?),
        };
        let format = self.format.unwrap_or(settings.target_format);
        let store = RuleStore::new(rules, format);

        let canonical_url = self.canonical_url.unwrap_or(settings.canonical_url);
        let base = canonical_base(&canonical_url).map_err(|source| {
            ConvertError::InvalidCanonicalUrl {
                url: canonical_url.clone(),
                source,
            }
        })?;

        let fetcher: FetcherRef = match self.fetcher {
            Some(fetcher) => fetcher,
            None if base.host_str().is_some() => Arc::new(HttpFetcher::new()?),
            None => {
                return Err(ConvertError::FetcherRequired { url: canonical_url });
            }
        };
        let image_stats: ImageStatsRef = match self.image_stats {
            Some(stats) => stats,
            None => Arc::new(FetchingImageStats::new(Arc::clone(&fetcher))),
        };
        let minifier: Box<dyn CssMinifier> = match self.minifier {
            Some(minifier) => minifier,
            None => Box::new(DefaultMinifier),
        };

        debug!(
            "Converter for {format} with {} rules, canonical URL {canonical_url}",
            store.rule_set().len()
        );
        Ok(Converter {
            store,
            canonical_url,
            base,
            debug: self.debug.unwrap_or(settings.debug),
            style_budget: self.style_budget.unwrap_or(settings.style_budget),
            polarity: self.polarity.unwrap_or(settings.blacklist_polarity),
            checks: self.checks.unwrap_or(self.config.checks),
            fetcher,
            image_stats,
            rewrites: self.rewrites,
            minifier,
        })
    }
}

// ────────────────────────────────────────────
// Converter
// ────────────────────────────────────────────

/// Result of a successful conversion.
#[derive(Debug)]
pub struct Conversion {
    /// The converted document.
    pub document: Document,
    /// Findings; fatal ones mean the output is not valid.
    pub diagnostics: Diagnostics,
    /// `requires` / `satisfies` assertions of matched rules.
    pub ledger: DependencyLedger,
    /// Rule → matched nodes.
    pub provenance: Provenance,
}

impl Conversion {
    /// Serializes the converted document.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.document.to_html()
    }
}

/// Converts HTML documents to AMP.
///
/// Use [`Converter::builder()`] to construct an instance. A converter holds
/// no per-document state, so one instance may serve many conversions.
pub struct Converter {
    store: RuleStore,
    canonical_url: String,
    base: Url,
    debug: bool,
    style_budget: usize,
    polarity: BlacklistPolarity,
    checks: ChecksConfig,
    fetcher: FetcherRef,
    image_stats: ImageStatsRef,
    rewrites: Vec<RewriteBox>,
    minifier: Box<dyn CssMinifier>,
}

impl Converter {
    /// Creates a new builder for configuring a converter.
    #[must_use]
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    /// Returns the rule store.
    #[must_use]
    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Returns the canonical URL.
    #[must_use]
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Returns the number of registered tag rewrites.
    #[must_use]
    pub fn rewrite_count(&self) -> usize {
        self.rewrites.len()
    }

    /// Converts a parsed document.
    ///
    /// # Errors
    ///
    /// Returns an error if a linked stylesheet or image cannot be read, a
    /// resource reference cannot be resolved, or minification fails.
    /// Validation findings never fail the call; see
    /// [`Conversion::diagnostics`].
    pub fn convert(&self, document: Document) -> Result<Conversion, ConvertError> {
        info!("Starting conversion to {}", self.store.format());

        let mut ctx = ConversionContext::new(document);
        let root = ctx.document.root();
        let repairer = Repairer::new(
            Matcher::new(&self.store, self.polarity),
            self.checks.enforce_allowed_protocols,
        );

        let resources = Resources {
            fetcher: self.fetcher.as_ref(),
            image_stats: self.image_stats.as_ref(),
            rewrites: &self.rewrites,
            base: &self.base,
        };
        Transformer::new(repairer, resources, self.debug).transform(&mut ctx, root)?;

        let head = ensure_skeleton(&mut ctx.document);
        inject_stylesheet(
            &mut ctx.document,
            head,
            &ctx.styles,
            self.style_budget,
            self.minifier.as_ref(),
            &mut ctx.diagnostics,
        )?;

        let fitter = Fitter::new(
            repairer,
            Synthesizer::new(&self.store, &self.canonical_url, self.debug),
        );
        fitter.fit_all(&mut ctx, root);
        if self.checks.verify_requires {
            fitter.verify_requirements(&mut ctx);
        }

        let (errors, warnings, infos) = ctx.diagnostics.count_by_severity();
        info!("Conversion complete: {errors} errors, {warnings} warnings, {infos} infos");

        Ok(Conversion {
            document: ctx.document,
            diagnostics: ctx.diagnostics,
            ledger: ctx.ledger,
            provenance: ctx.provenance,
        })
    }
}
