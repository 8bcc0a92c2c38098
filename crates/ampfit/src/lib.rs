//! # ampfit
//!
//! Converts ordinary HTML into AMP HTML.
//!
//! This is the main facade crate that re-exports the engine, the document
//! tree and the built-in rewrites.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ampfit::{convert_html, Converter, Severity};
//!
//! let converter = Converter::builder()
//!     .canonical_url("https://example.com/article")
//!     .rewrites(ampfit::rules::default_rewrites())
//!     .build()?;
//!
//! let conversion = convert_html(&converter, "<img src=hero.png alt=hero>")?;
//! println!("{}", conversion.to_html());
//! ```
//!
//! ## With a Configuration File
//!
//! ```rust,ignore
//! use ampfit::{builder_from_config, Config};
//! use ampfit::rules::Preset;
//!
//! let config = Config::from_file(Path::new("ampfit.toml"))?;
//! let converter = builder_from_config(&config, Path::new("."), Preset::Standard)?.build()?;
//! ```

#![forbid(unsafe_code)]

// Re-export core types and traits
pub use ampfit_core::*;

/// Document tree, parser and serializer.
pub mod dom {
    pub use ampfit_dom::*;
}

/// Built-in rewrites and presets.
pub mod rules {
    pub use ampfit_rules::*;
}

mod runner;

pub use runner::{builder_from_config, convert_html};
