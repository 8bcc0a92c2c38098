//! # ampfit-rules
//!
//! Built-in tag rewrites for ampfit.
//!
//! A rewrite replaces an element the AMP format forbids with the typed
//! component that takes its place. Rewrites run during the transform pass,
//! before structural fitting.
//!
//! ## Available Rewrites
//!
//! | Source | Target | Description |
//! |--------|--------|-------------|
//! | `img` | `amp-img` | Resolves the image, adds its dimensions and a responsive layout |
//!
//! ## Usage
//!
//! ```ignore
//! use ampfit_core::Converter;
//! use ampfit_rules::default_rewrites;
//!
//! let converter = Converter::builder()
//!     .canonical_url("https://example.com/article")
//!     .rewrites(default_rewrites())
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod amp_img;
mod presets;

pub use amp_img::ImgToAmpImg;
pub use presets::{default_rewrites, Preset};

/// Re-export core types for convenience.
pub use ampfit_core::{RewriteBox, RewriteContext, TagRewrite};
