//! ampfit CLI tool.
//!
//! Usage:
//! ```bash
//! ampfit convert [OPTIONS] [PATH]
//! ampfit list-rules
//! ampfit init
//! ```

use ampfit::HtmlFormat;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Converts HTML documents into AMP HTML
#[derive(Parser)]
#[command(name = "ampfit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an HTML file, or every HTML file below a directory
    Convert {
        /// File or directory to convert
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output file (or directory when converting a directory).
        /// A single file is written to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Diagnostics format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Canonical URL of the page; overrides the configuration
        #[arg(long)]
        canonical_url: Option<String>,

        /// Target dialect; overrides the configuration
        #[arg(long)]
        target: Option<TargetFormat>,

        /// Annotate removed and synthesized tags with comments
        #[arg(long)]
        debug: bool,

        /// Directory linked stylesheets and images are read from.
        /// Without it, resources are fetched over HTTP from the canonical host.
        #[arg(long)]
        root: Option<PathBuf>,

        /// Rewrite preset
        #[arg(long, default_value = "standard")]
        preset: PresetArg,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Exit with status 1 when any output is not valid AMP
        #[arg(long)]
        fail_on_fatal: bool,
    },

    /// List the tag rules for the configured format
    ListRules {
        /// Target dialect; overrides the configuration
        #[arg(long)]
        target: Option<TargetFormat>,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for diagnostics.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-diagnostic compact format.
    Compact,
}

/// Target dialect on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum TargetFormat {
    /// Regular AMP pages.
    Amp,
    /// AMP for ads.
    Amp4ads,
    /// AMP for email.
    Amp4email,
}

impl From<TargetFormat> for HtmlFormat {
    fn from(target: TargetFormat) -> Self {
        match target {
            TargetFormat::Amp => Self::Amp,
            TargetFormat::Amp4ads => Self::Amp4Ads,
            TargetFormat::Amp4email => Self::Amp4Email,
        }
    }
}

/// Rewrite preset on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum PresetArg {
    /// Built-in rewrites such as `img` → `amp-img`.
    Standard,
    /// No rewrites.
    None,
}

impl From<PresetArg> for ampfit::rules::Preset {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Standard => Self::Standard,
            PresetArg::None => Self::None,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            path,
            output,
            format,
            canonical_url,
            target,
            debug,
            root,
            preset,
            exclude,
            fail_on_fatal,
        } => {
            let source = config_resolver::resolve(&project_dir(&path), cli.config.as_deref());
            let options = commands::convert::Options {
                output,
                format,
                canonical_url,
                target: target.map(HtmlFormat::from),
                debug,
                root,
                preset: preset.into(),
                exclude,
                fail_on_fatal,
            };
            commands::convert::run(&path, &source, options)
        }
        Commands::ListRules { target } => {
            let source = config_resolver::resolve(&PathBuf::from("."), cli.config.as_deref());
            commands::list_rules::run(&source, target.map(HtmlFormat::from))
        }
        Commands::Init { force } => commands::init::run(force),
    }
}

/// Directory searched for a project configuration.
fn project_dir(path: &std::path::Path) -> PathBuf {
    if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), std::path::Path::to_path_buf)
    }
}
