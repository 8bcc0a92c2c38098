//! Convert command implementation.

use ampfit::rules::Preset;
use ampfit::{builder_from_config, canonical_base, convert_html, Converter, FileFetcher, HtmlFormat};
use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::output::{self, FileReport};
use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// File extensions treated as HTML in directory mode.
const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

/// Command-line options of `convert`.
pub struct Options {
    /// Output file or directory.
    pub output: Option<PathBuf>,
    /// Diagnostics format.
    pub format: OutputFormat,
    /// Canonical URL override.
    pub canonical_url: Option<String>,
    /// Target dialect override.
    pub target: Option<HtmlFormat>,
    /// Debug comments in the output.
    pub debug: bool,
    /// Local resource directory.
    pub root: Option<PathBuf>,
    /// Rewrite preset.
    pub preset: Preset,
    /// Exclude patterns for directory mode.
    pub exclude: Vec<String>,
    /// Exit with status 1 on fatal diagnostics.
    pub fail_on_fatal: bool,
}

/// Runs the convert command.
pub fn run(path: &Path, source: &ConfigSource, options: Options) -> Result<()> {
    let (config, config_dir) = source.load()?;

    let mut builder = builder_from_config(&config, &config_dir, options.preset)
        .context("Failed to load rules")?;
    if let Some(url) = &options.canonical_url {
        builder = builder.canonical_url(url.as_str());
    }
    if let Some(target) = options.target {
        builder = builder.format(target);
    }
    if options.debug {
        builder = builder.debug(true);
    }

    let canonical = options
        .canonical_url
        .as_deref()
        .unwrap_or(&config.converter.canonical_url);
    let has_host = canonical_base(canonical).is_ok_and(|url| url.host_str().is_some());
    let resource_root = match &options.root {
        Some(root) => Some(root.clone()),
        None if !has_host => Some(default_root(path)),
        None => None,
    };
    if let Some(root) = resource_root {
        tracing::debug!("Reading resources from {}", root.display());
        builder = builder.fetcher(std::sync::Arc::new(FileFetcher::new(root)));
    }

    let converter = builder.build().context("Failed to build converter")?;

    let reports = if path.is_dir() {
        let Some(out_dir) = &options.output else {
            bail!("Converting a directory requires --output <DIR>");
        };
        convert_dir(&converter, path, out_dir, &options.exclude)?
    } else {
        vec![convert_file(&converter, path, options.output.as_deref())?]
    };

    // With HTML on stdout, diagnostics go to stderr.
    if path.is_file() && options.output.is_none() {
        output::print(&reports, options.format, &mut std::io::stderr().lock())?;
    } else {
        output::print(&reports, options.format, &mut std::io::stdout().lock())?;
    }

    if options.fail_on_fatal && reports.iter().any(FileReport::has_fatal) {
        std::process::exit(1);
    }

    Ok(())
}

/// Converts one file, writing to `output` or stdout.
fn convert_file(converter: &Converter, path: &Path, output: Option<&Path>) -> Result<FileReport> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let conversion = convert_html(converter, &html)
        .map_err(|e| anyhow::anyhow!("{:?}", miette::Report::new(e)))
        .with_context(|| format!("Failed to convert {}", path.display()))?;

    let rendered = conversion.to_html();
    match output {
        Some(out) => write_output(out, &rendered)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
        }
    }

    Ok(FileReport {
        path: path.to_path_buf(),
        diagnostics: conversion.diagnostics,
    })
}

/// Converts every HTML file below `dir` into the same relative path below `out_dir`.
///
/// A file that fails to convert is reported and skipped.
fn convert_dir(
    converter: &Converter,
    dir: &Path,
    out_dir: &Path,
    exclude: &[String],
) -> Result<Vec<FileReport>> {
    let files = discover_files(dir, exclude)?;
    tracing::info!("Converting {} file(s) from {}", files.len(), dir.display());

    let mut reports = Vec::new();
    let mut failed = 0;
    for file in files {
        let relative = file.strip_prefix(dir).unwrap_or(file.as_path());
        let target = out_dir.join(relative);
        match convert_file(converter, &file, Some(&target)) {
            Ok(report) => reports.push(report),
            Err(e) => {
                failed += 1;
                tracing::error!("{e:#}");
            }
        }
    }
    if failed > 0 {
        tracing::warn!("{failed} file(s) could not be converted");
    }
    Ok(reports)
}

/// Lists the HTML files below `dir`, sorted, without excluded paths.
fn discover_files(dir: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_html(path) {
            continue;
        }
        if should_exclude(path, exclude) {
            tracing::debug!("Excluding: {}", path.display());
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| HTML_EXTENSIONS.iter().any(|h| h.eq_ignore_ascii_case(e)))
}

/// Checks if a path matches any exclude pattern.
fn should_exclude(path: &Path, patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();

    for pattern in patterns {
        if let Ok(glob_pattern) = glob::Pattern::new(pattern) {
            if glob_pattern.matches(&path_str) {
                return true;
            }
        }

        // Also check as substring for patterns like "**/drafts/**"
        let normalized_pattern = pattern.replace("**", "");
        if !normalized_pattern.is_empty() && path_str.contains(&normalized_pattern) {
            return true;
        }
    }

    false
}

fn default_root(path: &Path) -> PathBuf {
    if path.is_dir() {
        return path.to_path_buf();
    }
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn write_output(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn discovers_html_files_in_order() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("blog")).unwrap();
        fs::write(tmp.path().join("index.html"), "").unwrap();
        fs::write(tmp.path().join("blog/post.HTM"), "").unwrap();
        fs::write(tmp.path().join("style.css"), "").unwrap();

        let files = discover_files(tmp.path(), &[]).unwrap();
        assert_eq!(
            files,
            [tmp.path().join("blog/post.HTM"), tmp.path().join("index.html")]
        );
    }

    #[test]
    fn exclude_patterns_skip_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        fs::write(tmp.path().join("index.html"), "").unwrap();
        fs::write(tmp.path().join("drafts/wip.html"), "").unwrap();

        let files = discover_files(tmp.path(), &["**/drafts/**".to_string()]).unwrap();
        assert_eq!(files, [tmp.path().join("index.html")]);
    }

    #[test]
    fn converts_a_directory_into_mirrored_paths() {
        let site = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(site.path().join("css")).unwrap();
        fs::create_dir_all(site.path().join("blog")).unwrap();
        fs::write(site.path().join("css/site.css"), "p{margin:0}").unwrap();
        fs::write(
            site.path().join("blog/post.html"),
            r#"<link rel="stylesheet" href="/css/site.css"><p>hi</p>"#,
        )
        .unwrap();

        let converter = builder_from_config(&ampfit::Config::default(), Path::new("."), Preset::Standard)
            .unwrap()
            .fetcher(std::sync::Arc::new(FileFetcher::new(site.path())))
            .build()
            .unwrap();
        let reports = convert_dir(&converter, site.path(), out.path(), &[]).unwrap();

        assert_eq!(reports.len(), 1);
        let html = fs::read_to_string(out.path().join("blog/post.html")).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<style amp-custom>p{margin:0}\n</style>"));
        assert!(html.contains("<p>hi</p>"));
    }
}
