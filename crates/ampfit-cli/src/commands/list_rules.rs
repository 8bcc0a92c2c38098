//! List rules command implementation.

use ampfit::rules::default_rewrites;
use ampfit::{load_rules, HtmlFormat, RuleStore};
use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config_resolver::ConfigSource;

/// Runs the list-rules command.
pub fn run(source: &ConfigSource, target: Option<HtmlFormat>) -> Result<()> {
    let (config, config_dir) = source.load()?;
    let text = config
        .rule_source(&config_dir)
        .context("Failed to read rule source")?;
    let rules = load_rules(&text).context("Failed to load rules")?;
    let format = target.unwrap_or(config.converter.target_format);
    let store = RuleStore::new(Arc::new(rules), format);

    println!("Tag rules for {format}:\n");
    println!("{:<14} {:<40} Flags", "Tag", "Name");
    println!("{}", "-".repeat(80));

    for rule in store.applicable() {
        let mut flags = Vec::new();
        if rule.mandatory() {
            flags.push("mandatory");
        }
        if rule.unique() {
            flags.push("unique");
        }
        if rule.deprecation().is_some() {
            flags.push("deprecated");
        }
        println!(
            "{:<14} {:<40} {}",
            rule.tag_name(),
            rule.spec_name().unwrap_or("-"),
            flags.join(",")
        );
    }

    println!("\nRewrites (preset `standard`):");
    for rewrite in default_rewrites() {
        println!(
            "  {:<8} -> {:<10} {}",
            rewrite.source_tag(),
            rewrite.target_tag(),
            rewrite.description()
        );
    }

    println!("\nUse --target to list another dialect, e.g.:");
    println!("  ampfit list-rules --target amp4email");
    Ok(())
}
