//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# ampfit configuration

[converter]
# URL of the canonical (non-AMP) page. Relative stylesheet and image
# references resolve against it.
canonical-url = "https://example.com/"

# Annotate removed and synthesized tags with HTML comments
debug = false

# Output dialect: AMP, AMP4ADS or AMP4EMAIL
target-format = "AMP"

# Custom stylesheet budget in bytes; larger stylesheets are minified
style-budget = 50000

# How blacklisted-value-regex is read: "inverted" or "standard"
blacklist-polarity = "inverted"

[checks]
# Report `requires` dependencies no tag satisfies
verify-requires = false

# Report URLs whose scheme is outside the rule's allowed protocols
enforce-allowed-protocols = false

[rules]
# Custom rule source; the built-in rules are used when unset
# path = "rules.toml"
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("ampfit.toml");
    write_config(config_path, force)?;

    println!("Created ampfit.toml");
    println!("\nNext steps:");
    println!("  1. Set canonical-url in ampfit.toml");
    println!("  2. Run: ampfit convert index.html -o index.amp.html");

    Ok(())
}

fn write_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampfit::{BlacklistPolarity, Config, HtmlFormat};
    use tempfile::TempDir;

    #[test]
    fn starter_config_parses_with_defaults() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.converter.canonical_url, "https://example.com/");
        assert_eq!(config.converter.target_format, HtmlFormat::Amp);
        assert_eq!(config.converter.blacklist_polarity, BlacklistPolarity::Inverted);
        assert!(!config.checks.verify_requires);
        assert!(config.rules.path.is_none());
    }

    #[test]
    fn existing_config_needs_force() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ampfit.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(write_config(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        write_config(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }
}
