//! Configuration file resolution with global fallback.
//!
//! Resolves the configuration file path using a deterministic priority order:
//!
//! 1. `--config` flag (explicit path)
//! 2. `{project}/ampfit.toml` or `.ampfit.toml`
//! 3. `$AMPFIT_CONFIG_DIR/config.toml` or `~/.ampfit/config.toml`
//! 4. No config found → defaults

use ampfit::Config;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly specified via `--config` flag.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Loaded from the global config directory.
    Global(PathBuf),
    /// No config found; defaults will be used.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Returns `true` if the config was loaded from the global directory.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }

    /// Loads the configuration.
    ///
    /// Returns it with the directory relative rule paths resolve against:
    /// the config file's directory, or the current directory for defaults.
    pub fn load(&self) -> Result<(Config, PathBuf)> {
        let Some(path) = self.path() else {
            return Ok((Config::default(), PathBuf::from(".")));
        };
        if self.is_global() {
            tracing::info!("Using global config: {}", path.display());
        }
        let config = Config::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok((config, dir))
    }
}

/// Project-level config file names, checked in order.
const PROJECT_CONFIG_NAMES: &[&str] = &["ampfit.toml", ".ampfit.toml"];

/// Config file name within the global config directory.
const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Resolves the configuration file path.
///
/// See module-level docs for resolution order.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_inner(project_dir, explicit, global_config_dir())
}

/// Testable core: accepts `global_dir` as parameter to avoid env var races.
fn resolve_inner(
    project_dir: &Path,
    explicit: Option<&Path>,
    global_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    for name in PROJECT_CONFIG_NAMES {
        let candidate = project_dir.join(name);
        if candidate.exists() {
            tracing::debug!("Found project config: {}", candidate.display());
            return ConfigSource::Project(candidate);
        }
    }

    if let Some(dir) = global_dir {
        let candidate = dir.join(GLOBAL_CONFIG_NAME);
        if candidate.exists() {
            tracing::debug!("Found global config: {}", candidate.display());
            return ConfigSource::Global(candidate);
        }
    }

    ConfigSource::Default
}

/// Returns the global config directory path.
///
/// Resolution: `$AMPFIT_CONFIG_DIR` > `~/.ampfit/`
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("AMPFIT_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".ampfit"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_takes_priority_over_project() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("custom.toml");
        fs::write(&explicit, "").unwrap();

        let project = tmp.path().join("project");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("ampfit.toml"), "").unwrap();

        let result = resolve_inner(&project, Some(&explicit), None);
        assert_eq!(result, ConfigSource::Explicit(explicit));
    }

    #[test]
    fn explicit_does_not_check_existence() {
        let result = resolve_inner(
            Path::new("/tmp"),
            Some(Path::new("/nonexistent.toml")),
            None,
        );
        assert_eq!(
            result,
            ConfigSource::Explicit(PathBuf::from("/nonexistent.toml"))
        );
    }

    #[test]
    fn ampfit_toml_preferred_over_dot_prefix() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("ampfit.toml"), "").unwrap();
        fs::write(tmp.path().join(".ampfit.toml"), "").unwrap();

        let result = resolve_inner(tmp.path(), None, None);
        assert_eq!(result, ConfigSource::Project(tmp.path().join("ampfit.toml")));
    }

    #[test]
    fn dot_ampfit_toml_found() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".ampfit.toml"), "").unwrap();

        let result = resolve_inner(tmp.path(), None, None);
        assert_eq!(result, ConfigSource::Project(tmp.path().join(".ampfit.toml")));
    }

    #[test]
    fn global_fallback_when_no_project_config() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config.toml"), "").unwrap();

        let result = resolve_inner(project.path(), None, Some(global.path().to_path_buf()));
        assert_eq!(result, ConfigSource::Global(global.path().join("config.toml")));
    }

    #[test]
    fn global_dir_missing_config_file_returns_default() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();

        let result = resolve_inner(project.path(), None, Some(global.path().to_path_buf()));
        assert_eq!(result, ConfigSource::Default);
    }

    #[test]
    fn load_resolves_against_config_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ampfit.toml");
        fs::write(
            &path,
            "[converter]\ncanonical-url = \"https://example.com/\"\n",
        )
        .unwrap();

        let (config, dir) = ConfigSource::Project(path).load().unwrap();
        assert_eq!(config.converter.canonical_url, "https://example.com/");
        assert_eq!(dir, tmp.path());
    }

    #[test]
    fn load_defaults_without_a_file() {
        let (config, dir) = ConfigSource::Default.load().unwrap();
        assert_eq!(config.converter.canonical_url, "/");
        assert_eq!(dir, PathBuf::from("."));
    }

    #[test]
    fn load_reports_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ampfit.toml");
        fs::write(&path, "[converter\n").unwrap();

        let err = ConfigSource::Explicit(path).load().unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
