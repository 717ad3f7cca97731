//! Configuration file loading
//!
//! Lookup order: `--config`, then `$IMGTRIM_CONFIG`, then
//! `<user config dir>/imgtrim/config.toml`. Without any file the built-in
//! defaults apply.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trace::TraceOptions;
use trim_core::{ImagePath, PlannerConfig};

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "IMGTRIM_CONFIG";

/// Everything a configuration file may set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Paths that must never be deleted, merged with `--allow`
    pub allow: Vec<ImagePath>,
    pub planner: PlannerConfig,
    pub trace: TraceOptions,
}

/// Default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("imgtrim").join("config.toml"))
}

/// Load the effective configuration and the file it came from
///
/// An explicitly named file must exist; the default location is optional.
pub fn load(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((read(path)?, Some(path.to_path_buf())));
    }

    if let Some(value) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        let config = read(&path).with_context(|| format!("{} is set", CONFIG_ENV))?;
        return Ok((config, Some(path)));
    }

    match default_config_path() {
        Some(path) if path.is_file() => Ok((read(&path)?, Some(path))),
        _ => Ok((AppConfig::default(), None)),
    }
}

fn read(path: &Path) -> Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn parse(text: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(text)?;
    config.planner.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trim_core::AllowMatch;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse("").unwrap();
        assert!(config.allow.is_empty());
        assert_eq!(config.planner, PlannerConfig::default());
        assert_eq!(config.trace, TraceOptions::default());
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            r#"
allow = ["/etc/ssl", "/usr/share/zoneinfo"]

[planner]
critical_paths = ["/proc", "/sys", "/dev", "/run"]
allow_match = "strict"
warn_fraction = 0.75

[trace]
mount_prefix = "/var/lib/containers/storage/overlay/*/merged"
assume_directories = true
"#,
        )
        .unwrap();

        assert_eq!(config.allow.len(), 2);
        assert_eq!(config.planner.critical_paths.len(), 4);
        assert_eq!(config.planner.allow_match, AllowMatch::Strict);
        assert_eq!(config.planner.warn_fraction, 0.75);
        assert_eq!(config.trace.mount_prefix.as_ref().map(|p| p.len()), Some(7));
        assert!(config.trace.assume_directories);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse("allow = [\"relative/path\"]").is_err());
        assert!(parse("[planner]\nwarn_fraction = 0.0").is_err());
        assert!(parse("unknown_key = 1").is_err());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = parse(&text).unwrap();
        assert_eq!(back.planner, config.planner);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        assert!(load(Some(Path::new("/nonexistent/imgtrim/config.toml"))).is_err());
    }
}
