//! Show the effective configuration

use crate::config::{default_config_path, AppConfig};
use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use std::path::Path;

pub async fn run(config: &AppConfig, source: Option<&Path>) -> Result<()> {
    match source {
        Some(path) => eprintln!(
            "Loaded from {}",
            path.display().if_supports_color(Stream::Stderr, |t| t.cyan())
        ),
        None => {
            let hint = default_config_path()
                .map(|p| format!(" (create {} to override)", p.display()))
                .unwrap_or_default();
            eprintln!(
                "{}{}",
                "Using built-in defaults".if_supports_color(Stream::Stderr, |t| t.dimmed()),
                hint
            );
        }
    }

    let text = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", text);
    Ok(())
}
