//! Config command implementation.

use crate::config::Config;
use crate::error::Result;
use std::path::Path;

/// Render the effective configuration, noting where it came from.
pub fn render_config(config: &Config, source: Option<&Path>) -> Result<String> {
    let origin = match source {
        Some(path) => format!("# Loaded from {}", path.display()),
        None => "# Built-in defaults (no config file found)".to_string(),
    };
    Ok(format!("{}\n{}", origin, config.to_toml()?))
}

/// Execute the config command.
pub fn execute_config(config: &Config, source: Option<&Path>) -> Result<()> {
    println!("{}", render_config(config, source)?);
    Ok(())
}
