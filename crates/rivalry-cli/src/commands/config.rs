//! Config command

use std::path::Path;

use anyhow::Result;
use rivalry_core::config::default_config_path;

use super::core::load_config;

/// Effective config as TOML, or the override location when `path_only`
pub fn render_config(config_path: Option<&Path>, path_only: bool) -> Result<String> {
    if path_only {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(default_config_path);
        return Ok(match path {
            Some(path) if path.exists() => path.display().to_string(),
            Some(path) => format!("{} (not present, using built-in defaults)", path.display()),
            None => "No data directory; using built-in defaults".to_string(),
        });
    }

    Ok(load_config(config_path)?.to_toml_string()?)
}

pub fn cmd_config(config_path: Option<&Path>, path_only: bool) -> Result<()> {
    println!("{}", render_config(config_path, path_only)?);
    Ok(())
}
