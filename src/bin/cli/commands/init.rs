use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::json;

use crate::app::resolve_config;
use crate::OutputFormat;

/// Write the effective settings (file, env and flags merged) to the config file
pub fn run(
    config_path: Option<&Path>,
    db: Option<PathBuf>,
    user: Option<String>,
    force: bool,
    format: &OutputFormat,
) -> Result<()> {
    let (path, config) = resolve_config(config_path, db, user)?;

    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    config
        .save(&path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    match format {
        OutputFormat::Json => {
            let output = json!({
                "path": path,
                "config": config,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Wrote {}", path.display());
            println!("  database: {}", config.database_path.display());
            println!("  user:     {}", config.default_user);
        }
    }

    Ok(())
}
