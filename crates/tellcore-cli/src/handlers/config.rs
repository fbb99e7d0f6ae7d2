//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat, ConfigShowArgs};
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use serde::Serialize;
use std::path::PathBuf;

/// Handle the config command
pub fn handle_config(args: ConfigArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    match args.action {
        ConfigAction::Show(show_args) => handle_config_show(show_args, config, output),
        ConfigAction::Paths => handle_config_paths(config, output),
    }
}

/// Handle config show subcommand
fn handle_config_show(
    args: ConfigShowArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    match &config.source {
        Some(path) => output.info(&format!("Loaded from {}", path.display()))?,
        None => output.info("No configuration file found, showing defaults")?,
    }

    let rendered = match args.format {
        ConfigFormat::Toml => config.to_toml()?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
    };
    output.writeln(rendered.trim_end())
}

#[derive(Debug, Serialize)]
struct SearchPath {
    path: PathBuf,
    exists: bool,
    active: bool,
}

/// Handle config paths subcommand
fn handle_config_paths(config: &Config, output: &mut OutputWriter) -> Result<()> {
    let paths: Vec<SearchPath> = Config::default_config_paths()
        .into_iter()
        .map(|path| SearchPath {
            exists: path.exists(),
            active: config.source.as_ref() == Some(&path),
            path,
        })
        .collect();

    if !output.is_human() {
        return output.data(&paths);
    }

    if let Some(source) = config.source.as_ref().filter(|s| !paths.iter().any(|p| &p.path == *s)) {
        output.writeln(&format!("* {} (from --config)", source.display()))?;
    }
    for entry in &paths {
        let marker = if entry.active { "*" } else { " " };
        let state = if entry.exists { "" } else { " (missing)" };
        output.writeln(&format!("{} {}{}", marker, entry.path.display(), state))?;
    }
    Ok(())
}
