//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use url::Url;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CONFIG_NAMES};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init {
            app_name,
            origin,
            force,
        } => init_config(app_name, &origin, force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }
    println!();
    print!("{}", toml::to_string_pretty(&ctx.config)?);

    Ok(())
}

fn init_config(app_name: Option<String>, origin: &str, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let origin = Url::parse(origin)?;
    let app_name = app_name.unwrap_or_else(|| {
        ctx.cwd
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("offline-app")
            .to_string()
    });

    let content = generate_default_config(&app_name, origin.as_str());
    fs::write(&config_path, content)?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    let mut warnings: Vec<String> = Vec::new();

    if ctx.config.worker.precache.is_empty() {
        warnings.push("worker.precache is empty; nothing will be available offline".to_string());
    }
    for url in &ctx.config.worker.precache {
        if ctx.config.worker.origin.join(url).is_err() {
            bail!("worker.precache entry '{}' is not a valid URL", url);
        }
    }
    if ctx.config.store.ttl_ms == 0 {
        warnings.push("store.ttl_ms is 0; entries expire immediately".to_string());
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
    } else {
        ctx.output.success("Configuration is valid (with warnings)");
    }

    Ok(())
}
