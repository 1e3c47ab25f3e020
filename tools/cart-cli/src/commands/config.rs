//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { namespace, force } => init_config(&namespace, force, ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");

    ctx.output.info("[cart]");
    ctx.output.kv("namespace", &ctx.config.cart.namespace);
    ctx.output.kv("key", &ctx.config.cart.key);
    ctx.output.kv("storage key", &ctx.config.cart.storage_key());

    ctx.output.info("[storage]");
    ctx.output.kv("dir", &ctx.config.storage.dir);
    ctx.output.kv("resolved", &ctx.storage_dir().display().to_string());

    Ok(())
}

async fn init_config(namespace: &str, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("cart.toml");

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config(namespace))?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}
