//! Cart CLI - Command line tool for a TurboCart cart.
//!
//! Commands:
//! - `cart list` - Show the items in the cart
//! - `cart add` - Add a product to the cart
//! - `cart increment` - Add one unit of a product
//! - `cart decrement` - Remove one unit of a product
//! - `cart clear` - Empty the cart
//! - `cart config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{AddArgs, ClearArgs, ConfigArgs, ItemArgs, ListArgs};

/// Cart CLI - Inspect and edit a persisted shopping cart
#[derive(Parser)]
#[command(name = "cart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the items in the cart
    List(ListArgs),

    /// Add a product to the cart
    Add(AddArgs),

    /// Add one unit of a product already in the cart
    Increment(ItemArgs),

    /// Remove one unit of a product; the last unit removes it
    Decrement(ItemArgs),

    /// Remove every item from the cart
    Clear(ClearArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    // Execute command
    let result = match cli.command {
        Commands::List(args) => commands::items::list(args, &ctx).await,
        Commands::Add(args) => commands::items::add(args, &ctx).await,
        Commands::Increment(args) => commands::items::increment(args, &ctx).await,
        Commands::Decrement(args) => commands::items::decrement(args, &ctx).await,
        Commands::Clear(args) => commands::items::clear(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
