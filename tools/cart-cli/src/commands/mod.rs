//! CLI command implementations.

pub mod config;
pub mod items;

use clap::{Args, Subcommand};

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Print only the total number of units.
    #[arg(long)]
    pub count: bool,
}

/// Arguments for the add command.
#[derive(Args)]
pub struct AddArgs {
    /// Product ID.
    pub id: String,

    /// Display title.
    #[arg(short, long)]
    pub title: String,

    /// Product image URL.
    #[arg(short, long, default_value = "")]
    pub image_url: String,

    /// Unit price.
    #[arg(short, long)]
    pub price: f64,

    /// Quantity (missing or 0 means 1). Ignored if the product is already in the cart.
    #[arg(short, long)]
    pub quantity: Option<u32>,
}

/// Arguments for commands that act on one cart item.
#[derive(Args)]
pub struct ItemArgs {
    /// Product ID.
    pub id: String,
}

/// Arguments for the clear command.
#[derive(Args)]
pub struct ClearArgs {
    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Application namespace for the cart key.
        #[arg(short, long, default_value = turbo_cart::config::DEFAULT_NAMESPACE)]
        namespace: String,

        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}
