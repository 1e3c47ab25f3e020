//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use turbo_cart::{CartStore, LoadOutcome};
use turbo_kv::FileStore;

use crate::config::CliConfig;
use crate::output::Output;

/// Config file names, in lookup order.
const CONFIG_NAMES: [&str; 3] = ["cart.toml", ".cart.toml", "cart.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config = if let Some(path) = config_path {
            CliConfig::load(path)?
        } else {
            // Try to find config in current directory or parent directories
            find_config(&cwd).unwrap_or_default()
        };

        Ok(Self {
            config,
            output,
            cwd,
        })
    }

    /// Directory of the file-backed cart.
    pub fn storage_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.storage.dir)
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }

    /// Open the configured cart and wait for it to load.
    pub async fn open_cart(&self) -> Result<CartStore> {
        let dir = self.storage_dir();
        let files = FileStore::open(&dir)
            .await
            .with_context(|| format!("Failed to open cart storage: {}", dir.display()))?;

        let store = CartStore::open(files, &self.config.cart);
        match store.ready().await? {
            LoadOutcome::Restored { items } => {
                self.output
                    .debug(&format!("Loaded {} item(s) from {}", items, store.key()));
            }
            LoadOutcome::Empty => self.output.debug("No saved cart, starting empty"),
            LoadOutcome::Failed(reason) => {
                self.output
                    .warn(&format!("Saved cart could not be read, starting empty: {}", reason));
            }
        }

        // A restored cart is written back; finish that before the command
        // runs so the runtime never shuts down mid-write.
        store.flush().await?;

        Ok(store)
    }
}

/// Find config file in directory tree.
fn find_config(start: &Path) -> Option<CliConfig> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let config_path = current.join(name);
            if config_path.exists() {
                if let Ok(config) = CliConfig::load(config_path.to_str()?) {
                    return Some(config);
                }
            }
        }

        if !current.pop() {
            break;
        }
    }

    None
}
