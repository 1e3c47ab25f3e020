//! CLI configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use turbo_cart::CartConfig;

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Cart key configuration.
    #[serde(default)]
    pub cart: CartConfig,

    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }
}

/// Where the cart is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the file store, relative to the working directory.
    #[serde(default = "default_storage_dir")]
    pub dir: String,
}

fn default_storage_dir() -> String {
    ".cart".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

/// Generate a default cart.toml config file.
pub fn generate_default_config(namespace: &str) -> String {
    format!(
        r#"# Cart configuration

[cart]
namespace = "{namespace}"
key = "products"

[storage]
dir = ".cart"
"#,
        namespace = namespace
    )
}
