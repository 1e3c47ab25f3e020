//! Cart store configuration.

use serde::{Deserialize, Serialize};
use turbo_kv::storage_key;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "turbo-cart";

/// Key name used when none is configured.
pub const DEFAULT_KEY: &str = "products";

/// Where a cart store keeps its persisted item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartConfig {
    /// Application namespace; becomes the `@namespace` key prefix.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Key name inside the namespace.
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_key() -> String {
    DEFAULT_KEY.to_string()
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            key: default_key(),
        }
    }
}

impl CartConfig {
    /// Create a configuration for an application namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Set the key name.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// The fully qualified storage key, e.g. `@turbo-cart:products`.
    pub fn storage_key(&self) -> String {
        storage_key!(format!("@{}", self.namespace), self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_storage_key() {
        assert_eq!(CartConfig::default().storage_key(), "@turbo-cart:products");
    }

    #[test]
    fn test_custom_storage_key() {
        let config = CartConfig::new("shop").with_key("basket");
        assert_eq!(config.storage_key(), "@shop:basket");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: CartConfig = serde_json::from_str(r#"{"namespace":"shop"}"#).unwrap();
        assert_eq!(config.key, DEFAULT_KEY);
        assert_eq!(config.storage_key(), "@shop:products");
    }
}
