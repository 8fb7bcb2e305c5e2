use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::store::STORE_FILE;

/// Settings supplied by the embedding application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub public_key: String,
    pub private_key: String,
    pub live: bool,
    pub return_url: String,
    pub cancel_url: String,
    /// Keep the request cycle alive after a checkout redirect (test harnesses).
    pub suppress_termination: bool,
    pub store_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            private_key: String::new(),
            live: false,
            return_url: String::new(),
            cancel_url: String::new(),
            suppress_termination: false,
            store_path: STORE_FILE.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}
