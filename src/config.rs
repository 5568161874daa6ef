//! Document bootstrap settings.
//!
//! Defaults describe a local demo chat server. Settings can come from a YAML
//! file, from a manifest's `document` section, or from `SIOAPI_*` variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `SIOAPI_TITLE` | `title` |
//! | `SIOAPI_VERSION` | `version` |
//! | `SIOAPI_DESCRIPTION` | `description` |
//! | `SIOAPI_SERVER_URL` | `server_url` |
//! | `SIOAPI_SERVER_NAME` | `server_name` |
//! | `SIOAPI_SERVER_PROTOCOL` | `server_protocol` |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocConfig {
    pub version: String,
    pub title: String,
    pub description: String,
    pub server_url: String,
    pub server_name: String,
    pub server_protocol: String,
}

impl Default for DocConfig {
    fn default() -> Self {
        DocConfig {
            version: "1.0.0".to_string(),
            title: "Demo Chat API".to_string(),
            description: "Demo Chat API".to_string(),
            server_url: "http://localhost:5000".to_string(),
            server_name: "BACKEND".to_string(),
            server_protocol: "socketio".to_string(),
        }
    }
}

impl DocConfig {
    /// Load settings from a YAML file; missing keys keep their defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Defaults overridden by `SIOAPI_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `SIOAPI_*` overrides on top of `self`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fields: [(&str, &mut String); 6] = [
            ("SIOAPI_VERSION", &mut self.version),
            ("SIOAPI_TITLE", &mut self.title),
            ("SIOAPI_DESCRIPTION", &mut self.description),
            ("SIOAPI_SERVER_URL", &mut self.server_url),
            ("SIOAPI_SERVER_NAME", &mut self.server_name),
            ("SIOAPI_SERVER_PROTOCOL", &mut self.server_protocol),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
        self
    }
}
