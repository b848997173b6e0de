//! Server configuration
//!
//! Loaded from a TOML file with defaults for every field, so the server
//! runs with no configuration at all.

use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default = "default_vendor")]
    pub vendor: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Expected authorization protocol name (e.g. "MIT-MAGIC-COOKIE-1").
    /// When unset, any client is accepted.
    #[serde(default)]
    pub auth_protocol: Option<String>,
    /// Expected authorization cookie, hex encoded.
    #[serde(default)]
    pub auth_cookie: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            screen: ScreenConfig::default(),
            vendor: default_vendor(),
            listen: default_listen(),
            auth_protocol: None,
            auth_cookie: None,
        }
    }
}

/// Geometry of the single advertised screen.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreenConfig {
    pub width: u16,
    pub height: u16,
    pub width_mm: u16,
    pub height_mm: u16,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            // ~96 DPI
            width_mm: (1280.0 / 96.0 * 25.4) as u16,
            height_mm: (800.0 / 96.0 * 25.4) as u16,
        }
    }
}

fn default_vendor() -> String {
    "remotex".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:6000".to_string()
}

pub fn load_config(path: Option<&str>) -> anyhow::Result<ServerConfig> {
    let config_path = path.unwrap_or("remotex.toml");

    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file '{}' not found, using defaults", config_path);
            return Ok(ServerConfig::default());
        }
        Err(e) => {
            return Err(anyhow::anyhow!(
                "Cannot read config file '{}': {}",
                config_path,
                e
            ));
        }
    };

    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", config_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.screen.width, 1280);
        assert_eq!(config.screen.height, 800);
        assert!(config.auth_protocol.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
            vendor = "testvendor"

            [screen]
            width = 640
            height = 480
            width_mm = 169
            height_mm = 127
            "#,
        )
        .unwrap();
        assert_eq!(config.vendor, "testvendor");
        assert_eq!(config.screen.width, 640);
        assert_eq!(config.listen, "127.0.0.1:6000");
    }
}
