//! Configuration file support
//!
//! Loads settings from a TOML file. Every section is optional and falls
//! back to its defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub storage: StorageConfig,
    pub records: RecordsConfig,
    pub caption_api: CaptionApiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `<org>/<course>/<asset>` files
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Directory holding `<record id>.json` files
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionApiConfig {
    pub url: String,
    /// Extra query parameters; `v` is always set to the requested source id
    pub params: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
            records: RecordsConfig::default(),
            caption_api: CaptionApiConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("records"),
        }
    }
}

impl Default for CaptionApiConfig {
    fn default() -> Self {
        let mut params = BTreeMap::new();
        params.insert("lang".to_string(), "en".to_string());
        Self {
            url: "http://video.google.com/timedtext".to_string(),
            params,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: '{}'", path.display()))?;
        Self::from_toml(&content)
            .context(format!("Failed to parse config file: '{}'", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads `path` if given, otherwise `subsync.toml` when it exists,
    /// otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new("subsync.toml");
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
log_level = "debug"

[caption_api]
url = "http://captions.local/api"

[caption_api.params]
lang = "fr"
fmt = "srv1"
"#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.caption_api.url, "http://captions.local/api");
        assert_eq!(config.caption_api.params.get("fmt").map(String::as_str), Some("srv1"));
        assert_eq!(config.caption_api.timeout_secs, 30);
        assert_eq!(config.storage.root, PathBuf::from("assets"));
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subsync.toml");
        std::fs::write(&path, "[storage]\nroot = \"/srv/assets\"\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/srv/assets"));
        assert!(Config::load(Some(dir.path().join("missing.toml").as_path())).is_err());
    }

    #[test]
    fn rejects_invalid_toml() {
        assert!(Config::from_toml("log_level = [").is_err());
    }
}
