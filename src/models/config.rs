use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Folder layout for one asset class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetClassDirs {
    #[serde(default)]
    pub daily_price_dir: Option<PathBuf>,
    #[serde(default)]
    pub daily_factor_dir: Option<PathBuf>,
    #[serde(default)]
    pub intraday_price_dir: Option<PathBuf>,
    #[serde(default)]
    pub intraday_factor_dir: Option<PathBuf>,
    #[serde(default)]
    pub forex_tester_dir: Option<PathBuf>,
}

/// JSON configuration: named universe files and per-asset-class folders
///
/// ```json
/// {
///   "universes": { "etf": "universe/etf.txt" },
///   "asset_classes": {
///     "equity": { "daily_price_dir": "data/daily/price" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub universes: HashMap<String, PathBuf>,
    #[serde(default)]
    pub asset_classes: HashMap<String, AssetClassDirs>,
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// A configured universe name resolves to its path, anything else is taken as a path
    pub fn resolve_universe(&self, name_or_path: &str) -> PathBuf {
        self.universes
            .get(name_or_path)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(name_or_path))
    }

    pub fn asset_class(&self, name: &str) -> Result<&AssetClassDirs> {
        self.asset_classes
            .get(name)
            .ok_or_else(|| Error::Config(format!("Unknown asset class: {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "universes": {"etf": "universe/etf.txt"},
                "asset_classes": {
                    "equity": {"daily_price_dir": "eq/price", "daily_factor_dir": "eq/factor"}
                }
            }"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.resolve_universe("etf"), PathBuf::from("universe/etf.txt"));
        assert_eq!(config.resolve_universe("other.txt"), PathBuf::from("other.txt"));

        let equity = config.asset_class("equity").unwrap();
        assert_eq!(equity.daily_price_dir, Some(PathBuf::from("eq/price")));
        assert_eq!(equity.intraday_price_dir, None);
        assert!(config.asset_class("fx").is_err());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(AppConfig::from_file(&path), Err(Error::Config(_))));
    }
}
