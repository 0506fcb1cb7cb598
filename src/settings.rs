use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{InsightsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub transactions_path: Option<String>,
    #[serde(default)]
    pub merchants_path: Option<String>,
    #[serde(default = "default_display_rows")]
    pub display_rows: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_output_dir() -> String {
    "reports".to_string()
}

fn default_display_rows() -> usize {
    50
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            transactions_path: None,
            merchants_path: None,
            display_rows: default_display_rows(),
            log_level: default_log_level(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("merchant-insights")
}

pub fn settings_path() -> PathBuf {
    std::env::var_os("MERCHANT_INSIGHTS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir().join("settings.json"))
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &std::path::Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

pub fn save_settings_to(path: &std::path::Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| InsightsError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("settings.json");
        let settings = Settings {
            output_dir: "/tmp/out".to_string(),
            transactions_path: Some("t.csv".to_string()),
            merchants_path: None,
            display_rows: 10,
            log_level: "debug".to_string(),
        };
        save_settings_to(&path, &settings).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.output_dir, "/tmp/out");
        assert_eq!(loaded.transactions_path.as_deref(), Some("t.csv"));
        assert!(loaded.merchants_path.is_none());
        assert_eq!(loaded.display_rows, 10);
        assert_eq!(loaded.log_level, "debug");
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("missing.json"));
        assert_eq!(s.output_dir, "reports");
        assert_eq!(s.display_rows, 50);
        assert_eq!(s.log_level, "warn");
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"output_dir": "/tmp/test", "display_rows": 5}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.output_dir, "/tmp/test");
        assert_eq!(s.display_rows, 5);
        assert_eq!(s.log_level, "warn");
        assert!(s.transactions_path.is_none());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings_from(&path).output_dir, "reports");
    }

    #[test]
    fn test_shellexpand_leaves_plain_paths() {
        assert_eq!(shellexpand_path("data/t.csv"), "data/t.csv");
    }
}
