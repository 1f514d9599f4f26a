use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const API_KEY_ENV: &str = "EXCHANGE_RATE_API_KEY";
pub const HISTORY_PATH_ENV: &str = "CONVERTER_HISTORY_PATH";

pub const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com";
pub const DEFAULT_BASE_CURRENCY: &str = "USD";
pub const DEFAULT_HISTORY_PATH: &str = "history/conversions.jsonl";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// base_currency = "USD"
/// history_path = "/home/me/.local/share/converter/conversions.jsonl"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub base_currency: String,
    pub history_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            history_path: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "currency-converter", "converter")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay explicit values; empty keys are ignored.
    pub fn apply_overrides(&mut self, api_key: Option<String>, history_path: Option<PathBuf>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(path) = history_path {
            self.history_path = Some(path);
        }
    }

    /// Returns the API key, or an error with a hint when none (or a blank one) is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `converter configure` or set {API_KEY_ENV}."
            )
        })
    }

    pub fn history_path(&self) -> PathBuf {
        self.history_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();

        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.base_currency, "USD");
        assert_eq!(cfg.history_path(), PathBuf::from(DEFAULT_HISTORY_PATH));
    }

    #[test]
    fn require_api_key_errors_when_missing() {
        let cfg = Config::default();
        let err = cfg.require_api_key().unwrap_err();

        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn blank_key_from_file_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"  \"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        let err = loaded.require_api_key().unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = Config { api_key: Some("FILE_KEY".into()), ..Config::default() };

        cfg.apply_overrides(Some("  FLAG_KEY ".into()), Some(PathBuf::from("out/h.jsonl")));

        assert_eq!(cfg.require_api_key().unwrap(), "FLAG_KEY");
        assert_eq!(cfg.history_path(), PathBuf::from("out/h.jsonl"));
    }

    #[test]
    fn blank_override_keeps_existing_key() {
        let mut cfg = Config { api_key: Some("FILE_KEY".into()), ..Config::default() };

        cfg.apply_overrides(Some("   ".into()), None);

        assert_eq!(cfg.api_key.as_deref(), Some("FILE_KEY"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = Config {
            api_key: Some("KEY".into()),
            base_currency: "EUR".into(),
            history_path: Some(PathBuf::from("/tmp/h.jsonl")),
            ..Config::default()
        };
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("KEY"));
        assert_eq!(loaded.base_currency, "EUR");
        assert_eq!(loaded.base_url, DEFAULT_BASE_URL);
        assert_eq!(loaded.history_path, Some(PathBuf::from("/tmp/h.jsonl")));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"ABC\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("ABC"));
        assert_eq!(loaded.base_currency, DEFAULT_BASE_CURRENCY);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.api_key.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
