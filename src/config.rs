//! Configuration management for the translation bridge.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use crate::types::EngineId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub sites: SitesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether auto mode starts enabled
    #[serde(default)]
    pub auto_mode: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            auto_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Quiet period after the last edit before a commit fires
    #[serde(default = "default_quiescence")]
    pub quiescence_ms: u64,

    /// Countdown refresh interval
    #[serde(default = "default_countdown_tick")]
    pub countdown_tick_ms: u64,

    /// Delay before reading a rich editor after a key release
    #[serde(default = "default_settle")]
    pub key_settle_ms: u64,

    /// Delay before reading a rich editor after a pointer release
    #[serde(default = "default_settle")]
    pub pointer_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            quiescence_ms: default_quiescence(),
            countdown_tick_ms: default_countdown_tick(),
            key_settle_ms: default_settle(),
            pointer_settle_ms: default_settle(),
        }
    }
}

impl TimingConfig {
    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn key_settle(&self) -> Duration {
        Duration::from_millis(self.key_settle_ms)
    }

    pub fn pointer_settle(&self) -> Duration {
        Duration::from_millis(self.pointer_settle_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Engine selected at startup
    #[serde(default)]
    pub engine: EngineId,

    /// Google `translate_a/single` endpoint
    #[serde(default = "default_google_endpoint")]
    pub google_endpoint: String,

    /// DeepL REST endpoint
    #[serde(default = "default_deepl_endpoint")]
    pub deepl_endpoint: String,

    #[serde(default = "default_source_lang")]
    pub source_lang: String,

    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    /// HTTP request timeout
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// DeepL API key; without one DeepL requests use the Google endpoint
    #[serde(default)]
    pub deepl_api_key: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            engine: EngineId::default(),
            google_endpoint: default_google_endpoint(),
            deepl_endpoint: default_deepl_endpoint(),
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            timeout_seconds: default_timeout(),
            deepl_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Class markers identifying rich editor containers, checked in order
    #[serde(default = "default_rich_editor_classes")]
    pub rich_editor_classes: Vec<String>,

    /// Class added to the bound target
    #[serde(default = "default_marker_class")]
    pub marker_class: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            rich_editor_classes: default_rich_editor_classes(),
            marker_class: default_marker_class(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Remember the bound target across page loads
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Key the selection is stored under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Path of the JSON store; defaults to the config directory
    #[serde(default)]
    pub store_path: Option<String>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_key: default_storage_key(),
            store_path: None,
        }
    }
}

impl PersistenceConfig {
    pub fn resolved_store_path(&self) -> PathBuf {
        match &self.store_path {
            Some(path) => PathBuf::from(path),
            None => Config::config_dir().join("storage.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    /// Hosts (and their subdomains) whose editors need a subtree observer
    #[serde(default = "default_mutation_observer_hosts")]
    pub mutation_observer_hosts: Vec<String>,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            mutation_observer_hosts: default_mutation_observer_hosts(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_quiescence() -> u64 {
    2500
}

fn default_countdown_tick() -> u64 {
    1000
}

fn default_settle() -> u64 {
    200
}

fn default_google_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_deepl_endpoint() -> String {
    "https://api-free.deepl.com/v2/translate".to_string()
}

fn default_source_lang() -> String {
    "zh-CN".to_string()
}

fn default_target_lang() -> String {
    "en".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_rich_editor_classes() -> Vec<String> {
    vec!["editor".to_string(), "ql-editor".to_string()]
}

fn default_marker_class() -> String {
    "active-element".to_string()
}

fn default_storage_key() -> String {
    crate::persistence::LAST_SELECTION_KEY.to_string()
}

fn default_mutation_observer_hosts() -> Vec<String> {
    vec!["reddit.com".to_string()]
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Directory holding the config file and the selection store
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("translate-bridge")
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timing.quiescence_ms, 2500);
        assert_eq!(config.timing.countdown_tick(), Duration::from_secs(1));
        assert_eq!(config.translation.engine, EngineId::Google);
        assert_eq!(config.translation.source_lang, "zh-CN");
        assert_eq!(config.persistence.storage_key, "lastSelectedElement");
        assert!(!config.general.auto_mode);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[timing]
quiescence_ms = 1500

[translation]
engine = "deepl"
deepl_api_key = "abc:fx"

[sites]
mutation_observer_hosts = ["reddit.com", "example.org"]
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.timing.quiescence_ms, 1500);
        assert_eq!(config.timing.key_settle_ms, 200);
        assert_eq!(config.translation.engine, EngineId::DeepL);
        assert_eq!(config.translation.deepl_api_key.as_deref(), Some("abc:fx"));
        assert_eq!(config.sites.mutation_observer_hosts.len(), 2);
        assert_eq!(
            config.selection.rich_editor_classes,
            vec!["editor".to_string(), "ql-editor".to_string()]
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.general.auto_mode = true;
        config.timing.quiescence_ms = 4000;
        config.save_to_path(path.clone()).unwrap();

        let loaded = Config::load_from_path(path);
        assert!(loaded.general.auto_mode);
        assert_eq!(loaded.timing.quiescence_ms, 4000);
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timing = [").unwrap();

        let config = Config::load_from_path(path);
        assert_eq!(config.timing.quiescence_ms, 2500);
    }

    #[test]
    fn test_store_path_override() {
        let mut persistence = PersistenceConfig::default();
        assert!(persistence.resolved_store_path().ends_with("storage.json"));
        persistence.store_path = Some("/tmp/tb.json".to_string());
        assert_eq!(persistence.resolved_store_path(), PathBuf::from("/tmp/tb.json"));
    }
}
