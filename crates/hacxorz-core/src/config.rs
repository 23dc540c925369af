use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HacxorzError, Result};

/// Top-level configuration for the HacXorZ chat client.
///
/// Loaded from `~/.hacxorz/config.toml` by default. Each section corresponds
/// to one part of the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HacxorzConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub nudges: NudgeConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl HacxorzConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HacxorzConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| HacxorzError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the chat core cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chat.page_size == 0 {
            return Err(HacxorzError::Config("chat.page_size must be > 0".into()));
        }
        if self.chat.search_quiet_ms == 0 {
            return Err(HacxorzError::Config(
                "chat.search_quiet_ms must be > 0".into(),
            ));
        }
        if self.chat.max_message_length == 0 {
            return Err(HacxorzError::Config(
                "chat.max_message_length must be > 0".into(),
            ));
        }
        if self.nudges.interval_secs == 0
            || self.nudges.display_secs == 0
            || self.nudges.warning_secs == 0
        {
            return Err(HacxorzError::Config(
                "nudge interval and durations must be > 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.nudges.low_confidence_threshold) {
            return Err(HacxorzError::Config(format!(
                "nudges.low_confidence_threshold must be within [0, 100], got {}",
                self.nudges.low_confidence_threshold
            )));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite session store.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Owner identity used to scope session queries. Empty means `$USER`.
    pub owner: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.hacxorz/data".to_string(),
            log_level: "info".to_string(),
            owner: String::new(),
        }
    }
}

/// Session and message handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Messages revealed per pagination step.
    pub page_size: usize,
    /// Maximum accepted message length in characters.
    pub max_message_length: usize,
    /// Title given to freshly created sessions.
    pub default_title: String,
    /// Characters kept when deriving a title from the first message.
    pub title_max_chars: usize,
    /// Quiet interval before a search query is evaluated.
    pub search_quiet_ms: u64,
    /// Whether confidence scores are shown next to replies.
    pub show_confidence: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_message_length: 2000,
            default_title: "New Chat".to_string(),
            title_max_chars: 30,
            search_quiet_ms: 300,
            show_confidence: true,
        }
    }
}

impl ChatConfig {
    pub fn search_quiet(&self) -> Duration {
        Duration::from_millis(self.search_quiet_ms)
    }
}

/// Periodic advisory nudges and confidence warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NudgeConfig {
    /// Whether the periodic advisory rotation runs.
    pub enabled: bool,
    /// Seconds between periodic nudges.
    pub interval_secs: u64,
    /// Seconds a periodic nudge stays visible.
    pub display_secs: u64,
    /// Seconds a confidence warning stays visible.
    pub warning_secs: u64,
    /// Replies scoring below this raise a warning.
    pub low_confidence_threshold: f64,
    /// Whether low-confidence warnings are shown at all.
    pub confidence_warnings: bool,
    /// Advisory texts picked at random by the rotation.
    pub messages: Vec<String>,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            display_secs: 8,
            warning_secs: 10,
            low_confidence_threshold: 60.0,
            confidence_warnings: true,
            messages: vec![
                "💡 Remember: You control your data — clear anytime.".to_string(),
                "⏰ Take a break every 15 minutes for mental wellbeing.".to_string(),
                "🔒 Your privacy matters - check settings for controls.".to_string(),
                "✨ AI works best with clear, specific questions.".to_string(),
            ],
        }
    }
}

impl NudgeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn display(&self) -> Duration {
        Duration::from_secs(self.display_secs)
    }

    pub fn warning(&self) -> Duration {
        Duration::from_secs(self.warning_secs)
    }
}

/// Reply generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Backend: "sentiment" (remote classifier) or "offline" (canned replies).
    pub provider: String,
    /// Classifier endpoint for the sentiment backend.
    pub endpoint: String,
    /// Environment variable holding the bearer token.
    pub token_env: String,
    /// Transport timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: "sentiment".to_string(),
            endpoint: "https://api-inference.huggingface.co/models/distilbert/distilbert-base-uncased-finetuned-sst-2-english".to_string(),
            token_env: "HUGGING_FACE_ACCESS_TOKEN".to_string(),
            timeout_secs: 20,
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file name inside the data directory.
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "hacxorz.db".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = HacxorzConfig::default();
        assert_eq!(config.general.data_dir, "~/.hacxorz/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.chat.page_size, 20);
        assert_eq!(config.chat.default_title, "New Chat");
        assert_eq!(config.chat.search_quiet(), Duration::from_millis(300));
        assert_eq!(config.nudges.interval(), Duration::from_secs(30));
        assert_eq!(config.nudges.display(), Duration::from_secs(8));
        assert_eq!(config.nudges.warning(), Duration::from_secs(10));
        assert_eq!(config.nudges.low_confidence_threshold, 60.0);
        assert_eq!(config.nudges.messages.len(), 4);
        assert_eq!(config.inference.provider, "sentiment");
        assert_eq!(config.storage.database_file, "hacxorz.db");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/custom/data"
log_level = "debug"
owner = "alice"

[chat]
page_size = 50
default_title = "Untitled"

[nudges]
enabled = false
low_confidence_threshold = 70.0
"#;
        let file = create_temp_config(content);
        let config = HacxorzConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.general.owner, "alice");
        assert_eq!(config.chat.page_size, 50);
        assert_eq!(config.chat.default_title, "Untitled");
        // Unspecified keys keep their defaults.
        assert_eq!(config.chat.search_quiet_ms, 300);
        assert!(!config.nudges.enabled);
        assert_eq!(config.nudges.low_confidence_threshold, 70.0);
        assert_eq!(config.nudges.interval_secs, 30);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let file = create_temp_config("");
        let config = HacxorzConfig::load(file.path()).unwrap();
        assert_eq!(config.chat.page_size, 20);
    }

    #[test]
    fn test_load_rejects_zero_page_size() {
        let file = create_temp_config("[chat]\npage_size = 0\n");
        let err = HacxorzConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, HacxorzError::Config(_)));
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = HacxorzConfig::default();
        config.nudges.low_confidence_threshold = 120.0;
        assert!(config.validate().is_err());
        config.nudges.low_confidence_threshold = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_durations() {
        let mut config = HacxorzConfig::default();
        config.nudges.warning_secs = 0;
        assert!(config.validate().is_err());

        let mut config = HacxorzConfig::default();
        config.chat.search_quiet_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = HacxorzConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.chat.page_size, 20);
    }

    #[test]
    fn test_load_or_default_invalid_toml() {
        let file = create_temp_config("[chat\npage_size = ");
        let config = HacxorzConfig::load_or_default(file.path());
        assert_eq!(config.chat.page_size, 20);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = HacxorzConfig::default();
        config.chat.page_size = 7;
        config.nudges.confidence_warnings = false;
        config.save(&path).unwrap();

        let loaded = HacxorzConfig::load(&path).unwrap();
        assert_eq!(loaded.chat.page_size, 7);
        assert!(!loaded.nudges.confidence_warnings);
        assert_eq!(loaded.nudges.messages, config.nudges.messages);
    }
}
