//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration for nyaya
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// LLM provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// History synchronization configuration
    #[serde(default)]
    pub history: HistoryConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote store (PostgREST-style backend) configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Base URL of the backend, e.g. https://xyz.supabase.co
    #[serde(default)]
    pub url: String,
    /// API key sent as `apikey` and bearer token
    #[serde(default)]
    pub api_key: String,
    /// Authenticated subject whose sessions are synchronized
    #[serde(default)]
    pub user_id: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider API key
    #[serde(default)]
    pub api_key: String,
    /// Override for the API base URL (testing, proxies)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Default model
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens generated per answer
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// System instruction sent with every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f64 {
    0.09
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_system_prompt() -> String {
    [
        "You are an AI legal assistant for Indian law. Answer clearly and cite the \
         relevant acts and sections.",
        "When your answer includes statutory references, list them between \
         ###REFERENCES### and ###ENDREFERENCES###, one per line as 'Section: description'.",
        "When concrete next actions exist, list them between ###STEPS### and \
         ###ENDSTEPS###, one per line as '1. **Title:** description'.",
        "When official helplines apply, list them between ###CONTACTS### and \
         ###ENDCONTACTS###, one per line as 'Department - Phone: number' (or Email: / \
         Website:).",
        "Remind users that this is general information, not a substitute for a lawyer.",
    ]
    .join("\n")
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// History synchronization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Directory for the local vault (archive, pending queue, markers)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Attempts per remote write before a message is queued as failed
    #[serde(default = "default_max_save_attempts")]
    pub max_save_attempts: u32,
    /// Base backoff in seconds; attempt n waits n * base
    #[serde(default = "default_retry_base_secs")]
    pub retry_base_secs: u64,
    /// Period of the background retry timer in seconds
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

fn default_data_dir() -> String {
    "~/.nyaya/history".to_string()
}

fn default_max_save_attempts() -> u32 {
    3
}

fn default_retry_base_secs() -> u64 {
    1
}

fn default_retry_interval_secs() -> u64 {
    30
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_save_attempts: default_max_save_attempts(),
            retry_base_secs: default_retry_base_secs(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

impl HistoryConfig {
    /// Vault directory with `~` expanded
    pub fn data_path(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.nyaya/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Log directory with `~` expanded
    pub fn log_path(&self) -> PathBuf {
        expand_home(&self.dir)
    }
}

/// Expand a leading `~/` against the user's home directory
pub fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.provider.model, "gemini-2.5-flash");
        assert!((config.provider.temperature - 0.09).abs() < f64::EPSILON);
        assert_eq!(config.provider.max_output_tokens, 2048);
        assert_eq!(config.history.max_save_attempts, 3);
        assert_eq!(config.history.retry_interval_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_parses_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"store":{"url":"https://db.example.com"}}"#).unwrap();
        assert_eq!(config.store.url, "https://db.example.com");
        assert_eq!(config.provider.model, "gemini-2.5-flash");
        assert_eq!(config.history.retry_base_secs, 1);
    }

    #[test]
    fn test_expand_home_passes_absolute_paths_through() {
        assert_eq!(expand_home("/var/data"), PathBuf::from("/var/data"));
    }
}
