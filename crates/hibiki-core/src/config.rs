use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::HibikiError;

/// Top-level Hibiki configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub hibiki: GeneralConfig,
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// YouTube Data API config.
///
/// `api_key` covers read calls (search, video lookup, chat pages);
/// posting chat messages additionally needs an OAuth `access_token`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct YouTubeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub access_token: String,
    /// Channel whose live broadcast is auto-detected when no explicit
    /// video is given. Also treated as the bot's own author identity:
    /// when only `video_id` is set, self-reply suppression is off.
    #[serde(default)]
    pub channel_id: String,
    /// Explicit video id or watch URL. Overrides live auto-detection.
    #[serde(default)]
    pub video_id: String,
}

/// Gemini generator config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
        }
    }
}

/// Persona catalog selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_path")]
    pub path: String,
    /// Persona name to speak as. Empty = first persona in the catalog.
    #[serde(default)]
    pub persona: String,
    /// Character name within the persona. Empty = first character.
    #[serde(default)]
    pub character: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            path: default_persona_path(),
            persona: String::new(),
            character: String::new(),
        }
    }
}

/// Watch-loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Whether to auto-reply to viewer messages.
    #[serde(default = "default_true")]
    pub auto_reply: bool,
    /// Whether start/stop sends the configured greetings.
    #[serde(default = "default_true")]
    pub auto_greet: bool,
    /// Minimum time between two auto-replies to the same author.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Hard cap on reply length, in characters.
    #[serde(default = "default_reply_max_chars")]
    pub reply_max_chars: usize,
    /// Floor applied to the transport-recommended poll interval.
    #[serde(default = "default_min_poll_interval_ms")]
    pub min_poll_interval_ms: u64,
    /// Poll interval assumed when the transport does not recommend one.
    #[serde(default = "default_poll_interval_ms")]
    pub default_poll_interval_ms: u64,
    /// Sleep between resolution attempts while no broadcast is live.
    #[serde(default = "default_idle_backoff_secs")]
    pub idle_backoff_secs: u64,
    /// Sleep after a failed poll cycle before resuming.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
    /// Hard timeout on one generation call.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// How long `stop()` waits for the loop to observe cancellation.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
    /// Display log retention bound (records).
    #[serde(default = "default_log_retention")]
    pub log_retention: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            auto_reply: true,
            auto_greet: true,
            cooldown_secs: default_cooldown_secs(),
            reply_max_chars: default_reply_max_chars(),
            min_poll_interval_ms: default_min_poll_interval_ms(),
            default_poll_interval_ms: default_poll_interval_ms(),
            idle_backoff_secs: default_idle_backoff_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            generation_timeout_secs: default_generation_timeout_secs(),
            stop_timeout_secs: default_stop_timeout_secs(),
            log_retention: default_log_retention(),
        }
    }
}

// --- Default value functions ---

fn default_name() -> String {
    "Hibiki".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_persona_path() -> String {
    "personas.json".to_string()
}
fn default_true() -> bool {
    true
}
fn default_cooldown_secs() -> u64 {
    15
}
fn default_reply_max_chars() -> usize {
    50
}
fn default_min_poll_interval_ms() -> u64 {
    1000
}
fn default_poll_interval_ms() -> u64 {
    3000
}
fn default_idle_backoff_secs() -> u64 {
    20
}
fn default_error_backoff_secs() -> u64 {
    5
}
fn default_generation_timeout_secs() -> u64 {
    15
}
fn default_stop_timeout_secs() -> u64 {
    3
}
fn default_log_retention() -> usize {
    500
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, HibikiError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| HibikiError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| HibikiError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
