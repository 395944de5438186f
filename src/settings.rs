//! Application settings storage
//!
//! Stores configuration like the API key in a JSON file in the app data directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

/// Global settings instance
static SETTINGS: RwLock<Option<Settings>> = RwLock::new(None);

/// Path to config file (set during init)
static CONFIG_PATH: RwLock<Option<PathBuf>> = RwLock::new(None);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    /// Model used for summarization, Q&A and quiz generation
    #[serde(default = "default_model")]
    pub llm_model: String,
    /// Timeout for generative service calls; a timeout counts as
    /// "service unavailable" and triggers the rule-based fallback
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Difficulty tier assumed when the caller does not pick one
    #[serde(default = "default_tier")]
    pub default_difficulty: String,
    /// Lenient short-answer grading: any answer token appearing as a
    /// substring of the correct answer counts as correct
    #[serde(default = "default_true")]
    pub lenient_grading: bool,
    #[serde(default)]
    pub custom_db_path: Option<String>,
}

fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_tier() -> String {
    "teen".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            llm_model: default_model(),
            request_timeout_secs: 30,
            default_difficulty: "teen".to_string(),
            lenient_grading: true,
            custom_db_path: None,
        }
    }
}

impl Settings {
    /// Load settings from disk or create default
    fn load(path: &PathBuf) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                Err(_) => Settings::default(),
            }
        } else {
            Settings::default()
        }
    }

    /// Save settings to disk
    fn save(&self, path: &PathBuf) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, content)
            .map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }
}

/// Platform app-data directory used when the caller does not supply one
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studypal")
}

/// Initialize settings with the app data directory
pub fn init(app_data_dir: PathBuf) {
    let config_path = app_data_dir.join("settings.json");
    let settings = Settings::load(&config_path);

    *CONFIG_PATH.write().unwrap() = Some(config_path);
    *SETTINGS.write().unwrap() = Some(settings);
}

/// Get the current API key (checks env var first, then stored setting)
pub fn get_api_key() -> Option<String> {
    // Environment variable takes precedence
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        if !key.is_empty() {
            return Some(key);
        }
    }

    let guard = SETTINGS.read().ok()?;
    let settings = guard.as_ref()?;
    settings.anthropic_api_key.clone()
}

/// Check if API key is available
pub fn has_api_key() -> bool {
    get_api_key().map(|k| !k.is_empty()).unwrap_or(false)
}

/// Set and save the API key
pub fn set_api_key(key: String) -> Result<(), String> {
    let mut settings_guard = SETTINGS.write()
        .map_err(|_| "Failed to acquire settings lock")?;

    let settings = settings_guard.get_or_insert_with(Settings::default);
    settings.anthropic_api_key = if key.is_empty() { None } else { Some(key) };

    let config_path = CONFIG_PATH.read()
        .map_err(|_| "Failed to acquire config path lock")?
        .clone()
        .ok_or("Settings not initialized")?;

    settings.save(&config_path)?;

    println!("API key saved to settings");
    Ok(())
}

/// Get masked API key for display (shows first/last 4 chars)
pub fn get_masked_api_key() -> Option<String> {
    get_api_key().map(|key| {
        if key.len() > 12 {
            format!("{}...{}", &key[..8], &key[key.len() - 4..])
        } else {
            "*".repeat(key.len())
        }
    })
}

/// Model name for generative calls
pub fn llm_model() -> String {
    SETTINGS
        .read()
        .ok()
        .and_then(|g| g.as_ref().map(|s| s.llm_model.clone()))
        .unwrap_or_else(default_model)
}

/// Timeout applied to every generative service request
pub fn request_timeout_secs() -> u64 {
    SETTINGS
        .read()
        .ok()
        .and_then(|g| g.as_ref().map(|s| s.request_timeout_secs))
        .unwrap_or(30)
}

/// Whether short-answer grading accepts any shared answer token
pub fn lenient_grading() -> bool {
    SETTINGS
        .read()
        .ok()
        .and_then(|g| g.as_ref().map(|s| s.lenient_grading))
        .unwrap_or(true)
}

/// Preferred difficulty tier for new users
pub fn default_difficulty() -> String {
    SETTINGS
        .read()
        .ok()
        .and_then(|g| g.as_ref().map(|s| s.default_difficulty.clone()))
        .unwrap_or_else(default_tier)
}

/// Resolve the database path: custom setting, else app data dir
pub fn db_path(app_data_dir: &PathBuf) -> PathBuf {
    let custom = SETTINGS
        .read()
        .ok()
        .and_then(|g| g.as_ref().and_then(|s| s.custom_db_path.clone()));

    match custom {
        Some(p) => PathBuf::from(p),
        None => app_data_dir.join("studypal.db"),
    }
}
