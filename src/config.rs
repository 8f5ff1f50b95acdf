use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
}

/// Gemini endpoint and model preference.
#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Tried in order: fast tier, capable tier, legacy default.
    #[serde(default = "default_preferred_models")]
    pub preferred_models: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            preferred_models: default_preferred_models(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_courses_path")]
    pub courses_path: PathBuf,
    #[serde(default = "default_guidelines_path")]
    pub guidelines_path: PathBuf,
    #[serde(default = "default_secrets_path")]
    pub secrets_path: PathBuf,
    /// Upper bound, in chars, for each of the course table and guideline
    /// text when embedded in a prompt.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            courses_path: default_courses_path(),
            guidelines_path: default_guidelines_path(),
            secrets_path: default_secrets_path(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SheetsConfig {
    #[serde(default = "default_sheets_api_base_url")]
    pub api_base_url: String,
    /// Used when the service-account key carries no `token_uri`.
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_sheets_api_base_url(),
            token_url: default_token_url(),
        }
    }
}

// Defaults
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_preferred_models() -> Vec<String> {
    vec![
        "gemini-2.5-flash".into(),
        "gemini-2.5-pro".into(),
        "gemini-1.5-flash".into(),
    ]
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_courses_path() -> PathBuf {
    PathBuf::from("data/courses.csv")
}
fn default_guidelines_path() -> PathBuf {
    PathBuf::from("data/guidelines.md")
}
fn default_secrets_path() -> PathBuf {
    PathBuf::from(".concierge/secrets.toml")
}
fn default_max_context_chars() -> usize {
    100_000
}
fn default_sheets_api_base_url() -> String {
    "https://sheets.googleapis.com/v4".into()
}
fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".into()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.preferred_models.is_empty() {
            return Err(Error::config("llm.preferred_models must name at least one model"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config("llm.timeout_secs must be greater than zero"));
        }
        if self.data.max_context_chars == 0 {
            return Err(Error::config(
                "data.max_context_chars must be greater than zero",
            ));
        }
        Ok(())
    }
}
