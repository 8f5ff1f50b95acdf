//! Secret resolution: a TOML secrets file first, process environment second.
//!
//! Every lookup is a pure read of the two snapshots held by [`Secrets`]; a
//! missing or malformed value resolves to `None` rather than an error.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

pub const API_KEY: &str = "GEMINI_API_KEY";
pub const SHEETS_ID: &str = "GOOGLE_SHEETS_ID";
pub const SHEETS_CREDENTIALS: &str = "GOOGLE_SHEETS_CREDENTIALS";
pub const SHEETS_CREDENTIALS_PATH: &str = "GOOGLE_SHEETS_CREDENTIALS_PATH";

/// Structured secrets store backed by a TOML file.
#[derive(Debug, Clone, Default)]
pub struct SecretsStore {
    table: toml::Table,
}

impl SecretsStore {
    /// Read the store at `path`. A missing file is an empty store; an
    /// unreadable or malformed one is logged and also treated as empty.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), "failed to read secrets file: {e}");
                return Self::default();
            }
        };
        match Self::from_toml_str(&content) {
            Ok(store) => store,
            Err(e) => {
                warn!(path = %path.display(), "ignoring malformed secrets file: {e}");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        Ok(Self {
            table: content.parse()?,
        })
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.table.get(key)
    }
}

/// Snapshot of environment variables.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Secrets {
    store: SecretsStore,
    env: Environment,
}

impl Secrets {
    pub fn new(store: SecretsStore, env: Environment) -> Self {
        Self { store, env }
    }

    /// Secrets file at `path` plus the current process environment.
    pub fn from_sources(path: &Path) -> Self {
        Self::new(SecretsStore::load(path), Environment::from_process())
    }

    pub fn api_key(&self) -> Option<String> {
        self.lookup(API_KEY)
    }

    pub fn sheets_id(&self) -> Option<String> {
        self.lookup(SHEETS_ID)
    }

    /// Service-account credentials as a JSON object.
    ///
    /// Sources, first usable wins: a JSON string in the store, a table in the
    /// store, a JSON string in the environment, then a JSON file named by
    /// `GOOGLE_SHEETS_CREDENTIALS_PATH`.
    pub fn sheets_credentials(&self) -> Option<Map<String, Value>> {
        if let Some(creds) = self
            .store
            .get(SHEETS_CREDENTIALS)
            .and_then(credentials_from_toml)
        {
            debug!("sheets credentials resolved from secrets store");
            return Some(creds);
        }
        if let Some(creds) = self
            .env
            .get(SHEETS_CREDENTIALS)
            .and_then(credentials_from_json)
        {
            debug!("sheets credentials resolved from environment");
            return Some(creds);
        }
        let path = self.lookup(SHEETS_CREDENTIALS_PATH)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path, "failed to read credentials file: {e}");
                return None;
            }
        };
        let creds = credentials_from_json(&content);
        if creds.is_none() {
            warn!(path = %path, "credentials file does not hold a JSON object");
        }
        creds
    }

    /// Non-empty string from the store, else from the environment.
    fn lookup(&self, key: &str) -> Option<String> {
        let from_store = self
            .store
            .get(key)
            .and_then(toml::Value::as_str)
            .filter(|v| !v.trim().is_empty());
        from_store
            .or_else(|| self.env.get(key).filter(|v| !v.trim().is_empty()))
            .map(str::to_string)
    }
}

fn credentials_from_toml(value: &toml::Value) -> Option<Map<String, Value>> {
    match value {
        toml::Value::String(s) => credentials_from_json(s),
        toml::Value::Table(_) => match serde_json::to_value(value) {
            Ok(Value::Object(map)) if !map.is_empty() => Some(map),
            _ => None,
        },
        _ => None,
    }
}

fn credentials_from_json(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) if !map.is_empty() => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!("credentials are not valid JSON: {e}");
            None
        }
    }
}
