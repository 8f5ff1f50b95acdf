// Provider abstraction: the generator only needs a model directory, a way to
// bind a model name, and single-prompt text generation.

pub mod gemini;
pub mod select;

use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::warn;

pub use gemini::{GeminiClient, GeminiConnector};

/// A model name that has been checked to be usable as a resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    name: String,
}

impl ModelHandle {
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        let name = name.strip_prefix("models/").unwrap_or(name);
        if name.is_empty() {
            return Err(Error::config("model name is empty"));
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | ':'))
        {
            return Err(Error::config(format!("invalid model name: {name:?}")));
        }
        Ok(Self { name: name.into() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Models that currently support text generation, without `models/`.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Bind a client to `name`. Fails when the name cannot address a model.
    fn model(&self, name: &str) -> Result<ModelHandle> {
        ModelHandle::new(name)
    }

    async fn generate(&self, model: &ModelHandle, prompt: &str) -> Result<String>;
}

/// Authenticates with an API key and yields a provider session.
pub trait Connector: Send + Sync {
    type Provider: ModelProvider;

    fn connect(&self, api_key: &str) -> Result<Self::Provider>;
}

/// Directory listing that degrades to an empty list on any failure.
pub async fn list_available_models<P: ModelProvider + ?Sized>(provider: &P) -> Vec<String> {
    match provider.list_models().await {
        Ok(models) => models,
        Err(e) => {
            warn!("model directory unavailable: {e}");
            Vec::new()
        }
    }
}
