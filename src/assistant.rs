//! Response generation: model selection, prompt assembly, and fallback across
//! alternate models when the selected one has disappeared.
//!
//! The assistant is stateless between calls. Each call re-reads the API key,
//! re-authenticates, and fetches a fresh model directory.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::select::{first_success, preferred_in_directory};
use crate::llm::{Connector, GeminiConnector, ModelHandle, ModelProvider, list_available_models};
use crate::prompt::PromptBuilder;
use crate::secrets::Secrets;
use tracing::{debug, info, warn};

/// Alternatives listed when no model could be bound.
const UNAVAILABLE_LIST_LEN: usize = 10;
/// Alternatives listed when every generation attempt failed.
const FAILED_LIST_LEN: usize = 5;

pub struct Assistant<C: Connector> {
    secrets: Secrets,
    connector: C,
    preferred_models: Vec<String>,
    prompt: PromptBuilder,
}

impl Assistant<GeminiConnector> {
    pub fn from_config(config: &Config, secrets: Secrets) -> Self {
        Self::new(
            secrets,
            GeminiConnector::from_config(&config.llm),
            config.llm.preferred_models.clone(),
            PromptBuilder::new(config.data.max_context_chars),
        )
    }
}

impl<C: Connector> Assistant<C> {
    pub fn new(
        secrets: Secrets,
        connector: C,
        preferred_models: Vec<String>,
        prompt: PromptBuilder,
    ) -> Self {
        Self {
            secrets,
            connector,
            preferred_models,
            prompt,
        }
    }

    /// Answer `question`, drawing on the course table and guidelines when
    /// they are available.
    pub async fn generate_response(
        &self,
        question: &str,
        course_data: Option<&str>,
        guidelines: Option<&str>,
    ) -> Result<String> {
        let provider = self.connect()?;
        let model = self.select_model(&provider).await?;
        let prompt = self.prompt.build(question, course_data, guidelines)?;

        info!(
            model = %model.name(),
            with_courses = course_data.is_some(),
            with_guidelines = guidelines.is_some(),
            "generating response"
        );
        match provider.generate(&model, &prompt).await {
            Ok(text) => Ok(text),
            Err(e) => self.retry_alternates(&provider, &model, &prompt, e).await,
        }
    }

    /// The live model directory. Unlike the internal lookups, errors here
    /// are returned to the caller.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        self.connect()?.list_models().await
    }

    fn connect(&self) -> Result<C::Provider> {
        let api_key = self.secrets.api_key().ok_or(Error::MissingCredential)?;
        self.connector.connect(&api_key)
    }

    async fn select_model(&self, provider: &C::Provider) -> Result<ModelHandle> {
        let directory = list_available_models(provider).await;

        if !directory.is_empty() {
            let listed = preferred_in_directory(&self.preferred_models, &directory);
            if let Ok(handle) = first_success(listed, |name| provider.model(name)) {
                debug!(model = %handle.name(), "selected model from directory");
                return Ok(handle);
            }
            debug!("no preferred model is listed, binding preferred names directly");
        }

        let preferred = self.preferred_models.iter().map(String::as_str);
        match first_success(preferred, |name| provider.model(name)) {
            Ok(handle) => Ok(handle),
            Err(last_error) => Err(Error::ModelUnavailable {
                available: directory.into_iter().take(UNAVAILABLE_LIST_LEN).collect(),
                last_error: last_error.map(|e| e.to_string()),
            }),
        }
    }

    /// After a failed call, walk the refreshed directory once (skipping the
    /// model that failed) if the failure means the model is gone. Counting the
    /// failed call, no more attempts are made than the directory has entries.
    async fn retry_alternates(
        &self,
        provider: &C::Provider,
        failed: &ModelHandle,
        prompt: &str,
        error: Error,
    ) -> Result<String> {
        let mut last_error = error;

        if last_error.is_model_not_found() {
            warn!(model = %failed.name(), "model not found, trying alternates");
            let directory = list_available_models(provider).await;
            let alternates = directory
                .iter()
                .filter(|n| n.as_str() != failed.name())
                .take(directory.len().saturating_sub(1));
            for name in alternates {
                let handle = match provider.model(name) {
                    Ok(h) => h,
                    Err(e) => {
                        last_error = e;
                        continue;
                    }
                };
                match provider.generate(&handle, prompt).await {
                    Ok(text) => {
                        info!(model = %handle.name(), "alternate model succeeded");
                        return Ok(text);
                    }
                    Err(e) => {
                        debug!(model = %handle.name(), "alternate model failed: {e}");
                        last_error = e;
                    }
                }
            }
        }

        let available = list_available_models(provider).await;
        Err(Error::GenerationFailed {
            message: last_error.to_string(),
            available: available.into_iter().take(FAILED_LIST_LEN).collect(),
        })
    }
}
