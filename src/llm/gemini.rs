use super::{Connector, ModelHandle, ModelProvider};
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("concierge/", env!("CARGO_PKG_VERSION"));
const GENERATE_METHOD: &str = "generateContent";
const MAX_DIRECTORY_PAGES: usize = 10;

/// Builds [`GeminiClient`] sessions from an API key.
#[derive(Debug, Clone)]
pub struct GeminiConnector {
    base_url: String,
    timeout: Duration,
}

impl GeminiConnector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

impl Connector for GeminiConnector {
    type Provider = GeminiClient;

    fn connect(&self, api_key: &str) -> Result<GeminiClient> {
        GeminiClient::new(api_key.into(), self.base_url.clone(), self.timeout)
    }
}

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http: HttpClient,
}

// -- Directory --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

// -- generateContent --

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(USER_AGENT, timeout)?;
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn list_page(&self, page_token: Option<&str>) -> Result<ListModelsResponse> {
        let mut url = Url::parse(&format!("{}/models", self.base_url))
            .map_err(|e| Error::config(format!("invalid Gemini base url: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", "1000");
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        self.http
            .get_json_with_headers(url.as_str(), &[("x-goog-api-key", &self.api_key)])
            .await
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    async fn list_models(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_DIRECTORY_PAGES {
            let page = self.list_page(page_token.as_deref()).await?;
            names.extend(generation_models(page.models));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = names.len(), "fetched model directory");
        Ok(names)
    }

    async fn generate(&self, model: &ModelHandle, prompt: &str) -> Result<String> {
        debug!(model = %model.name(), prompt_chars = prompt.chars().count(), "sending Gemini request");

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| Error::parse(format!("serialize request: {e}")))?;

        let url = format!("{}/models/{}:{GENERATE_METHOD}", self.base_url, model.name());
        let response_text = self
            .http
            .post_json_raw(&url, &body, &[("x-goog-api-key", &self.api_key)])
            .await
            .map_err(|e| {
                warn!(model = %model.name(), "Gemini API error: {e}");
                e
            })?;

        let resp: GenerateResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::parse(format!("parse Gemini response: {e}")))?;
        extract_text(resp)
    }
}

fn generation_models(models: Vec<ModelInfo>) -> impl Iterator<Item = String> {
    models
        .into_iter()
        .filter(|m| m.supported_generation_methods.iter().any(|g| g == GENERATE_METHOD))
        .map(|m| match m.name.strip_prefix("models/") {
            Some(short) => short.to_string(),
            None => m.name,
        })
}

fn extract_text(resp: GenerateResponse) -> Result<String> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::api("gemini", format!("prompt blocked: {reason}")));
    }
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::parse("empty response from Gemini"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        return Err(Error::api(
            "gemini",
            format!("no text in response (finish reason: {reason})"),
        ));
    }
    Ok(text)
}
