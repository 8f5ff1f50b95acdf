use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("GEMINI_API_KEY is not set. Add it to the secrets file or export it")]
    MissingCredential,

    #[error("No usable model could be initialised.{}{}", list_suffix(.available), detail_suffix(.last_error))]
    ModelUnavailable {
        available: Vec<String>,
        last_error: Option<String>,
    },

    #[error("Model call failed: {message}{}", list_suffix(.available))]
    GenerationFailed {
        message: String,
        available: Vec<String>,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({platform}): {message}")]
    Api {
        platform: String,
        message: String,
        status_code: Option<u16>,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Rate limited by {platform}")]
    RateLimit {
        platform: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Template error: {0}")]
    Template(String),
}

fn list_suffix(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(" Available models: {}", available.join(", "))
    }
}

fn detail_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_deref()
        .map(|e| format!(" Details: {e}"))
        .unwrap_or_default()
}

impl Error {
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn api(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            platform: platform.into(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn api_with_status(
        platform: impl Into<String>,
        message: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::Api {
            platform: platform.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// True when the provider signals that the requested model does not exist
    /// or is not accessible with this key.
    pub fn is_model_not_found(&self) -> bool {
        if let Self::Api {
            status_code: Some(404),
            ..
        } = self
        {
            return true;
        }
        let text = self.to_string().to_lowercase();
        text.contains("404") || text.contains("not found")
    }
}

impl From<askama::Error> for Error {
    fn from(e: askama::Error) -> Self {
        Self::Template(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
