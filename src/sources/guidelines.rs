use std::path::PathBuf;
use tracing::warn;

/// Chooses the guideline document: caller-supplied text, else the bundled file.
#[derive(Debug, Clone)]
pub struct GuidelineResolver {
    default_path: PathBuf,
}

impl GuidelineResolver {
    pub fn new(default_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
        }
    }

    pub fn resolve(&self, override_text: Option<&str>) -> Option<String> {
        guidelines_from_text(override_text).or_else(|| self.load_default())
    }

    pub fn load_default(&self) -> Option<String> {
        match std::fs::read_to_string(&self.default_path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.default_path.display(), "failed to read guidelines: {e}");
                None
            }
        }
    }
}

/// Trimmed override text, or `None` when it is missing or blank.
pub fn guidelines_from_text(content: Option<&str>) -> Option<String> {
    content
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
