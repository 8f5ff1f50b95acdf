use super::sheets::rows_to_csv;
use crate::error::Result;
use crate::secrets::Secrets;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A remote spreadsheet that can be read as a grid of strings.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn first_sheet_values(
        &self,
        spreadsheet_id: &str,
        credentials: &Map<String, Value>,
    ) -> Result<Vec<Vec<String>>>;
}

/// Produces the course table, preferring the remote spreadsheet over the
/// bundled CSV file. Every failure degrades to `None`.
pub struct CourseLoader {
    secrets: Secrets,
    sheets: Option<Box<dyn SheetSource>>,
    local_path: PathBuf,
}

impl CourseLoader {
    pub fn new(secrets: Secrets, local_path: impl Into<PathBuf>) -> Self {
        Self {
            secrets,
            sheets: None,
            local_path: local_path.into(),
        }
    }

    pub fn with_sheets(mut self, sheets: impl SheetSource + 'static) -> Self {
        self.sheets = Some(Box::new(sheets));
        self
    }

    pub async fn load_course_data(&self) -> Option<String> {
        if let Some(data) = self.load_from_sheets().await {
            info!("course data loaded from Google Sheets");
            return Some(data);
        }
        let data = self.load_from_local_file();
        if data.is_some() {
            info!(path = %self.local_path.display(), "course data loaded from bundled file");
        } else {
            info!("no course data available");
        }
        data
    }

    pub async fn load_from_sheets(&self) -> Option<String> {
        let Some(sheets) = self.sheets.as_deref() else {
            debug!("no spreadsheet client configured");
            return None;
        };
        let sheets_id = self.secrets.sheets_id()?;
        let credentials = self.secrets.sheets_credentials()?;

        let rows = match sheets.first_sheet_values(&sheets_id, &credentials).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("failed to read Google Sheets: {e}");
                return None;
            }
        };
        if rows.is_empty() {
            warn!("spreadsheet is empty");
            return None;
        }
        match rows_to_csv(&rows) {
            Ok(csv) => Some(csv),
            Err(e) => {
                warn!("failed to serialize spreadsheet rows: {e}");
                None
            }
        }
    }

    pub fn load_from_local_file(&self) -> Option<String> {
        match std::fs::read_to_string(&self.local_path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.local_path.display(), "failed to read course file: {e}");
                None
            }
        }
    }
}

/// Course table supplied directly by the caller (e.g. an uploaded file).
pub fn courses_from_text(content: &str) -> Option<String> {
    if content.trim().is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}
