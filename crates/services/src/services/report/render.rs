use serde_json::Value;
use thiserror::Error;

use super::ReportData;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Report rendering failed: {0}")]
    Backend(String),
}

/// Turns normalized report data into an output document. PDF and spreadsheet
/// backends live outside this crate and implement the same trait.
pub trait ReportRenderer: Send + Sync {
    type Output;

    fn content_type(&self) -> &'static str;

    fn render(&self, report: &ReportData) -> Result<Self::Output, RenderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportRenderer;

impl ReportRenderer for JsonReportRenderer {
    type Output = Value;

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, report: &ReportData) -> Result<Value, RenderError> {
        Ok(serde_json::to_value(report)?)
    }
}
