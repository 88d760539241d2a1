mod report;

use serde::{Deserialize, Serialize};

pub use report::{ConfidenceAssessment, Diagnosis, DiagnosticReport, Findings, Severity};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image_base64: String,
    #[serde(default)]
    pub use_yolo: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub result: AnalysisResult,
    pub raw_content: String,
    pub use_yolo: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Normalized outcome of one completion.
///
/// `Raw` must stay the first variant: a report tolerates any object, so
/// untagged deserialization would otherwise never produce the fallback.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum AnalysisResult {
    Raw {
        #[serde(rename = "rawText")]
        raw_text: String,
    },
    Report(DiagnosticReport),
}

impl AnalysisResult {
    pub fn raw(text: impl Into<String>) -> Self {
        AnalysisResult::Raw {
            raw_text: text.into(),
        }
    }

    pub fn report(&self) -> Option<&DiagnosticReport> {
        match self {
            AnalysisResult::Report(report) => Some(report),
            AnalysisResult::Raw { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AnalysisResult::Raw { .. })
    }
}
