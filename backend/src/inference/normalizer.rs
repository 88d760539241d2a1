//! Turns the model's free-text reply into an [`AnalysisResult`].
//!
//! The model is told to answer with bare JSON but often wraps it in prose or
//! a markdown fence. The span from the first `{` to the last `}` is taken as
//! the JSON candidate. This is a heuristic: braces in the surrounding prose
//! or several JSON fragments give a wrong span, and the reply then comes back
//! as the raw-text fallback. Numbers outside the `f64` range (`1e400`) and
//! unpaired surrogate escapes (`"\ud800"`) are rejected by `serde_json`, so
//! replies containing them also fall back.
//!
//! A repeated key keeps its last value.

use serde_json::Value;
use shared::{AnalysisResult, DiagnosticReport};

/// First `{` through last `}`, inclusive.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Never fails: anything that does not yield a report becomes
/// `AnalysisResult::Raw` carrying the unmodified reply.
pub fn normalize(raw: &str) -> AnalysisResult {
    let Some(candidate) = extract_json_span(raw) else {
        return AnalysisResult::raw(raw);
    };

    // Going through `Value` first lets a repeated schema key resolve to its
    // last occurrence; the derived impl would reject it as a duplicate field.
    let report = serde_json::from_str::<Value>(candidate)
        .and_then(serde_json::from_value::<DiagnosticReport>);
    match report {
        Ok(report) => AnalysisResult::Report(report),
        Err(e) => {
            log::debug!("JSON candidate did not parse: {}", e);
            AnalysisResult::raw(raw)
        }
    }
}
