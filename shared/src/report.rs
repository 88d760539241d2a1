use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};

/// Structured diagnostic report as requested from the vision model.
///
/// Every field is optional. A field whose JSON type does not match is
/// dropped instead of failing the whole report, and keys outside the
/// schema are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub body_part: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub findings: Option<Findings>,
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub possible_diagnosis: Vec<Diagnosis>,
    #[serde(default, deserialize_with = "lenient_text_list", skip_serializing_if = "Vec::is_empty")]
    pub recommended_actions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceAssessment>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Findings {
    #[serde(default, deserialize_with = "lenient_text_list")]
    pub normal_structures: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text_list")]
    pub abnormal_findings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DiagnosisRepr")]
pub struct Diagnosis {
    pub diagnosis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

// Older prompts asked for plain strings, newer ones for objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum DiagnosisRepr {
    Plain(String),
    Detailed {
        diagnosis: String,
        #[serde(default, deserialize_with = "lenient_text")]
        confidence: Option<String>,
    },
}

impl From<DiagnosisRepr> for Diagnosis {
    fn from(repr: DiagnosisRepr) -> Self {
        match repr {
            DiagnosisRepr::Plain(diagnosis) => Diagnosis {
                diagnosis,
                confidence: None,
            },
            DiagnosisRepr::Detailed {
                diagnosis,
                confidence,
            } => Diagnosis {
                diagnosis,
                confidence,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfidenceRepr")]
pub struct ConfidenceAssessment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub factors: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfidenceRepr {
    Summary(String),
    Score(serde_json::Number),
    Detailed {
        #[serde(default, deserialize_with = "lenient_text")]
        overall: Option<String>,
        #[serde(default, deserialize_with = "lenient_text")]
        percentage: Option<String>,
        #[serde(default, deserialize_with = "lenient_text_list")]
        factors: Vec<String>,
    },
}

impl From<ConfidenceRepr> for ConfidenceAssessment {
    fn from(repr: ConfidenceRepr) -> Self {
        match repr {
            ConfidenceRepr::Summary(overall) => ConfidenceAssessment {
                overall: Some(overall),
                ..Default::default()
            },
            ConfidenceRepr::Score(score) => ConfidenceAssessment {
                percentage: Some(score.to_string()),
                ..Default::default()
            },
            ConfidenceRepr::Detailed {
                overall,
                percentage,
                factors,
            } => ConfidenceAssessment {
                overall,
                percentage,
                factors,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    #[strum(to_string = "低", serialize = "low")]
    Low,
    #[strum(to_string = "中", serialize = "medium", serialize = "moderate")]
    Medium,
    #[strum(to_string = "高", serialize = "high")]
    High,
}

impl DiagnosticReport {
    /// Severity mapped onto the three levels the prompt asks for, if the
    /// model stuck to them.
    pub fn severity_level(&self) -> Option<Severity> {
        self.severity.as_deref().and_then(|s| s.trim().parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        *self == DiagnosticReport::default()
    }
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// A list of scalars in a text field is joined rather than dropped.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => {
            let parts = items
                .into_iter()
                .map(text_of)
                .collect::<Option<Vec<_>>>()
                .filter(|parts| !parts.is_empty());
            Ok(parts.map(|parts| parts.join(", ")))
        }
        value => Ok(text_of(value)),
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        single => vec![single],
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        single => vec![single],
    };
    Ok(items.into_iter().filter_map(text_of).collect())
}
