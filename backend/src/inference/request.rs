use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::client::AnalysisError;

const MISSING_IMAGE: &str = "no image data provided; send the image as base64 in imageBase64";

/// One inbound analysis request, as received from the browser.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image_base64: String,
    /// Accepted and echoed back; object detection is not implemented.
    pub use_yolo: bool,
}

impl AnalysisRequest {
    pub fn new(image_base64: impl Into<String>, use_yolo: bool) -> Self {
        Self {
            image_base64: image_base64.into(),
            use_yolo,
        }
    }

    /// Validates a `{ imageBase64, useYolo? }` body.
    pub fn from_json(body: &Value) -> Result<Self, AnalysisError> {
        let image_base64 = match body.get("imageBase64") {
            None | Some(Value::Null) => {
                return Err(AnalysisError::InvalidInput(MISSING_IMAGE.into()));
            }
            Some(Value::String(s)) if s.is_empty() => {
                return Err(AnalysisError::InvalidInput(MISSING_IMAGE.into()));
            }
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(AnalysisError::InvalidInput(
                    "imageBase64 must be a string".into(),
                ));
            }
        };
        let use_yolo = body
            .get("useYolo")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Self::new(image_base64, use_yolo))
    }
}

/// Base64 image data that is known to decode.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    base64: String,
    mime_type: &'static str,
    byte_len: usize,
    digest: String,
}

impl ImagePayload {
    /// Accepts bare base64 or a full `data:<mime>;base64,` URL. Whitespace
    /// (line-wrapped base64) is ignored.
    pub fn parse(text: &str) -> Result<Self, AnalysisError> {
        let base64: String = strip_data_url(text.trim())
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if base64.is_empty() {
            return Err(AnalysisError::InvalidInput(MISSING_IMAGE.into()));
        }

        let bytes = STANDARD.decode(&base64).map_err(|e| {
            AnalysisError::InvalidInput(format!("image data is not valid base64: {}", e))
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);

        Ok(Self {
            mime_type: sniff_mime_type(&bytes),
            byte_len: bytes.len(),
            digest: hex::encode(hasher.finalize()),
            base64,
        })
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Hex SHA-256 of the decoded bytes.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn short_digest(&self) -> &str {
        &self.digest()[..12]
    }
}

fn strip_data_url(text: &str) -> &str {
    const MARKER: &str = ";base64,";
    if text.starts_with("data:") {
        if let Some(idx) = text.find(MARKER) {
            return &text[idx + MARKER.len()..];
        }
    }
    text
}

// Anything unrecognised goes out as JPEG, which the vision APIs accept for
// most formats anyway.
fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
