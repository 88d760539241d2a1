use super::models::{ChatMessage, ContentPart, ImageUrl};
use super::request::ImagePayload;

/// Instruction sent with every image. The schema here is the one
/// `shared::DiagnosticReport` models.
pub const ANALYSIS_PROMPT: &str = r#"Analyse this medical image in detail. Reply in Simplified Chinese with a single JSON object using exactly this structure:
{
  "imageType": "imaging modality, e.g. CT, MRI, X-ray",
  "bodyPart": "body part examined",
  "findings": {
    "normalStructures": ["visible normal structures"],
    "abnormalFindings": ["abnormal findings"]
  },
  "possibleDiagnosis": [
    { "diagnosis": "diagnosis 1", "confidence": "confidence percentage, e.g. 85%" },
    { "diagnosis": "diagnosis 2", "confidence": "confidence percentage, e.g. 65%" }
  ],
  "recommendedActions": ["recommended follow-up actions"],
  "severity": "one of 低 / 中 / 高",
  "confidence": {
    "overall": "overall diagnostic confidence, one of 低 / 中 / 高",
    "percentage": "overall confidence percentage, e.g. 75%",
    "factors": ["factors affecting confidence, e.g. image quality, how distinct the features are"]
  },
  "summary": "a short summary"
}
Give a confidence percentage for every diagnosis and an overall assessment in the confidence field. Return valid JSON only: no markdown fences, no explanations, nothing outside the object."#;

/// The single user turn: prompt first, then the image as a data URL.
pub fn user_message(image: &ImagePayload) -> ChatMessage {
    ChatMessage {
        role: "user",
        content: vec![
            ContentPart::Text {
                text: ANALYSIS_PROMPT.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_report_field() {
        for key in [
            "imageType",
            "bodyPart",
            "normalStructures",
            "abnormalFindings",
            "possibleDiagnosis",
            "recommendedActions",
            "severity",
            "confidence",
            "percentage",
            "factors",
            "summary",
        ] {
            assert!(ANALYSIS_PROMPT.contains(key), "prompt is missing {}", key);
        }
    }

    #[test]
    fn message_puts_prompt_before_image() {
        let image = ImagePayload::parse("/9j/4AAQSkZJRg==").unwrap();
        let message = user_message(&image);
        assert_eq!(message.role, "user");
        match &message.content[..] {
            [ContentPart::Text { text }, ContentPart::ImageUrl { image_url }] => {
                assert_eq!(text, ANALYSIS_PROMPT);
                assert_eq!(image_url.url, "data:image/jpeg;base64,/9j/4AAQSkZJRg==");
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }
}
