//! Gemini `generateContent` payload types.

use crate::payload::ImagePayload;
use serde::{Deserialize, Serialize};

pub const ANALYSIS_PROMPT: &str = r#"Analyze this food image and provide detailed nutritional information. Please identify the food and estimate the nutritional content for a typical serving.

Return your response in this exact JSON format:
{
  "foodName": "Name of the identified food",
  "nutrition": {
    "servingSize": "description with weight",
    "servingsPerContainer": "1",
    "calories": number,
    "totalFat": number (grams),
    "saturatedFat": number (grams),
    "transFat": number (grams),
    "cholesterol": number (mg),
    "sodium": number (mg),
    "totalCarbohydrate": number (grams),
    "dietaryFiber": number (grams),
    "totalSugars": number (grams),
    "addedSugars": number (grams),
    "protein": number (grams),
    "vitaminD": number (mcg),
    "calcium": number (mg),
    "iron": number (mg),
    "potassium": number (mg)
  }
}

Please provide realistic estimates based on standard nutritional databases. If you're unsure about the exact food, provide your best estimate and mention it in the food name."#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Variant order matters for untagged decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl From<&ImagePayload> for InlineData {
    fn from(image: &ImagePayload) -> Self {
        InlineData {
            mime_type: image.mime_type().to_string(),
            data: image.to_base64(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// A single user turn: the instruction followed by one inline image.
    pub fn with_image(prompt: &str, image: InlineData) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData { inline_data: image },
                ],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if it has any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let image = ImagePayload::new(b"abc".to_vec(), "image/jpeg");
        let request = GenerateContentRequest::with_image("describe", InlineData::from(&image));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "describe" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "YWJj" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Here: " }, { "text": "{}" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Here: {}"));
    }

    #[test]
    fn test_response_without_text() {
        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert_eq!(blocked.text(), None);

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn test_prompt_names_every_field() {
        for field in ["foodName", "servingSize", "servingsPerContainer", "vitaminD", "potassium"] {
            assert!(ANALYSIS_PROMPT.contains(field), "prompt is missing {field}");
        }
    }
}
