//! Gemini `generateContent` request/response types.

use serde::{Deserialize, Serialize};

use adapt_models::{NormalizedRect, RoiBox, RoiCategory};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A request or response part. Only the fields we use are modelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn jpeg(base64_data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/jpeg".to_string(),
                data: base64_data,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            response_mime_type: "application/json".to_string(),
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// JSON document the model is asked to return.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionsPayload {
    #[serde(default)]
    pub regions: Vec<DetectedRegion>,
}

/// One region as returned by the model, normalized to [0, 1].
#[derive(Debug, Clone, Deserialize)]
pub struct DetectedRegion {
    #[serde(default)]
    pub category: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl DetectedRegion {
    /// Convert to source pixels. Regions outside the unit square are dropped.
    pub fn to_roi(&self, timestamp: f64, frame_width: u32, frame_height: u32) -> Option<RoiBox> {
        let rect = NormalizedRect::new(self.x, self.y, self.width, self.height);
        if !rect.is_valid() {
            return None;
        }
        let category = self.category.parse().unwrap_or(RoiCategory::Generic);
        Some(RoiBox::new(
            timestamp,
            rect.to_pixels(frame_width, frame_height),
            category,
            self.confidence.clamp(0.0, 1.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text() {
        let json = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"regions\":"},{"text":"[]}"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().unwrap(), r#"{"regions":[]}"#);

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.text().is_none());
    }

    #[test]
    fn test_region_to_roi() {
        let region = DetectedRegion {
            category: "Logo".into(),
            x: 0.1,
            y: 0.2,
            width: 0.25,
            height: 0.1,
            confidence: 0.8,
        };
        let roi = region.to_roi(2.0, 1920, 1080).unwrap();
        assert_eq!(roi.category, RoiCategory::Logo);
        assert!((roi.bbox.x - 192.0).abs() < 1e-9);
        assert!((roi.bbox.height - 108.0).abs() < 1e-9);
        assert_eq!(roi.timestamp, 2.0);

        let unknown = DetectedRegion {
            category: "sky".into(),
            ..region.clone()
        };
        assert_eq!(unknown.to_roi(0.0, 100, 100).unwrap().category, RoiCategory::Generic);

        let outside = DetectedRegion { x: 0.9, ..region };
        assert!(outside.to_roi(0.0, 100, 100).is_none());
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::text("find logos"), Part::jpeg("AAAA".into())],
            }],
            generation_config: GenerationConfig::default(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/jpeg");
        assert!(json["contents"][0]["parts"][0].get("inlineData").is_none());
    }
}
