use crate::wizard::{Backdrop, ModelProfile, ProductCard};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("Other: {0}")] Other(String),
}

/// Boundary to the image-generation backend. The wizard hands product, model
/// and backdrop descriptors across and gets back one display URL per shot.
#[async_trait]
pub trait ShootRenderer: Send + Sync {
    async fn render_shoot(
        &self,
        products: &[ProductCard],
        casting: &[ModelProfile],
        backdrop: Option<&Backdrop>,
    ) -> Vec<String>;
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let base_url = std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    pub fn build_shot_prompt(
        product: &ProductCard,
        model: &ModelProfile,
        backdrop: Option<&Backdrop>,
    ) -> String {
        let setting = match backdrop {
            Some(b) => format!("staged in the \"{}\" setting ({})", b.name, b.category),
            None => "staged against a neutral studio background".to_string(),
        };
        format!(
            "Professional e-commerce photoshoot of the product \"{}\" presented by {} ({} ethnicity, {} body type, {} style), {}. Natural lighting, editorial quality, sharp focus on the product, no text over image.",
            product.name, model.name, model.ethnicity, model.body_type, model.style, setting
        )
    }

    async fn perform_api_call(&self, prompt: &str) -> Result<String, GeminiError> {
        let url = format!(
            "{}/models/gemini-2.5-flash-image-preview:generateContent?key={}",
            self.base_url, self.api_key
        );

        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let request_body = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
                "temperature": 0.4,
                "topP": 0.95,
                "topK": 64,
                "candidateCount": 1
            }
        });

        let response = self.client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", error_body);
            return Err(GeminiError::Http(format!("status={} body={}", status, error_body)));
        }

        let response_text = response.text().await
            .map_err(|e| GeminiError::Other(e.to_string()))?;

        // Truncate base64 image data for cleaner logging
        let truncated_response = if response_text.len() > 1000 {
            if let Ok(mut json_value) = serde_json::from_str::<serde_json::Value>(&response_text) {
                truncate_base64_in_json(&mut json_value);
                serde_json::to_string_pretty(&json_value).unwrap_or(response_text[..1000].to_string() + "...")
            } else {
                response_text[..1000].to_string() + "..."
            }
        } else {
            response_text.clone()
        };

        info!("📥 Raw Gemini API response: {}", truncated_response);

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Other(format!("parse error: {}: {}", e, response_text)))?;

        match extract_first_image(&parsed) {
            Some((mime_type, data)) => {
                let preview = if data.len() > 50 {
                    format!("{}...[{} chars total]", &data[..50], data.len())
                } else {
                    data.clone()
                };
                info!("🖼️ Extracted {} image from API response: {}", mime_type, preview);
                Ok(format!("data:{};base64,{}", mime_type, data))
            }
            None => {
                info!("⚠️ No image data found in API response");
                Err(GeminiError::Other("no image data in response".into()))
            }
        }
    }

    /// Generate a single shot, returning a self-contained `data:` URL. Demo
    /// mode and any API failure fall back to a placeholder instead of
    /// surfacing an error to the wizard.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, GeminiError> {
        if self.api_key == "DEMO_KEY" {
            info!("Using demo mode - no real images generated");
            return Ok(self.placeholder_shot(prompt));
        }

        info!("Generating image with Gemini API...");
        match self.perform_api_call(prompt).await {
            Ok(data_url) => {
                info!("✅ Successfully generated image ({} chars)", data_url.len());
                Ok(data_url)
            }
            Err(e) => {
                error!("❌ Failed to generate image: {}", e);
                info!("🔄 Falling back to placeholder image");
                Ok(self.placeholder_shot(prompt))
            }
        }
    }

    fn placeholder_shot(&self, prompt: &str) -> String {
        let swatches = [
            "#3B82F6",
            "#EF4444",
            "#10B981",
            "#F59E0B",
            "#8B5CF6",
        ];
        let color = swatches[prompt.len() % swatches.len()];

        let svg = format!(r#"<svg width="400" height="300" xmlns="http://www.w3.org/2000/svg">
            <defs>
                <linearGradient id="grad" x1="0%" y1="0%" x2="100%" y2="100%">
                    <stop offset="0%" style="stop-color:{};stop-opacity:1" />
                    <stop offset="100%" style="stop-color:{};stop-opacity:0.6" />
                </linearGradient>
            </defs>
            <rect width="400" height="300" fill="url(#grad)" />
            <text x="200" y="150" font-family="Arial, sans-serif" font-size="24" font-weight="bold"
                  text-anchor="middle" fill="white">
                📸 Product Shot
            </text>
            <text x="200" y="200" font-family="Arial, sans-serif" font-size="12"
                  text-anchor="middle" fill="white" opacity="0.8">
                AI Photoshoot Preview
            </text>
        </svg>"#, color, color);

        let b64 = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
        format!("data:image/svg+xml;base64,{}", b64)
    }
}

#[async_trait]
impl ShootRenderer for GeminiClient {
    async fn render_shoot(
        &self,
        products: &[ProductCard],
        casting: &[ModelProfile],
        backdrop: Option<&Backdrop>,
    ) -> Vec<String> {
        let mut shots = Vec::new();
        for product in products {
            for model in casting {
                let prompt = Self::build_shot_prompt(product, model, backdrop);
                info!(
                    "🎯 Rendering shot of '{}' with '{}': {}",
                    product.name,
                    model.name,
                    &prompt[..std::cmp::min(100, prompt.len())]
                );
                match self.generate_image(&prompt).await {
                    Ok(url) => shots.push(url),
                    Err(e) => error!("❌ Shot of '{}' failed: {}", product.name, e),
                }
            }
        }
        shots
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    Other(serde_json::Value)
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

fn extract_first_image(resp: &GeminiResponse) -> Option<(String, String)> {
    for c in &resp.candidates {
        for p in &c.content.parts {
            if let Part::Inline { inline_data } = p {
                return Some((inline_data.mime_type.clone(), inline_data.data.clone()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> ProductCard {
        ProductCard {
            id: "upload-0".to_string(),
            name: "Linen Shirt".to_string(),
            image: "/api/photoshoots/x/uploads/y/0".to_string(),
        }
    }

    #[test]
    fn shot_prompt_mentions_product_model_and_backdrop() {
        let model = ModelProfile::synthesized("m1");
        let backdrop = Backdrop::synthesized("b2");
        let prompt = GeminiClient::build_shot_prompt(&sample_product(), &model, Some(&backdrop));

        assert!(prompt.contains("Linen Shirt"));
        assert!(prompt.contains("Model m1"));
        assert!(prompt.contains("Background b2"));
    }

    #[test]
    fn shot_prompt_without_backdrop_uses_studio_default() {
        let model = ModelProfile::synthesized("m1");
        let prompt = GeminiClient::build_shot_prompt(&sample_product(), &model, None);
        assert!(prompt.contains("neutral studio background"));
    }

    #[test]
    fn placeholder_is_a_data_url() {
        let client = GeminiClient::new("DEMO_KEY".to_string());
        let url = client.placeholder_shot("any prompt");
        assert!(url.starts_with("data:image/svg+xml;base64,"));

        let b64 = url.trim_start_matches("data:image/svg+xml;base64,");
        let decoded = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        assert!(String::from_utf8(decoded).unwrap().contains("<svg"));
    }

    #[test]
    fn extracts_inline_image_from_response() {
        let raw = r#"{"candidates":[{"content":{"parts":[
            {"text":"here is your image"},
            {"inlineData":{"data":"aGVsbG8=","mimeType":"image/png"}}
        ]}}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let (mime, data) = extract_first_image(&parsed).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data, "aGVsbG8=");
    }
}
