use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::prompts::SYSTEM_PROMPT;
use super::VisionModel;
use crate::config::VisionConfig;
use crate::error::VisionError;

/// Chat-completions client for OpenAI-compatible endpoints (OpenRouter by
/// default). Images go inline as base64 data URLs.
#[derive(Debug)]
pub struct OpenRouterClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl OpenRouterClient {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(VisionError::NotConfigured)?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn request_body(&self, prompt: &str, image: Option<&[u8]>) -> Value {
        let user_content = match image {
            Some(bytes) => json!([
                { "type": "text", "text": prompt },
                {
                    "type": "image_url",
                    "image_url": { "url": format!("data:image/png;base64,{}", STANDARD.encode(bytes)) }
                }
            ]),
            None => json!(prompt),
        };

        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_content }
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature
        })
    }
}

#[async_trait]
impl VisionModel for OpenRouterClient {
    async fn analyze(&self, prompt: &str, image: Option<&[u8]>) -> Result<String, VisionError> {
        debug!(
            "Requesting chart analysis from {} (image: {})",
            self.model,
            image.is_some()
        );

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.api_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(prompt, image))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(VisionError::EmptyResponse);
        }
        Ok(content.to_string())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VisionConfig {
        VisionConfig {
            api_key: Some("key".into()),
            ..VisionConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        let config = VisionConfig {
            api_key: None,
            ..VisionConfig::default()
        };
        assert!(matches!(
            OpenRouterClient::new(&config),
            Err(VisionError::NotConfigured)
        ));
    }

    #[test]
    fn test_image_is_sent_as_data_url() {
        let client = OpenRouterClient::new(&config()).unwrap();
        let body = client.request_body("look", Some(&[1, 2, 3]));
        let url = body["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert_eq!(url, "data:image/png;base64,AQID");

        let text_only = client.request_body("look", None);
        assert_eq!(text_only["messages"][1]["content"], "look");
    }
}
