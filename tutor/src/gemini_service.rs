use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::models::*;
use reqwest::Client;

/// Stateless client for the `generateContent` endpoint. Every call carries
/// its full context; nothing about the session is kept here.
pub struct GeminiService {
    client: Client,
    config: GatewayConfig,
}

impl GeminiService {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Sends one request and returns the text of the first candidate part.
    /// Decoding that text is left to the caller.
    pub async fn generate(&self, request: &ModelRequest) -> Result<String, GatewayError> {
        let body = self.build_request(request);

        log::info!(
            "Calling {} with {} history turns and {} parts",
            self.config.model,
            request.history.len(),
            request.parts.len()
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("Gemini API error ({}): {}", status, error_text);
            return Err(GatewayError::Api {
                status,
                body: error_text,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GatewayError::NoContent)
    }

    pub fn build_request(&self, request: &ModelRequest) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = request
            .history
            .iter()
            .map(|message| GeminiContent {
                role: Some(message.role.as_str().to_string()),
                parts: vec![ContentPart::text(message.content.clone())],
            })
            .collect();

        contents.push(GeminiContent {
            role: Some(Role::User.as_str().to_string()),
            parts: request.parts.clone(),
        });

        let (response_mime_type, response_schema) = match &request.response_schema {
            Some(schema) => (Some("application/json".to_string()), Some(schema.clone())),
            None => (None, None),
        };

        GeminiRequest {
            contents,
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![ContentPart::text(request.system_instruction.clone())],
            }),
            generation_config: Some(GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type,
                response_schema,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(schema: Option<serde_json::Value>) -> ModelRequest {
        ModelRequest {
            system_instruction: "persona".to_string(),
            history: vec![ChatMessage::model("hello"), ChatMessage::user("hi")],
            parts: vec![
                ContentPart::inline("AAAA", "image/png"),
                ContentPart::text("notes"),
            ],
            response_schema: schema,
        }
    }

    #[test]
    fn history_precedes_the_new_turn() {
        let service = GeminiService::new(GatewayConfig::new("k"));
        let body = serde_json::to_value(service.build_request(&request(None))).unwrap();

        assert_eq!(body["contents"][0]["role"], "model");
        assert_eq!(body["contents"][1]["role"], "user");
        assert_eq!(body["contents"][2]["role"], "user");
        assert_eq!(
            body["contents"][2]["parts"][0],
            json!({"inlineData": {"data": "AAAA", "mimeType": "image/png"}})
        );
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "persona");
        assert!(body["systemInstruction"].get("role").is_none());
        assert!(body["generationConfig"].get("responseSchema").is_none());
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn configured_token_limit_is_sent() {
        let service = GeminiService::new(GatewayConfig::new("k").with_max_output_tokens(1000));
        let body = serde_json::to_value(service.build_request(&request(None))).unwrap();

        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn schema_switches_output_to_json() {
        let service = GeminiService::new(GatewayConfig::new("k"));
        let schema = json!({"type": "OBJECT"});
        let body = serde_json::to_value(service.build_request(&request(Some(schema.clone())))).unwrap();

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], schema);
    }
}
