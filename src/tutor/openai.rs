//! OpenAI chat-completions client: the language-model collaborator.

use serde::{Deserialize, Serialize};

use crate::tutor::responder::ChatModel;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 400;

/// Tutoring persona sent as the system message with every request.
const PERSONA: &str = "You are a friendly English tutor chatting with a \
    learner over Telegram. Keep the conversation going, gently correct \
    grammar and word-choice mistakes, and ask a short follow-up question. \
    Keep replies under 80 words.";

pub struct OpenAiChat {
    api_key: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest {
    model: &'static str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiChat {
    pub fn new(api_key: String) -> Self {
        // Bounded timeout so a stuck completion can't wedge the handler.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self { api_key, http }
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiChat {
    async fn reply(&self, user_text: &str) -> Result<String, LlmError> {
        let request = ApiRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: PERSONA.to_string(),
                },
                ApiMessage {
                    role: "user",
                    content: user_text.to_string(),
                },
            ],
        };

        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        api_response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::Empty)
    }
}

#[derive(Debug)]
pub enum LlmError {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Http(e) => write!(f, "HTTP error: {e}"),
            LlmError::Api(e) => write!(f, "API error: {e}"),
            LlmError::Parse(e) => write!(f, "Parse error: {e}"),
            LlmError::Empty => write!(f, "Empty completion"),
        }
    }
}

impl std::error::Error for LlmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_with_persona_first() {
        let request = ApiRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: PERSONA.to_string(),
                },
                ApiMessage {
                    role: "user",
                    content: "hello".to_string(),
                },
            ],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], MODEL);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi there!"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Hi there!")
        );
    }
}
