//! Anthropic Claude API client, the generative backend for every engine
//!
//! Every engine that consults this client has a rule-based fallback, so the
//! client being unavailable (no key, network failure, timeout) is never an
//! error the caller sees.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::settings;

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

/// Check if AI features are available (API key is set)
pub fn is_available() -> bool {
    settings::has_api_key()
}

/// Handle to the generative text service
#[derive(Debug, Clone)]
pub struct AiClient {
    client: reqwest::Client,
    model: String,
}

impl AiClient {
    /// Build a client with the configured model and request timeout.
    ///
    /// Returns None when no API key is configured, so callers can wire the
    /// rule-based path at construction time instead of failing per-request.
    pub fn from_settings() -> Option<Self> {
        if !is_available() {
            return None;
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings::request_timeout_secs()))
            .build()
            .ok()?;

        Some(AiClient {
            client,
            model: settings::llm_model(),
        })
    }

    /// Send a prompt and return the raw completion text
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, String> {
        let api_key = settings::get_api_key().ok_or("ANTHROPIC_API_KEY not set")?;

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API error {}: {}", status, body));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        let text = api_response
            .content
            .first()
            .map(|c| c.text.clone())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err("Empty response from API".to_string());
        }

        Ok(text)
    }
}

/// Truncate content at a safe UTF-8 boundary for API efficiency
pub fn truncate_for_prompt(content: &str, max_bytes: usize) -> &str {
    if content.len() <= max_bytes {
        return content;
    }
    let mut end = max_bytes;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

/// Strip markdown code fences the model sometimes wraps JSON in
pub fn strip_markdown_fences(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        trimmed
            .lines()
            .skip(1)
            .take_while(|l| !l.starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundary() {
        let s = "héllo wörld, this is a long string with multibyte chars ééé";
        let cut = truncate_for_prompt(s, 10);
        assert!(cut.len() <= 10);
        assert!(s.starts_with(cut));
    }

    #[test]
    fn test_truncate_short_input_untouched() {
        assert_eq!(truncate_for_prompt("short", 3000), "short");
    }

    #[test]
    fn test_strip_fences() {
        let wrapped = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_markdown_fences(wrapped), "{\"a\": 1}");

        let bare = "{\"a\": 1}";
        assert_eq!(strip_markdown_fences(bare), "{\"a\": 1}");
    }
}
