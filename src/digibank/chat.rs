//! Banking assistant backed by an OpenRouter chat-completions endpoint.

use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openrouter/auto";
pub const BUSY_REPLY: &str = "AI is busy right now. Please try again.";

#[derive(Debug)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
}

impl ChatClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: Option<SecretString>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build chat HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Answer a customer question. Any upstream problem turns into
    /// [`BUSY_REPLY`].
    #[instrument(skip(self, question))]
    pub async fn ask(&self, question: &str) -> String {
        match self.complete(&build_prompt(question)).await {
            Ok(Some(reply)) => reply,
            Ok(None) => BUSY_REPLY.to_string(),
            Err(err) => {
                warn!("Chat completion failed: {err:#}");
                BUSY_REPLY.to_string()
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("chat API key not configured"))?;

        let payload = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.endpoint))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("chat response is not JSON")?;

        debug!("chat response {}: {}", status, body);

        Ok(extract_reply(&body))
    }
}

#[must_use]
pub fn build_prompt(question: &str) -> String {
    format!(
        "You are a friendly banking assistant for an AI Digital Bank.\n\
         Answer briefly and clearly.\n\n\
         User question: {}",
        question.trim()
    )
}

fn extract_reply(body: &Value) -> Option<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|reply| !reply.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wraps_question() {
        let prompt = build_prompt("  How do I open an account?  ");
        assert!(prompt.starts_with("You are a friendly banking assistant"));
        assert!(prompt.ends_with("User question: How do I open an account?"));
    }

    #[test]
    fn extracts_first_choice() {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": " Visit /signup. "}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        });
        assert_eq!(extract_reply(&body), Some("Visit /signup.".to_string()));
    }

    #[test]
    fn missing_choices_yield_nothing() {
        assert_eq!(extract_reply(&json!({"error": {"code": 429}})), None);
        assert_eq!(extract_reply(&json!({"choices": []})), None);
        assert_eq!(
            extract_reply(&json!({"choices": [{"message": {"content": ""}}]})),
            None
        );
    }

    #[test]
    fn endpoint_is_derived_from_base_url() {
        let client = ChatClient::new("https://openrouter.ai/api/v1/", None);
        assert_eq!(
            client.map(|c| c.endpoint().to_string()).unwrap_or_default(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn busy_without_api_key() {
        match ChatClient::new(DEFAULT_OPENROUTER_URL, None) {
            Ok(client) => assert_eq!(client.ask("hello").await, BUSY_REPLY),
            Err(err) => panic!("{err}"),
        }
    }

    #[tokio::test]
    async fn busy_when_upstream_unreachable() {
        let key = Some(SecretString::from("sk-test".to_string()));
        match ChatClient::new("http://127.0.0.1:9", key) {
            Ok(client) => assert_eq!(client.ask("hello").await, BUSY_REPLY),
            Err(err) => panic!("{err}"),
        }
    }
}
