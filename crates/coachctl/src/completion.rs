//! Completion service abstraction.
//!
//! Single-shot text completions with no conversation state between calls.
//! The shipped implementation talks to an OpenAI-compatible endpoint; a
//! scripted fake covers tests.

use async_trait::async_trait;
use coach_common::config::CompletionConfig;
use coach_common::SessionError;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// One-shot completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, SessionError>;
}

/// HTTP client for an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct HttpCompletionClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpCompletionClient {
    /// Build the client, resolving the API credential from the configured
    /// environment variable if present.
    pub fn new(config: &CompletionConfig) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SessionError::Completion(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: std::env::var(&config.api_key_env).ok(),
            client,
        })
    }
}

#[async_trait]
impl CompletionService for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, SessionError> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SessionError::Completion("completion request timed out".to_string())
            } else {
                SessionError::Completion(format!("completion request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(SessionError::Completion(format!(
                "HTTP {} from completion endpoint",
                response.status()
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SessionError::Completion(format!("invalid completion response: {e}")))?;

        let text = value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| SessionError::Completion("empty completion response".to_string()))?;

        Ok(text.trim().to_string())
    }
}

/// Scripted completion for tests: replays canned responses in order and
/// keeps returning the last one once the script runs out.
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    calls: Mutex<usize>,
}

impl ScriptedCompletion {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    /// Number of completions issued so far.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, SessionError> {
        *self.calls.lock().unwrap() += 1;

        let mut responses = self.responses.lock().unwrap();
        match responses.pop_front() {
            Some(next) => {
                *self.last.lock().unwrap() = Some(next.clone());
                Ok(next)
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| SessionError::Completion("script exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let completion = ScriptedCompletion::new(["unclear", "7"]);

        assert_eq!(completion.complete("a").await.unwrap(), "unclear");
        assert_eq!(completion.complete("b").await.unwrap(), "7");
        // Script exhausted: last response repeats
        assert_eq!(completion.complete("c").await.unwrap(), "7");
        assert_eq!(completion.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_errors() {
        let completion = ScriptedCompletion::new(Vec::<String>::new());
        assert!(completion.complete("a").await.is_err());
    }
}
