//! OpenAI-compatible chat completion client.
//!
//! Any endpoint exposing `POST {base}/chat/completions` works (OpenAI,
//! OpenRouter, Ollama, vLLM); point `RXLABEL_LLM_BASE` at it.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RxLabelError;

pub(crate) const LLM_BASE: &str = "https://api.openai.com/v1";
pub(crate) const LLM_BASE_ENV: &str = "RXLABEL_LLM_BASE";
pub(crate) const LLM_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const LLM_API: &str = "chat-completions";
const LLM_DOCS_URL: &str = "https://platform.openai.com/api-keys";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletionClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: String,
}

impl ChatCompletionClient {
    /// # Errors
    ///
    /// Returns `ApiKeyRequired` when `OPENAI_API_KEY` is unset or blank.
    pub fn new() -> Result<Self, RxLabelError> {
        Self::from_key(crate::sources::env_secret(LLM_API_KEY_ENV))
    }

    pub(crate) fn from_key(api_key: Option<String>) -> Result<Self, RxLabelError> {
        let Some(api_key) = api_key else {
            return Err(RxLabelError::ApiKeyRequired {
                api: LLM_API.to_string(),
                env_var: LLM_API_KEY_ENV.to_string(),
                docs_url: LLM_DOCS_URL.to_string(),
            });
        };
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(LLM_BASE, LLM_BASE_ENV),
            api_key,
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String, api_key: &str) -> Result<Self, RxLabelError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Sends one non-streaming completion and returns the first choice's text.
    pub async fn complete(
        &self,
        settings: &CompletionSettings,
        messages: &[ChatMessage],
    ) -> Result<String, RxLabelError> {
        let body = ChatRequest {
            model: &settings.model,
            messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        debug!(model = %settings.model, messages = messages.len(), "Sending completion request");

        let resp = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, LLM_API).await?;

        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(RxLabelError::Api {
                api: LLM_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        crate::sources::ensure_json_content_type(LLM_API, content_type.as_ref(), &bytes)?;
        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|source| RxLabelError::ApiJson {
                api: LLM_API.to_string(),
                source,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| RxLabelError::Api {
                api: LLM_API.to_string(),
                message: "Completion returned no answer text".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn complete_posts_settings_and_returns_first_choice() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 500,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "  Take 2 caplets.  "}},
                    {"message": {"role": "assistant", "content": "ignored"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new_for_test(server.uri(), "sk-test").unwrap();
        let answer = client
            .complete(
                &CompletionSettings::default(),
                &[ChatMessage::user("hello")],
            )
            .await
            .unwrap();
        assert_eq!(answer, "Take 2 caplets.");
    }

    #[tokio::test]
    async fn complete_rejects_empty_choices() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"choices": []});

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new_for_test(server.uri(), "sk-test").unwrap();
        let err = client
            .complete(&CompletionSettings::default(), &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no answer text"));
    }

    #[tokio::test]
    async fn complete_surfaces_auth_failures() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new_for_test(server.uri(), "sk-bad").unwrap();
        let err = client
            .complete(&CompletionSettings::default(), &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("chat-completions"));
        assert!(msg.contains("401"));
    }

    #[test]
    fn missing_key_is_reported_before_any_request() {
        let err = ChatCompletionClient::from_key(None)
            .err()
            .expect("missing key should fail");
        match err {
            RxLabelError::ApiKeyRequired { env_var, .. } => assert_eq!(env_var, "OPENAI_API_KEY"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(ChatCompletionClient::from_key(Some("sk-test".into())).is_ok());
    }

    #[test]
    fn chat_messages_serialize_with_roles() {
        let json = serde_json::to_value([
            ChatMessage::system("You help clinicians."),
            ChatMessage::user("Dose?"),
        ])
        .unwrap();
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[1]["content"], "Dose?");
    }
}
