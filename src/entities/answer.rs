use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::entities::label::LabelFields;
use crate::error::RxLabelError;
use crate::render::prompt;
use crate::sources::openai::{ChatCompletionClient, ChatMessage, CompletionSettings};

/// Turns a question plus label fields into a clinician-facing answer.
#[async_trait]
pub trait AnswerComposer: Send + Sync {
    async fn compose(
        &self,
        question: &str,
        drug: &str,
        fields: &LabelFields,
    ) -> Result<String, RxLabelError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// One user message holding instructions, question, and data.
    #[default]
    Single,
    /// A fixed system message plus a user message with the question and data.
    Chat,
}

pub(crate) fn build_messages(
    style: PromptStyle,
    question: &str,
    drug: &str,
    fields: &LabelFields,
) -> Result<Vec<ChatMessage>, RxLabelError> {
    Ok(match style {
        PromptStyle::Single => vec![ChatMessage::user(prompt::single_prompt(
            question, drug, fields,
        )?)],
        PromptStyle::Chat => vec![
            ChatMessage::system(prompt::chat_system_prompt()?),
            ChatMessage::user(prompt::chat_user_prompt(question, drug, fields)?),
        ],
    })
}

pub struct LlmComposer {
    client: ChatCompletionClient,
    settings: CompletionSettings,
    style: PromptStyle,
}

impl LlmComposer {
    pub fn new(
        client: ChatCompletionClient,
        settings: CompletionSettings,
        style: PromptStyle,
    ) -> Self {
        Self {
            client,
            settings,
            style,
        }
    }
}

#[async_trait]
impl AnswerComposer for LlmComposer {
    async fn compose(
        &self,
        question: &str,
        drug: &str,
        fields: &LabelFields,
    ) -> Result<String, RxLabelError> {
        let messages = build_messages(self.style, question, drug, fields)?;
        debug!(
            drug,
            style = ?self.style,
            fields = fields.len(),
            available = fields.available_count(),
            "Composing answer"
        );
        self.client.complete(&self.settings, &messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::label::FieldValue;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fields() -> LabelFields {
        [(
            "Dosage".to_string(),
            FieldValue::Available("2 caplets every 6 hours".into()),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn single_style_sends_one_user_message() {
        let messages =
            build_messages(PromptStyle::Single, "Tylenol dose?", "Tylenol", &fields()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert!(
            messages[0]
                .content
                .contains("Dosage: 2 caplets every 6 hours")
        );
        assert!(messages[0].content.contains("\"Tylenol dose?\""));
    }

    #[test]
    fn chat_style_separates_instructions_from_data() {
        let messages =
            build_messages(PromptStyle::Chat, "Tylenol dose?", "Tylenol", &fields()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(!messages[0].content.contains("2 caplets"));
        assert_eq!(messages[1].role, "user");
        assert!(
            messages[1]
                .content
                .contains("Dosage: 2 caplets every 6 hours")
        );
    }

    #[tokio::test]
    async fn llm_composer_returns_completion_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("2 caplets every 6 hours"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Adults: 2 caplets q6h."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new_for_test(server.uri(), "sk-test").unwrap();
        let composer = LlmComposer::new(client, CompletionSettings::default(), PromptStyle::Chat);
        let answer = composer
            .compose("Tylenol dose?", "Tylenol", &fields())
            .await
            .unwrap();
        assert_eq!(answer, "Adults: 2 caplets q6h.");
    }
}
