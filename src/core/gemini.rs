use serde_json::Value;
use tracing::debug;

use crate::api::GenerateRequest;
use crate::core::dispatch::{DispatchError, Dispatcher};
use crate::utils::url::{generate_content_url, redact_query};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// Wraps the user's words in the persona instruction sent upstream.
pub fn frame_prompt(assistant_name: &str, user_text: &str) -> String {
    format!(
        "You are a friendly and helpful chatbot named {assistant_name}. Respond to the \
following message in a conversational tone. Do not use any markdown formatting. \
User: \"{user_text}\""
    )
}

/// Everything needed to reach one model on one endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    dispatcher: Dispatcher,
    base_url: String,
    model: String,
    api_key: String,
    assistant_name: String,
}

impl GeminiClient {
    pub fn new(
        dispatcher: Dispatcher,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        assistant_name: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            assistant_name: assistant_name.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        generate_content_url(&self.base_url, &self.model, &self.api_key)
    }

    pub fn build_payload(&self, user_text: &str) -> GenerateRequest {
        GenerateRequest::single_turn(
            self.model.clone(),
            frame_prompt(&self.assistant_name, user_text),
        )
    }

    /// Runs one dispatch for `user_text` and returns the decoded body.
    pub async fn generate(&self, user_text: &str) -> Result<Value, DispatchError> {
        let endpoint = self.endpoint();
        let payload = serde_json::to_value(self.build_payload(user_text))
            .map_err(|e| DispatchError::Decode(e.to_string()))?;
        debug!(endpoint = redact_query(&endpoint), model = %self.model, "dispatching");
        self.dispatcher.dispatch(&endpoint, &payload).await
    }
}
