//! Turns a settled dispatch into the assistant's transcript entry.

use serde_json::Value;
use tracing::error;

use crate::api::REPLY_TEXT_POINTER;
use crate::core::dispatch::DispatchError;
use crate::core::message::{Message, Participant};

/// Shown in place of a reply whenever the model produced nothing usable.
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't generate a response. Please try again.";

/// Reads the generated text out of a decoded response. Missing fields,
/// wrong types and empty strings all yield `None`.
pub fn extract_reply_text(body: &Value) -> Option<&str> {
    body.pointer(REPLY_TEXT_POINTER)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    Text(String),
    /// The call succeeded but carried no text.
    EmptyReply(Value),
    Failed(DispatchError),
}

impl ReplyOutcome {
    pub fn from_dispatch(result: Result<Value, DispatchError>) -> Self {
        match result {
            Ok(body) => match extract_reply_text(&body) {
                Some(text) => ReplyOutcome::Text(text.to_string()),
                None => ReplyOutcome::EmptyReply(body),
            },
            Err(err) => ReplyOutcome::Failed(err),
        }
    }

    /// Text to append to the transcript. Failures are logged here and never
    /// shown raw.
    pub fn into_text(self) -> String {
        match self {
            ReplyOutcome::Text(text) => text,
            ReplyOutcome::EmptyReply(body) => {
                error!(response = %body, "API returned no text content");
                FALLBACK_REPLY.to_string()
            }
            ReplyOutcome::Failed(err) => {
                error!(error = %err, "generation request failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    pub fn into_message(self, assistant: &Participant) -> Message {
        Message::new(assistant, self.into_text())
    }
}
