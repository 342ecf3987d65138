use serde::{Deserialize, Serialize};

/// Body of a `models/{model}:generateContent` call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub model: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Part {
    pub text: String,
}

impl GenerateRequest {
    /// Single-turn request carrying one text part.
    pub fn single_turn(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.into(),
                }],
            }],
            model: model.into(),
        }
    }
}

/// JSON pointer to the generated text inside a `generateContent` response.
pub const REPLY_TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";
