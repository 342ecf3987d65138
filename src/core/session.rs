//! Conversation state and the submit/settle transitions.
//!
//! A [`ChatSession`] is either [`Phase::Idle`] or
//! [`Phase::AwaitingResponse`]. [`ChatSession::submit`] moves Idle to
//! AwaitingResponse and hands back the text to dispatch;
//! [`ChatSession::settle`] appends exactly one assistant message and moves
//! back to Idle. Submissions made while a reply is outstanding are dropped.

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::dispatch::DispatchError;
use crate::core::message::{Message, Participant};
use crate::core::reply::ReplyOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse,
}

/// User text accepted for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDispatch {
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
    input: String,
    phase: Phase,
    human: Participant,
    assistant: Participant,
}

impl ChatSession {
    pub fn new(human: Participant, assistant: Participant) -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            phase: Phase::Idle,
            human,
            assistant,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True while a dispatch is in flight.
    pub fn is_composing(&self) -> bool {
        self.phase == Phase::AwaitingResponse
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn human(&self) -> &Participant {
        &self.human
    }

    pub fn assistant(&self) -> &Participant {
        &self.assistant
    }

    // The input box is disabled while composing; edits are ignored.

    pub fn push_char(&mut self, c: char) {
        if !self.is_composing() {
            self.input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if !self.is_composing() {
            self.input.pop();
        }
    }

    /// Appends the human message and enters AwaitingResponse. Returns `None`
    /// without touching any state when `text` is blank or a reply is still
    /// outstanding.
    pub fn submit(&mut self, text: &str) -> Option<PendingDispatch> {
        if text.trim().is_empty() {
            return None;
        }
        if self.is_composing() {
            debug!("submission ignored while awaiting a reply");
            return None;
        }

        self.messages.push(Message::new(&self.human, text));
        self.input.clear();
        self.phase = Phase::AwaitingResponse;
        Some(PendingDispatch {
            text: text.to_string(),
        })
    }

    /// Submits the current input buffer.
    pub fn submit_input(&mut self) -> Option<PendingDispatch> {
        let text = self.input.clone();
        self.submit(&text)
    }

    /// Records the outcome of the outstanding dispatch. Every outcome yields
    /// one assistant message; failures become the fallback text. Returns
    /// `None` if nothing was in flight.
    pub fn settle(&mut self, result: Result<Value, DispatchError>) -> Option<&Message> {
        if !self.is_composing() {
            warn!("dispatch result arrived with no request in flight; dropping it");
            return None;
        }

        let message = ReplyOutcome::from_dispatch(result).into_message(&self.assistant);
        self.messages.push(message);
        self.phase = Phase::Idle;
        self.messages.last()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(Participant::human("You"), Participant::assistant("Gemini"))
    }
}
