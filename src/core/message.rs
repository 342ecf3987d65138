use chrono::{DateTime, Local};

/// Which side of the conversation authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderId {
    Human,
    Assistant,
}

impl SenderId {
    pub fn is_human(self) -> bool {
        self == SenderId::Human
    }

    pub fn is_assistant(self) -> bool {
        self == SenderId::Assistant
    }
}

/// A named side of the conversation. The display name is configurable, the
/// id is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: SenderId,
    pub name: String,
}

impl Participant {
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            id: SenderId::Human,
            name: name.into(),
        }
    }

    pub fn assistant(name: impl Into<String>) -> Self {
        Self {
            id: SenderId::Assistant,
            name: name.into(),
        }
    }
}

/// One transcript entry. Fields are private so a message cannot change after
/// it has been appended.
#[derive(Debug, Clone)]
pub struct Message {
    text: String,
    sender_id: SenderId,
    sender_name: String,
    timestamp: DateTime<Local>,
}

impl Message {
    /// Stamps the message with the current local time.
    pub fn new(sender: &Participant, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender_id: sender.id,
            sender_name: sender.name.clone(),
            timestamp: Local::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender_id(&self) -> SenderId {
        self.sender_id
    }

    pub fn sender_name(&self) -> &str {
        &self.sender_name
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn is_human(&self) -> bool {
        self.sender_id.is_human()
    }

    pub fn is_assistant(&self) -> bool {
        self.sender_id.is_assistant()
    }
}
