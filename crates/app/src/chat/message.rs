use chrono::{DateTime, SecondsFormat, Utc};

/// Bot text appended when a chat turn fails.
pub const CHAT_FAILURE_TEXT: &str =
    "Sorry, I could not reach the assistant. Please try sending your message again.";

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Bot,
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    text: String,
    sender: Sender,
    created_at: DateTime<Utc>,
    is_error: bool,
}

impl Message {
    fn new(text: impl Into<String>, sender: Sender, is_error: bool) -> Self {
        Self {
            text: text.into(),
            sender,
            created_at: Utc::now(),
            is_error,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User, false)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot, false)
    }

    /// Bot entry standing in for a reply that never arrived.
    pub fn bot_error(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot, true)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// ISO-8601 creation time, e.g. `2026-10-19T08:30:00.123Z`.
    pub fn timestamp(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

/// Lifecycle phase of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatPhase {
    Idle,
    AwaitingReply,
}

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitRejection {
    EmptyInput,
    AwaitingReply,
}

/// Append-only transcript plus the in-flight flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatSessionState {
    pub messages: Vec<Message>,
    pub pending: bool,
}

impl ChatSessionState {
    pub fn phase(&self) -> ChatPhase {
        if self.pending {
            ChatPhase::AwaitingReply
        } else {
            ChatPhase::Idle
        }
    }

    /// Idle -> AwaitingReply. Appends the user message; the append is never rolled back.
    pub fn begin_turn(&mut self, text: &str) -> Result<(), SubmitRejection> {
        if self.pending {
            return Err(SubmitRejection::AwaitingReply);
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitRejection::EmptyInput);
        }

        self.messages.push(Message::user(text));
        self.pending = true;
        Ok(())
    }

    /// AwaitingReply -> Idle. Appends the reply (or its error stand-in).
    ///
    /// Returns false without touching the transcript when no turn is in flight.
    pub fn finish_turn(&mut self, reply: Message) -> bool {
        if !self.pending {
            return false;
        }

        self.messages.push(reply);
        self.pending = false;
        true
    }
}
