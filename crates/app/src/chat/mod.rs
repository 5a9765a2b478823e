/// Transcript entries and the turn state machine.
pub mod message;
pub mod session;

pub use message::{
    CHAT_FAILURE_TEXT, ChatPhase, ChatSessionState, Message, Sender, SubmitRejection,
};
pub use session::{ChatSession, SubmitOutcome};
