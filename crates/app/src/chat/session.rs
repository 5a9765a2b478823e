use std::sync::Arc;

use ragdesk_api::{ChatRequest, RagBackend, RagMode};
use tokio::sync::watch;

use crate::chat::message::{
    CHAT_FAILURE_TEXT, ChatSessionState, Message, SubmitRejection,
};

/// Result of one `ChatSession::submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitOutcome {
    /// The backend answered and its reply was appended.
    Replied,
    /// The call failed and an error bubble was appended.
    Failed,
    /// Nothing was appended and no request was sent.
    Rejected(SubmitRejection),
}

/// Chat transcript owner. Processes at most one outstanding request.
///
/// Clones share the same transcript, so a front-end can hand copies to
/// spawned tasks while subscribers keep rendering from `subscribe`.
#[derive(Clone)]
pub struct ChatSession {
    backend: Arc<dyn RagBackend>,
    rag_mode: RagMode,
    state: Arc<watch::Sender<ChatSessionState>>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn RagBackend>, rag_mode: RagMode) -> Self {
        let (state, _) = watch::channel(ChatSessionState::default());
        Self {
            backend,
            rag_mode,
            state: Arc::new(state),
        }
    }

    pub fn rag_mode(&self) -> RagMode {
        self.rag_mode
    }

    /// Receives every committed transcript change.
    pub fn subscribe(&self) -> watch::Receiver<ChatSessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ChatSessionState {
        self.state.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().pending
    }

    /// Runs one chat turn.
    ///
    /// The user message is appended before the request starts and stays even
    /// when the request fails. Blank input and submissions made while a reply
    /// is outstanding are ignored.
    pub async fn submit(&self, input: &str) -> SubmitOutcome {
        let mut rejection = None;
        self.state.send_if_modified(|state| match state.begin_turn(input) {
            Ok(()) => true,
            Err(reason) => {
                rejection = Some(reason);
                false
            }
        });
        if let Some(reason) = rejection {
            tracing::debug!("ignored chat submission: {reason:?}");
            return SubmitOutcome::Rejected(reason);
        }

        let turn = PendingTurn::new(&self.state);
        let request = ChatRequest::new(input.trim(), self.rag_mode);

        match self.backend.send_chat_message(request).await {
            Ok(reply) => {
                turn.settle(Message::bot(reply.reply));
                SubmitOutcome::Replied
            }
            Err(error) => {
                tracing::error!("chat request failed on `{}`: {}", error.stage(), error);
                turn.settle(Message::bot_error(CHAT_FAILURE_TEXT));
                SubmitOutcome::Failed
            }
        }
    }
}

/// Guarantees the AwaitingReply -> Idle transition even if the turn future is dropped.
struct PendingTurn<'a> {
    state: &'a watch::Sender<ChatSessionState>,
    settled: bool,
}

impl<'a> PendingTurn<'a> {
    fn new(state: &'a watch::Sender<ChatSessionState>) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, reply: Message) {
        self.settled = true;
        self.state.send_modify(|state| {
            state.finish_turn(reply);
        });
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        tracing::warn!("chat turn dropped before the reply arrived");
        self.state.send_modify(|state| {
            state.finish_turn(Message::bot_error(CHAT_FAILURE_TEXT));
        });
    }
}
