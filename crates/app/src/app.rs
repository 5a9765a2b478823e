use std::sync::Arc;

use ragdesk_api::{ApiResult, RagBackend, create_backend};

use crate::chat::ChatSession;
use crate::files::FileRepositoryView;
use crate::settings::ClientSettings;

/// Composition root: the chat session and the file view, side by side.
///
/// Both talk to the same backend instance but share no local state, so a
/// document change made through one only reaches the other via the backend.
pub struct App {
    chat: ChatSession,
    files: FileRepositoryView,
}

impl App {
    pub fn new(settings: &ClientSettings) -> ApiResult<Self> {
        let backend = create_backend(settings.to_backend_config())?;
        Ok(Self::with_backend(backend, settings))
    }

    pub fn with_backend(backend: Arc<dyn RagBackend>, settings: &ClientSettings) -> Self {
        Self {
            chat: ChatSession::new(backend.clone(), settings.rag_mode),
            files: FileRepositoryView::new(backend)
                .with_reinitialize_delay(settings.reinitialize_delay()),
        }
    }

    /// Mounts the file view. The chat session needs no initial load.
    pub async fn mount(&self) {
        self.files.mount().await;
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn files(&self) -> &FileRepositoryView {
        &self.files
    }
}
