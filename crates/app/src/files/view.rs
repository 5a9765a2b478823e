use std::sync::Arc;
use std::time::Duration;

use ragdesk_api::{
    FileRecord, RagBackend, RagStatus, SystemStatus, UploadPayload, UploadReceipt,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::files::state::FileRepositoryState;

/// Delay before re-polling RAG status after a reinitialize request.
pub const DEFAULT_REINITIALIZE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored; listing and status were re-fetched.
    Uploaded(UploadReceipt),
    /// The backend already holds this document; nothing was refreshed.
    Duplicate(UploadReceipt),
    Failed,
    /// Another upload from this view is still outstanding; nothing was sent.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteOutcome {
    Deleted,
    /// Confirmation was declined; nothing was sent.
    Declined,
    Failed,
}

#[derive(Debug)]
pub enum ReinitializeOutcome {
    /// Accepted; the handle resolves after the single delayed status refresh.
    Scheduled(JoinHandle<()>),
    Failed,
}

/// Local view of uploaded documents and RAG indexing status.
///
/// Listing and status are replaced wholesale from the latest fetch and
/// re-fetched after every mutation this view completes.
#[derive(Clone)]
pub struct FileRepositoryView {
    backend: Arc<dyn RagBackend>,
    state: Arc<watch::Sender<FileRepositoryState>>,
    reinitialize_delay: Duration,
}

impl FileRepositoryView {
    pub fn new(backend: Arc<dyn RagBackend>) -> Self {
        let (state, _) = watch::channel(FileRepositoryState::default());
        Self {
            backend,
            state: Arc::new(state),
            reinitialize_delay: DEFAULT_REINITIALIZE_DELAY,
        }
    }

    pub fn with_reinitialize_delay(mut self, delay: Duration) -> Self {
        self.reinitialize_delay = delay;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<FileRepositoryState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FileRepositoryState {
        self.state.borrow().clone()
    }

    pub fn is_uploading(&self) -> bool {
        self.state.borrow().uploading
    }

    /// Initial load. Each fetch fails independently and leaves its part at the default.
    pub async fn mount(&self) {
        tracing::debug!("mounting file repository view");
        self.refresh().await;
    }

    /// Re-fetches listing and status concurrently and publishes both in one update.
    ///
    /// A part whose fetch fails keeps its last known value.
    pub async fn refresh(&self) {
        let (files, status) = tokio::join!(self.fetch_listing(), self.fetch_status());
        self.state.send_if_modified(|state| {
            let mut modified = false;
            if let Some(files) = files {
                state.files = files;
                modified = true;
            }
            if let Some(status) = status {
                state.rag_status = status;
                modified = true;
            }
            modified
        });
    }

    async fn refresh_status(&self) {
        if let Some(status) = self.fetch_status().await {
            self.state.send_modify(|state| state.rag_status = status);
        }
    }

    async fn fetch_listing(&self) -> Option<Vec<FileRecord>> {
        match self.backend.list_files().await {
            Ok(listing) => {
                tracing::debug!("loaded {} files", listing.files.len());
                Some(listing.files)
            }
            Err(error) => {
                tracing::warn!("failed to load file listing: {error}");
                None
            }
        }
    }

    async fn fetch_status(&self) -> Option<RagStatus> {
        match self.backend.rag_status().await {
            Ok(status) => Some(status),
            Err(error) => {
                tracing::warn!("failed to load RAG status, keeping last known: {error}");
                None
            }
        }
    }

    /// Uploads one document. Single-flight per view.
    pub async fn upload(&self, payload: UploadPayload) -> UploadOutcome {
        let Some(_uploading) = UploadingFlag::acquire(&self.state) else {
            tracing::debug!("upload of '{}' ignored, another upload is outstanding", payload.filename);
            return UploadOutcome::Busy;
        };

        let filename = payload.filename.clone();
        match self.backend.upload_file(payload).await {
            Ok(receipt) if receipt.is_duplicate() => {
                tracing::info!("'{filename}' is already stored by the backend");
                UploadOutcome::Duplicate(receipt)
            }
            Ok(receipt) => {
                tracing::info!("uploaded '{filename}' (status {})", receipt.status);
                self.refresh().await;
                UploadOutcome::Uploaded(receipt)
            }
            Err(error) => {
                tracing::error!("failed to upload '{filename}': {error}");
                UploadOutcome::Failed
            }
        }
    }

    /// Deletes a document once `confirm` approves it.
    pub async fn delete<F>(&self, filename: &str, confirm: F) -> DeleteOutcome
    where
        F: FnOnce(&str) -> bool,
    {
        if !confirm(filename) {
            tracing::debug!("deletion of '{filename}' declined");
            return DeleteOutcome::Declined;
        }

        match self.backend.delete_file(filename).await {
            Ok(_) => {
                tracing::info!("deleted '{filename}'");
                self.refresh().await;
                DeleteOutcome::Deleted
            }
            Err(error) => {
                tracing::error!("failed to delete '{filename}': {error}");
                DeleteOutcome::Failed
            }
        }
    }

    /// Asks the backend to rebuild its index, then polls status once after a delay.
    ///
    /// Any HTTP answer schedules the poll; only an unreachable backend yields `Failed`.
    /// The delayed poll is best effort; indexing may still be running when it fires.
    pub async fn reinitialize_rag(&self) -> ReinitializeOutcome {
        if let Err(error) = self.backend.reinitialize_rag().await {
            tracing::error!("failed to request RAG reinitialization: {error}");
            return ReinitializeOutcome::Failed;
        }

        let view = self.clone();
        let delay = self.reinitialize_delay;
        tracing::info!("RAG reinitialization requested, re-polling status in {delay:?}");
        ReinitializeOutcome::Scheduled(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            view.refresh_status().await;
        }))
    }

    pub async fn system_status(&self) -> Option<SystemStatus> {
        match self.backend.system_status().await {
            Ok(status) => Some(status),
            Err(error) => {
                tracing::warn!("failed to load system status: {error}");
                None
            }
        }
    }
}

/// Holds `uploading` for the lifetime of one upload and clears it on every exit path.
struct UploadingFlag<'a> {
    state: &'a watch::Sender<FileRepositoryState>,
}

impl<'a> UploadingFlag<'a> {
    fn acquire(state: &'a watch::Sender<FileRepositoryState>) -> Option<Self> {
        let acquired = state.send_if_modified(|state| {
            if state.uploading {
                return false;
            }
            state.uploading = true;
            true
        });
        acquired.then_some(Self { state })
    }
}

impl Drop for UploadingFlag<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.uploading = false);
    }
}
