//! In-memory backend double with call counters for component tests.
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ragdesk_api::{
    Ack, ApiResult, BoxFuture, ChatReply, ChatRequest, FileListing, FileRecord, NetworkError,
    RagBackend, RagStatus, SystemStatus, UploadPayload, UploadReceipt,
};
use tokio::sync::Semaphore;

fn failure(stage: &'static str) -> NetworkError {
    NetworkError::Status {
        stage,
        status: 500,
        body: "fake backend failure".to_string(),
    }
}

#[derive(Default)]
pub(crate) struct Calls {
    pub chat: AtomicUsize,
    pub upload: AtomicUsize,
    pub delete: AtomicUsize,
    pub list: AtomicUsize,
    pub status: AtomicUsize,
    pub reinitialize: AtomicUsize,
}

pub(crate) fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Behaves like the real backend: uploads add files, deletes remove them.
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub calls: Calls,
    pub requests: Mutex<Vec<ChatRequest>>,
    pub files: Mutex<Vec<FileRecord>>,
    pub rag_initialized: AtomicBool,
    pub fail_chat: AtomicBool,
    pub fail_upload: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_list: AtomicBool,
    pub fail_status: AtomicBool,
    pub fail_reinitialize: AtomicBool,
    /// When set, chat calls wait for a permit before answering.
    pub chat_gate: Option<Arc<Semaphore>>,
    /// When set, upload calls wait for a permit before answering.
    pub upload_gate: Option<Arc<Semaphore>>,
    /// When set, listing calls wait for a permit before answering.
    pub list_gate: Option<Arc<Semaphore>>,
}

impl FakeBackend {
    pub fn with_files(names: &[&str]) -> Self {
        let backend = Self::default();
        backend.set_files(names);
        backend.rag_initialized.store(true, Ordering::SeqCst);
        backend
    }

    pub fn gated_chat() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Self {
            chat_gate: Some(gate.clone()),
            ..Self::default()
        };
        (backend, gate)
    }

    pub fn gated_upload() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Self {
            upload_gate: Some(gate.clone()),
            ..Self::default()
        };
        (backend, gate)
    }

    pub fn gated_list() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Self {
            list_gate: Some(gate.clone()),
            ..Self::default()
        };
        (backend, gate)
    }

    pub fn set_files(&self, names: &[&str]) {
        *self.files.lock().unwrap() = names.iter().copied().map(FileRecord::new).collect();
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    fn failing(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }

    async fn pass_gate(gate: &Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

impl RagBackend for FakeBackend {
    fn send_chat_message<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, ApiResult<ChatReply>> {
        Box::pin(async move {
            self.calls.chat.fetch_add(1, Ordering::SeqCst);
            let message = request.message.clone();
            self.requests.lock().unwrap().push(request);
            Self::pass_gate(&self.chat_gate).await;

            if Self::failing(&self.fail_chat) {
                return Err(failure("fake-chat"));
            }
            Ok(ChatReply {
                reply: format!("reply to {message}"),
                used_rag: Some(true),
                source: Some("rag".to_string()),
                mode: Some("forced_rag".to_string()),
                response_time: Some(0.01),
            })
        })
    }

    fn upload_file<'a>(&'a self, payload: UploadPayload) -> BoxFuture<'a, ApiResult<UploadReceipt>> {
        Box::pin(async move {
            self.calls.upload.fetch_add(1, Ordering::SeqCst);
            Self::pass_gate(&self.upload_gate).await;

            if Self::failing(&self.fail_upload) {
                return Err(failure("fake-upload"));
            }

            let mut files = self.files.lock().unwrap();
            let status = if files.iter().any(|file| file.filename == payload.filename) {
                "duplicate"
            } else {
                files.push(FileRecord::new(payload.filename.clone()));
                "success"
            };
            Ok(UploadReceipt {
                status: status.to_string(),
                filename: Some(payload.filename),
                message: None,
            })
        })
    }

    fn delete_file<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, ApiResult<Ack>> {
        Box::pin(async move {
            self.calls.delete.fetch_add(1, Ordering::SeqCst);
            if Self::failing(&self.fail_delete) {
                return Err(failure("fake-delete"));
            }

            let mut files = self.files.lock().unwrap();
            let before = files.len();
            files.retain(|file| file.filename != filename);
            if files.len() == before {
                return Err(NetworkError::Status {
                    stage: "fake-delete",
                    status: 404,
                    body: "not found".to_string(),
                });
            }
            Ok(Ack::default())
        })
    }

    fn list_files<'a>(&'a self) -> BoxFuture<'a, ApiResult<FileListing>> {
        Box::pin(async move {
            self.calls.list.fetch_add(1, Ordering::SeqCst);
            Self::pass_gate(&self.list_gate).await;
            if Self::failing(&self.fail_list) {
                return Err(failure("fake-list"));
            }

            let files = self.files.lock().unwrap().clone();
            Ok(FileListing {
                total_count: Some(files.len()),
                files,
            })
        })
    }

    fn rag_status<'a>(&'a self) -> BoxFuture<'a, ApiResult<RagStatus>> {
        Box::pin(async move {
            self.calls.status.fetch_add(1, Ordering::SeqCst);
            if Self::failing(&self.fail_status) {
                return Err(failure("fake-status"));
            }

            Ok(RagStatus {
                initialized: self.rag_initialized.load(Ordering::SeqCst),
                file_count: self.files.lock().unwrap().len(),
            })
        })
    }

    fn reinitialize_rag<'a>(&'a self) -> BoxFuture<'a, ApiResult<Ack>> {
        Box::pin(async move {
            self.calls.reinitialize.fetch_add(1, Ordering::SeqCst);
            if Self::failing(&self.fail_reinitialize) {
                return Err(failure("fake-reinitialize"));
            }
            self.rag_initialized.store(true, Ordering::SeqCst);
            Ok(Ack::default())
        })
    }

    fn system_status<'a>(&'a self) -> BoxFuture<'a, ApiResult<SystemStatus>> {
        Box::pin(async move {
            let files = self.files.lock().unwrap().len();
            Ok(SystemStatus {
                rag_initialized: self.rag_initialized.load(Ordering::SeqCst),
                total_files: files,
                system_status: "healthy".to_string(),
                mode: "rag".to_string(),
                model: "fake".to_string(),
            })
        })
    }
}
