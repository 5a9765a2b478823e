//! Typed client for the RAG chat backend.
use std::sync::Arc;

mod backend;
mod error;
mod http;
mod types;

pub use backend::{BoxFuture, RagBackend};
pub use error::{ApiResult, NetworkError};
pub use http::{BackendConfig, DEFAULT_BASE_URL, HttpRagBackend, UPLOAD_FIELD_NAME};
pub use types::{
    Ack, ChatReply, ChatRequest, DUPLICATE_UPLOAD_STATUS, FileListing, FileMetadata, FileRecord,
    RagMode, RagStatus, SystemStatus, UploadPayload, UploadReceipt,
};

pub fn create_backend(config: BackendConfig) -> ApiResult<Arc<dyn RagBackend>> {
    tracing::info!("using RAG backend at {}", config.base_url);
    Ok(Arc::new(HttpRagBackend::new(config)?))
}
