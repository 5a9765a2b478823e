use std::future::Future;
use std::pin::Pin;

use crate::error::ApiResult;
use crate::types::{
    Ack, ChatReply, ChatRequest, FileListing, RagStatus, SystemStatus, UploadPayload,
    UploadReceipt,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote RAG service as seen by the client components.
///
/// Every call is single-shot: no retries, no caching, no cancellation.
pub trait RagBackend: Send + Sync {
    fn send_chat_message<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, ApiResult<ChatReply>>;
    fn upload_file<'a>(&'a self, payload: UploadPayload) -> BoxFuture<'a, ApiResult<UploadReceipt>>;
    fn delete_file<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, ApiResult<Ack>>;
    fn list_files<'a>(&'a self) -> BoxFuture<'a, ApiResult<FileListing>>;
    fn rag_status<'a>(&'a self) -> BoxFuture<'a, ApiResult<RagStatus>>;
    /// Only confirms the backend accepted the request, not that indexing finished.
    fn reinitialize_rag<'a>(&'a self) -> BoxFuture<'a, ApiResult<Ack>>;
    fn system_status<'a>(&'a self) -> BoxFuture<'a, ApiResult<SystemStatus>>;
}
