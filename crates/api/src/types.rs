use serde::{Deserialize, Serialize};

/// Status code the backend uses for an upload it already holds.
pub const DUPLICATE_UPLOAD_STATUS: &str = "duplicate";

/// How a chat request asks the backend to use retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RagMode {
    /// Always ground the reply in indexed documents.
    #[default]
    Forced,
    /// Never use retrieval.
    Disabled,
    /// Let the backend decide per message.
    Auto,
}

impl RagMode {
    /// Wire value of the `use_rag` field. `None` omits the field.
    pub fn use_rag(self) -> Option<bool> {
        match self {
            Self::Forced => Some(true),
            Self::Disabled => Some(false),
            Self::Auto => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_rag: Option<bool>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, mode: RagMode) -> Self {
        Self {
            message: message.into(),
            use_rag: mode.use_rag(),
        }
    }
}

/// Reply to one chat turn. Everything except `reply` is backend diagnostics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub used_rag: Option<bool>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub response_time: Option<f64>,
}

/// One document to upload as the multipart `file` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl UploadPayload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Backend answer to an upload. `status` is an opaque outcome code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub status: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadReceipt {
    pub fn is_duplicate(&self) -> bool {
        self.status == DUPLICATE_UPLOAD_STATUS
    }
}

/// Acknowledgement body for delete and reinitialize calls.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub upload_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    #[serde(default)]
    pub metadata: Option<FileMetadata>,
}

impl FileRecord {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: FileMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileListing {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub total_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RagStatus {
    #[serde(rename = "rag_initialized")]
    pub initialized: bool,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SystemStatus {
    pub rag_initialized: bool,
    pub total_files: usize,
    pub system_status: String,
    pub mode: String,
    pub model: String,
}
