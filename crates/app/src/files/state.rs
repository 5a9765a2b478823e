use std::path::Path;

use ragdesk_api::{FileRecord, RagStatus};

/// Extensions offered by the upload picker. Advisory only; the backend decides.
pub const ACCEPTED_UPLOAD_EXTENSIONS: &[&str] = &["pdf", "txt", "docx", "doc"];

/// Read-through snapshot of the backend's document store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileRepositoryState {
    pub files: Vec<FileRecord>,
    pub rag_status: RagStatus,
    pub uploading: bool,
}

impl FileRepositoryState {
    pub fn contains(&self, filename: &str) -> bool {
        self.files.iter().any(|file| file.filename == filename)
    }
}

pub fn is_accepted_upload(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            ACCEPTED_UPLOAD_EXTENSIONS
                .iter()
                .any(|accepted| extension.eq_ignore_ascii_case(accepted))
        })
}

/// MIME type sent with an upload, guessed from the extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "doc" => Some("application/msword"),
        _ => None,
    }
}
