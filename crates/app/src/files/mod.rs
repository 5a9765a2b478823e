pub mod state;
pub mod view;

pub use state::{
    ACCEPTED_UPLOAD_EXTENSIONS, FileRepositoryState, content_type_for, is_accepted_upload,
};
pub use view::{
    DEFAULT_REINITIALIZE_DELAY, DeleteOutcome, FileRepositoryView, ReinitializeOutcome,
    UploadOutcome,
};
