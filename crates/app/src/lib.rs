#![deny(unsafe_code)]

//! Chat and document-management client for a RAG backend.
//!
//! The crate keeps local state for two independent components, a chat
//! session and a file repository view, in sync with the remote service.
pub mod app;
/// Chat transcript and single-flight turn handling.
pub mod chat;
/// Uploaded documents and RAG indexing status.
pub mod files;
/// Terminal rendering and command parsing.
pub mod repl;
/// Settings persistence.
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;
