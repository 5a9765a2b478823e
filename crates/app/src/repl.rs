//! Line-oriented terminal front-end over the chat session and file view.
use std::path::PathBuf;

use ragdesk_api::{FileRecord, RagStatus, SystemStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::chat::{ChatSessionState, Message, Sender, SubmitRejection};
use crate::files::FileRepositoryState;

pub const HELP_TEXT: &str = "\
Type a message to chat. Commands:
  /upload <path>      upload a .pdf, .txt, .docx or .doc document
  /delete <filename>  delete a stored document (asks for confirmation)
  /files              show the known documents
  /status             show RAG indexing status
  /system             show backend system status
  /refresh            reload documents and status
  /reinit             rebuild the RAG index
  /help               show this help
  /quit               exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Chat(String),
    Upload(PathBuf),
    Delete(String),
    Files,
    Status,
    System,
    Refresh,
    Reinitialize,
    Help,
    Quit,
    /// A slash command that is unknown or missing its argument.
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return Command::Chat(line.to_string());
    };

    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (command, ""),
    };

    match (name, argument) {
        ("upload", "") => Command::Invalid("usage: /upload <path>".to_string()),
        ("upload", path) => Command::Upload(PathBuf::from(path)),
        ("delete", "") => Command::Invalid("usage: /delete <filename>".to_string()),
        ("delete", filename) => Command::Delete(filename.to_string()),
        ("files", _) => Command::Files,
        ("status", _) => Command::Status,
        ("system", _) => Command::System,
        ("refresh", _) => Command::Refresh,
        ("reinit" | "reinitialize", _) => Command::Reinitialize,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit" | "q", _) => Command::Quit,
        (other, _) => Command::Invalid(format!("unknown command '/{other}', try /help")),
    }
}

/// Only an explicit yes confirms a deletion.
pub fn confirms(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn format_message(message: &Message) -> String {
    let time = message.created_at().format("%H:%M:%S");
    match (message.sender(), message.is_error()) {
        (Sender::User, _) => format!("[{time}] you> {}", message.text()),
        (Sender::Bot, false) => format!("[{time}] bot> {}", message.text()),
        (Sender::Bot, true) => format!("[{time}] bot!> {}", message.text()),
    }
}

pub fn describe_rejection(reason: SubmitRejection) -> &'static str {
    match reason {
        SubmitRejection::EmptyInput => "nothing to send",
        SubmitRejection::AwaitingReply => "still waiting for the previous reply, message not sent",
    }
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn format_file(file: &FileRecord) -> String {
    let metadata = file.metadata.as_ref();
    let size = metadata
        .and_then(|metadata| metadata.size)
        .map(format_size);
    let file_type = metadata.and_then(|metadata| metadata.file_type.as_deref());

    match (size, file_type) {
        (Some(size), Some(file_type)) => format!("  {} ({size}, {file_type})", file.filename),
        (Some(size), None) => format!("  {} ({size})", file.filename),
        (None, Some(file_type)) => format!("  {} ({file_type})", file.filename),
        (None, None) => format!("  {}", file.filename),
    }
}

pub fn format_rag_status(status: &RagStatus) -> String {
    let state = if status.initialized {
        "ready"
    } else {
        "not initialized"
    };
    format!("RAG {state}, {} indexed file(s)", status.file_count)
}

pub fn format_repository(state: &FileRepositoryState) -> String {
    let mut lines = vec![format!("documents ({}):", state.files.len())];
    if state.files.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(state.files.iter().map(format_file));
    lines.push(format_rag_status(&state.rag_status));
    if state.uploading {
        lines.push("upload in progress...".to_string());
    }
    lines.join("\n")
}

pub fn format_system_status(status: &SystemStatus) -> String {
    format!(
        "system {} (mode {}, model {}), RAG {}, {} file(s)",
        status.system_status,
        status.mode,
        status.model,
        if status.rag_initialized {
            "ready"
        } else {
            "not initialized"
        },
        status.total_files
    )
}

/// Prints every transcript entry appended after the subscription started.
pub fn spawn_transcript_printer(mut updates: watch::Receiver<ChatSessionState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut printed = updates.borrow_and_update().messages.len();
        while updates.changed().await.is_ok() {
            let lines = {
                let state = updates.borrow_and_update();
                let lines = state.messages[printed..]
                    .iter()
                    .map(format_message)
                    .collect::<Vec<_>>();
                printed = state.messages.len();
                lines
            };
            for line in lines {
                println!("{line}");
            }
        }
    })
}

/// Prints the repository whenever its listing or RAG status changes.
pub fn spawn_repository_printer(
    mut updates: watch::Receiver<FileRepositoryState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_shown = {
            let state = updates.borrow_and_update();
            (state.files.clone(), state.rag_status)
        };
        while updates.changed().await.is_ok() {
            let rendered = {
                let state = updates.borrow_and_update();
                let current = (state.files.clone(), state.rag_status);
                if current == last_shown {
                    None
                } else {
                    last_shown = current;
                    Some(format_repository(&state))
                }
            };
            if let Some(rendered) = rendered {
                println!("{rendered}");
            }
        }
    })
}
