use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ragdesk::app::App;
use ragdesk::chat::SubmitOutcome;
use ragdesk::files::{
    ACCEPTED_UPLOAD_EXTENSIONS, DeleteOutcome, FileRepositoryView, ReinitializeOutcome,
    UploadOutcome, content_type_for, is_accepted_upload,
};
use ragdesk::repl::{self, Command};
use ragdesk::settings::{ClientSettings, SettingsStore};
use ragdesk_api::{RagMode, UploadPayload};
use snafu::{ResultExt, Whatever};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RagModeArg {
    Forced,
    Disabled,
    Auto,
}

impl From<RagModeArg> for RagMode {
    fn from(value: RagModeArg) -> Self {
        match value {
            RagModeArg::Forced => RagMode::Forced,
            RagModeArg::Disabled => RagMode::Disabled,
            RagModeArg::Auto => RagMode::Auto,
        }
    }
}

/// Chat with a RAG backend and manage the documents it indexes.
#[derive(Debug, Parser)]
#[command(name = "ragdesk", version)]
struct Cli {
    /// Backend base URL (default http://localhost:8000).
    #[arg(long)]
    base_url: Option<String>,
    /// Whether chat replies are grounded in uploaded documents.
    #[arg(long, value_enum)]
    rag_mode: Option<RagModeArg>,
    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Settings file to use instead of the per-user one.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the effective settings back to the settings file.
    #[arg(long)]
    save: bool,
}

impl Cli {
    fn apply(&self, mut settings: ClientSettings) -> ClientSettings {
        if let Some(base_url) = &self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(rag_mode) = self.rag_mode {
            settings.rag_mode = rag_mode.into();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            settings.request_timeout_secs = Some(timeout_secs);
        }
        settings.normalized()
    }
}

#[tokio::main]
async fn main() -> Result<(), Whatever> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = match &cli.config {
        Some(path) => SettingsStore::new(path.clone()),
        None => SettingsStore::load(),
    };
    let settings = cli.apply((*store.settings()).clone());
    if cli.save {
        store
            .update(settings.clone())
            .whatever_context("failed to save settings")?;
    }

    let app = App::new(&settings).whatever_context("failed to set up the backend client")?;
    let transcript = repl::spawn_transcript_printer(app.chat().subscribe());
    let repository = repl::spawn_repository_printer(app.files().subscribe());

    println!("{}", repl::HELP_TEXT);
    app.mount().await;
    let result = run(&app).await;

    transcript.abort();
    repository.abort();
    result
}

async fn run(app: &App) -> Result<(), Whatever> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .whatever_context("failed to read from stdin")?
    {
        match repl::parse_command(&line) {
            Command::Empty => {}
            Command::Chat(text) => {
                let chat = app.chat().clone();
                tokio::spawn(async move {
                    if let SubmitOutcome::Rejected(reason) = chat.submit(&text).await {
                        println!("{}", repl::describe_rejection(reason));
                    }
                });
            }
            Command::Upload(path) => spawn_upload(app.files().clone(), path),
            Command::Delete(filename) => {
                println!("delete '{filename}'? [y/N]");
                let answer = lines
                    .next_line()
                    .await
                    .whatever_context("failed to read from stdin")?;
                let confirmed = answer.as_deref().is_some_and(repl::confirms);

                let files = app.files().clone();
                tokio::spawn(async move {
                    match files.delete(&filename, |_| confirmed).await {
                        DeleteOutcome::Deleted => println!("deleted '{filename}'"),
                        DeleteOutcome::Declined => println!("kept '{filename}'"),
                        DeleteOutcome::Failed => println!("could not delete '{filename}'"),
                    }
                });
            }
            Command::Files => {
                println!("{}", repl::format_repository(&app.files().snapshot()));
            }
            Command::Status => {
                let state = app.files().snapshot();
                println!("{}", repl::format_rag_status(&state.rag_status));
            }
            Command::System => {
                let files = app.files().clone();
                tokio::spawn(async move {
                    match files.system_status().await {
                        Some(status) => println!("{}", repl::format_system_status(&status)),
                        None => println!("system status is unavailable"),
                    }
                });
            }
            Command::Refresh => {
                let files = app.files().clone();
                tokio::spawn(async move { files.refresh().await });
            }
            Command::Reinitialize => {
                let files = app.files().clone();
                tokio::spawn(async move {
                    match files.reinitialize_rag().await {
                        ReinitializeOutcome::Scheduled(_) => {
                            println!("RAG reinitialization started, status will refresh shortly")
                        }
                        ReinitializeOutcome::Failed => {
                            println!("could not start RAG reinitialization")
                        }
                    }
                });
            }
            Command::Help => println!("{}", repl::HELP_TEXT),
            Command::Quit => break,
            Command::Invalid(message) => println!("{message}"),
        }
    }

    Ok(())
}

fn spawn_upload(files: FileRepositoryView, path: PathBuf) {
    if !is_accepted_upload(&path) {
        println!(
            "only .{} documents can be uploaded",
            ACCEPTED_UPLOAD_EXTENSIONS.join(", .")
        );
        return;
    }

    tokio::spawn(async move {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::error!("failed to read {:?}: {}", path, error);
                println!("could not read {}", path.display());
                return;
            }
        };

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut payload = UploadPayload::new(filename.clone(), bytes);
        if let Some(content_type) = content_type_for(&path) {
            payload = payload.with_content_type(content_type);
        }

        match files.upload(payload).await {
            UploadOutcome::Uploaded(_) => {
                println!("uploaded '{filename}', the index is being rebuilt")
            }
            UploadOutcome::Duplicate(_) => println!("'{filename}' is already stored"),
            UploadOutcome::Failed => println!("could not upload '{filename}'"),
            UploadOutcome::Busy => println!("another upload is still running"),
        }
    });
}
