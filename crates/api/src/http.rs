use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use crate::backend::{BoxFuture, RagBackend};
use crate::error::{
    ApiResult, BuildClientSnafu, BuildRequestSnafu, DecodeSnafu, InvalidBaseUrlSnafu,
    StatusSnafu, TransportSnafu,
};
use crate::types::{
    Ack, ChatReply, ChatRequest, FileListing, RagStatus, SystemStatus, UploadPayload,
    UploadReceipt,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Multipart field name the backend reads the uploaded document from.
pub const UPLOAD_FIELD_NAME: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().to_string(),
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// `RagBackend` over the backend's JSON/HTTP surface.
pub struct HttpRagBackend {
    client: Client,
    base_url: Url,
}

impl HttpRagBackend {
    pub fn new(config: BackendConfig) -> ApiResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context(BuildClientSnafu {
            stage: "build-client",
        })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins path segments onto the base URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `parse_base_url` rejects cannot-be-a-base URLs, so this never fails.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn chat(&self, request: ChatRequest) -> ApiResult<ChatReply> {
        let url = self.endpoint(&["chat"]);
        tracing::debug!("POST {url} (use_rag={:?})", request.use_rag);

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-chat-message",
            })?;
        let reply: ChatReply = read_json(response, "read-chat-reply").await?;

        tracing::debug!(
            "chat reply received (used_rag={:?}, source={:?}, mode={:?}, response_time={:?})",
            reply.used_rag,
            reply.source,
            reply.mode,
            reply.response_time
        );
        Ok(reply)
    }

    async fn upload(&self, payload: UploadPayload) -> ApiResult<UploadReceipt> {
        let url = self.endpoint(&["upload"]);
        tracing::debug!(
            "POST {url} ({} bytes as '{}')",
            payload.bytes.len(),
            payload.filename
        );

        let mut part = Part::bytes(payload.bytes).file_name(payload.filename);
        if let Some(content_type) = payload.content_type.as_deref() {
            part = part.mime_str(content_type).context(BuildRequestSnafu {
                stage: "build-upload-part",
            })?;
        }
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .context(TransportSnafu {
                stage: "upload-file",
            })?;
        read_json(response, "read-upload-receipt").await
    }

    async fn delete(&self, filename: &str) -> ApiResult<Ack> {
        let url = self.endpoint(&["files", filename]);
        tracing::debug!("DELETE {url}");

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .context(TransportSnafu {
                stage: "delete-file",
            })?;
        read_ack(response, "read-delete-ack").await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        send_stage: &'static str,
        read_stage: &'static str,
    ) -> ApiResult<T> {
        let url = self.endpoint(segments);
        tracing::debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context(TransportSnafu { stage: send_stage })?;
        read_json(response, read_stage).await
    }

    /// Status polls decode whatever body comes back; the HTTP code alone is not a failure.
    async fn status(&self) -> ApiResult<RagStatus> {
        let url = self.endpoint(&["rag", "status"]);
        tracing::debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context(TransportSnafu {
                stage: "get-rag-status",
            })?;
        let status = response.status();
        let body = response.text().await.context(TransportSnafu {
            stage: "read-rag-status",
        })?;
        if !status.is_success() {
            tracing::warn!("RAG status answered with {status}, decoding body anyway");
        }
        serde_json::from_str(&body).context(DecodeSnafu {
            stage: "read-rag-status",
        })
    }

    /// Fire-and-forget: any HTTP response counts as accepted, only transport failures error.
    async fn reinitialize(&self) -> ApiResult<Ack> {
        let url = self.endpoint(&["rag", "reinitialize"]);
        tracing::debug!("POST {url}");

        let response = self
            .client
            .post(url)
            .send()
            .await
            .context(TransportSnafu {
                stage: "reinitialize-rag",
            })?;
        let status = response.status();
        let body = response.text().await.context(TransportSnafu {
            stage: "read-reinitialize-ack",
        })?;
        if !status.is_success() {
            tracing::warn!("RAG reinitialize answered with {status}: {body}");
        }
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

impl RagBackend for HttpRagBackend {
    fn send_chat_message<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, ApiResult<ChatReply>> {
        Box::pin(self.chat(request))
    }

    fn upload_file<'a>(&'a self, payload: UploadPayload) -> BoxFuture<'a, ApiResult<UploadReceipt>> {
        Box::pin(self.upload(payload))
    }

    fn delete_file<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, ApiResult<Ack>> {
        Box::pin(self.delete(filename))
    }

    fn list_files<'a>(&'a self) -> BoxFuture<'a, ApiResult<FileListing>> {
        Box::pin(self.get(&["files"], "list-files", "read-file-listing"))
    }

    fn rag_status<'a>(&'a self) -> BoxFuture<'a, ApiResult<RagStatus>> {
        Box::pin(self.status())
    }

    fn reinitialize_rag<'a>(&'a self) -> BoxFuture<'a, ApiResult<Ack>> {
        Box::pin(self.reinitialize())
    }

    fn system_status<'a>(&'a self) -> BoxFuture<'a, ApiResult<SystemStatus>> {
        Box::pin(self.get(
            &["system", "status"],
            "get-system-status",
            "read-system-status",
        ))
    }
}

fn parse_base_url(raw: &str) -> ApiResult<Url> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|error| {
        InvalidBaseUrlSnafu {
            stage: "parse-base-url",
            base_url: raw.to_string(),
            details: error.to_string(),
        }
        .build()
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return InvalidBaseUrlSnafu {
            stage: "validate-base-url",
            base_url: raw.to_string(),
            details: "expected an http or https URL".to_string(),
        }
        .fail();
    }

    Ok(url)
}

/// Reads the body, rejecting any non-2xx status before decoding.
async fn read_body(response: Response, stage: &'static str) -> ApiResult<String> {
    let status = response.status();
    let body = response.text().await.context(TransportSnafu { stage })?;

    if !status.is_success() {
        return StatusSnafu {
            stage,
            status: status.as_u16(),
            body,
        }
        .fail();
    }

    Ok(body)
}

async fn read_json<T: DeserializeOwned>(response: Response, stage: &'static str) -> ApiResult<T> {
    let body = read_body(response, stage).await?;
    serde_json::from_str(&body).context(DecodeSnafu { stage })
}

async fn read_ack(response: Response, stage: &'static str) -> ApiResult<Ack> {
    let body = read_body(response, stage).await?;
    if body.trim().is_empty() {
        return Ok(Ack::default());
    }
    serde_json::from_str(&body).context(DecodeSnafu { stage })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Multipart, Path, State};
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::error::NetworkError;
    use crate::types::RagMode;

    #[derive(Clone, Default)]
    struct Recorded {
        chat_bodies: Arc<Mutex<Vec<Value>>>,
        deleted: Arc<Mutex<Vec<String>>>,
        uploads: Arc<Mutex<Vec<(String, Option<String>, Vec<u8>)>>>,
    }

    async fn chat(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
        let message = body["message"].as_str().unwrap_or_default().to_string();
        recorded.chat_bodies.lock().unwrap().push(body);
        Json(json!({
            "reply": format!("echo: {message}"),
            "used_rag": true,
            "source": "rag",
            "mode": "forced_rag",
            "response_time": 0.12
        }))
    }

    async fn upload(State(recorded): State<Recorded>, mut multipart: Multipart) -> Json<Value> {
        let mut filename = String::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap().to_vec();
            recorded
                .uploads
                .lock()
                .unwrap()
                .push((name, Some(filename.clone()), bytes));
        }
        let status = if filename == "seen.pdf" {
            "duplicate"
        } else {
            "success"
        };
        Json(json!({"status": status, "filename": filename, "message": "stored"}))
    }

    async fn delete_file(
        State(recorded): State<Recorded>,
        Path(filename): Path<String>,
    ) -> Result<Json<Value>, StatusCode> {
        if filename == "missing.pdf" {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        recorded.deleted.lock().unwrap().push(filename);
        Ok(Json(json!({"message": "deleted"})))
    }

    async fn files() -> Json<Value> {
        Json(json!({
            "files": [{"filename": "report.pdf", "metadata": {"size": 2048, "file_type": "application/pdf"}}],
            "total_count": 1
        }))
    }

    async fn rag_status() -> Json<Value> {
        Json(json!({"rag_initialized": true, "file_count": 1}))
    }

    async fn reinitialize() -> &'static str {
        ""
    }

    async fn system_status() -> (StatusCode, &'static str) {
        (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance")
    }

    async fn spawn_backend(prefix: &str) -> (HttpRagBackend, Recorded) {
        let recorded = Recorded::default();
        let routes = Router::new()
            .route("/chat", post(chat))
            .route("/upload", post(upload))
            .route("/files", get(files))
            .route("/files/{filename}", delete(delete_file))
            .route("/rag/status", get(rag_status))
            .route("/rag/reinitialize", post(reinitialize))
            .route("/system/status", get(system_status))
            .with_state(recorded.clone());
        let router = if prefix.is_empty() {
            routes
        } else {
            Router::new().nest(prefix, routes)
        };

        let address = serve(router).await;
        let backend =
            HttpRagBackend::new(BackendConfig::new(format!("http://{address}{prefix}/"))).unwrap();
        (backend, recorded)
    }

    async fn serve(router: Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        address
    }

    #[tokio::test]
    async fn chat_posts_message_and_decodes_reply() {
        let (backend, recorded) = spawn_backend("").await;

        let reply = backend
            .send_chat_message(ChatRequest::new("Hello", RagMode::Forced))
            .await
            .unwrap();

        assert_eq!(reply.reply, "echo: Hello");
        assert_eq!(reply.used_rag, Some(true));
        assert_eq!(
            recorded.chat_bodies.lock().unwrap().as_slice(),
            &[json!({"message": "Hello", "use_rag": true})]
        );
    }

    #[tokio::test]
    async fn upload_sends_single_file_field() {
        let (backend, recorded) = spawn_backend("").await;

        let receipt = backend
            .upload_file(
                UploadPayload::new("report.pdf", b"%PDF-1.4".to_vec())
                    .with_content_type("application/pdf"),
            )
            .await
            .unwrap();
        assert!(!receipt.is_duplicate());
        assert_eq!(receipt.filename.as_deref(), Some("report.pdf"));

        let duplicate = backend
            .upload_file(UploadPayload::new("seen.pdf", b"x".to_vec()))
            .await
            .unwrap();
        assert!(duplicate.is_duplicate());

        let uploads = recorded.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].0, UPLOAD_FIELD_NAME);
        assert_eq!(uploads[0].1.as_deref(), Some("report.pdf"));
        assert_eq!(uploads[0].2, b"%PDF-1.4".to_vec());
    }

    #[tokio::test]
    async fn delete_encodes_filename_as_one_segment() {
        let (backend, recorded) = spawn_backend("").await;

        backend.delete_file("q3 report/final.pdf").await.unwrap();

        assert_eq!(
            recorded.deleted.lock().unwrap().as_slice(),
            &["q3 report/final.pdf".to_string()]
        );
    }

    #[tokio::test]
    async fn non_success_status_is_a_network_error() {
        let (backend, _) = spawn_backend("").await;

        let error = backend.delete_file("missing.pdf").await.unwrap_err();
        assert!(matches!(error, NetworkError::Status { status: 500, .. }));

        let error = backend.system_status().await.unwrap_err();
        match error {
            NetworkError::Status { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "down for maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn reads_listing_status_and_empty_ack() {
        let (backend, _) = spawn_backend("/api").await;

        let listing = backend.list_files().await.unwrap();
        assert_eq!(listing.files[0].filename, "report.pdf");
        assert_eq!(
            listing.files[0].metadata.as_ref().and_then(|meta| meta.size),
            Some(2048)
        );

        let status = backend.rag_status().await.unwrap();
        assert!(status.initialized);
        assert_eq!(status.file_count, 1);

        assert_eq!(backend.reinitialize_rag().await.unwrap(), Ack::default());
    }

    #[tokio::test]
    async fn reinitialize_and_status_accept_any_http_code() {
        let router = Router::new()
            .route(
                "/rag/reinitialize",
                post(|| async {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({"message": "busy"})),
                    )
                }),
            )
            .route(
                "/rag/status",
                get(|| async {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"rag_initialized": false, "file_count": 0})),
                    )
                }),
            )
            .route(
                "/system/status",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops") }),
            );
        let address = serve(router).await;
        let backend = HttpRagBackend::new(BackendConfig::new(format!("http://{address}"))).unwrap();

        let ack = backend.reinitialize_rag().await.unwrap();
        assert_eq!(ack.message.as_deref(), Some("busy"));

        let status = backend.rag_status().await.unwrap();
        assert_eq!(status, RagStatus::default());

        // Other endpoints still reject non-2xx codes.
        let error = backend.system_status().await.unwrap_err();
        assert!(matches!(error, NetworkError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn undecodable_status_body_is_an_error() {
        let router = Router::new().route(
            "/rag/status",
            get(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }),
        );
        let address = serve(router).await;
        let backend = HttpRagBackend::new(BackendConfig::new(format!("http://{address}"))).unwrap();

        let error = backend.rag_status().await.unwrap_err();
        assert!(matches!(error, NetworkError::Decode { .. }));
        assert_eq!(error.stage(), "read-rag-status");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpRagBackend::new(BackendConfig::new(format!("http://{address}"))).unwrap();
        let error = backend.list_files().await.unwrap_err();

        assert!(matches!(error, NetworkError::Transport { .. }));
        assert_eq!(error.stage(), "list-files");
    }

    #[test]
    fn rejects_unusable_base_urls() {
        for raw in ["", "localhost:8000", "mailto:someone@example.com", "ftp://host/"] {
            assert!(
                HttpRagBackend::new(BackendConfig::new(raw)).is_err(),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let backend = HttpRagBackend::new(BackendConfig::new("http://localhost:8000/api")).unwrap();
        assert_eq!(
            backend.endpoint(&["rag", "status"]).as_str(),
            "http://localhost:8000/api/rag/status"
        );

        let backend = HttpRagBackend::new(BackendConfig::default()).unwrap();
        assert_eq!(
            backend.endpoint(&["files", "a b.pdf"]).as_str(),
            "http://localhost:8000/files/a%20b.pdf"
        );
    }
}
