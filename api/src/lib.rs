//! HTTP surface of the document Q&A backend.
//!
//! Routes:
//! - `GET /health` model endpoints and document store reachability
//! - `GET /files`, `POST /files` (multipart `file`), `DELETE /files/{name}`
//! - `POST /ask` question over a selection of uploaded files
//! - `GET /history?files=a,b` chat history of a selection

pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tokio::signal;
use tracing::{info, warn};

use crate::{
    core::{app_config::AppConfig, app_state::AppState, orphan_cleanup::cleanup_orphans},
    error_handler::AppError,
    middleware_layer::json_extractor::json_error_mapper,
    routes::{
        ask::ask_question_route::ask_question,
        files::files_route::{delete_file, list_files, upload_file},
        health::health_route::health,
        history::history_route::chat_history,
    },
};

/// Loads config, removes orphaned chunks and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let cfg = AppConfig::from_env()?;
    let state = Arc::new(AppState::from_config(&cfg)?);

    let active = state.sessions.active_file_names().await;
    let removed = cleanup_orphans(state.store.as_ref(), &active).await;
    if !removed.is_empty() {
        info!(files = removed.len(), "orphaned files removed at startup");
    }

    let listener = tokio::net::TcpListener::bind(&cfg.api_address)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %cfg.api_address, "listening");

    axum::serve(listener, router(state, cfg.max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)
}

/// Builds the application router over shared state.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/files", get(list_files).post(upload_file))
        .route("/files/{name}", delete(delete_file))
        .route("/ask", post(ask_question))
        .route("/history", get(chat_history))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; shutdown only by termination");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::ModelTask;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use doc_ingest::{Ingestor, RecursiveSplitter};
    use qa_flow::{CorrectiveRag, FlowConfig, FlowError, FlowFuture, StoreRetriever, TextGenerator};
    use crate::core::session_registry::FileStatus;
    use rag_store::memory::InMemoryStore;
    use rag_store::{Chunk, ChunkHit, ChunkStore, StoreFuture};
    use serde_json::Value;
    use std::collections::BTreeSet;
    use std::io::Write;
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tower::ServiceExt;
    use zip::write::SimpleFileOptions;

    /// Answers every question the same way and always judges it relevant.
    struct CannedModels;

    impl TextGenerator for CannedModels {
        fn generate<'a>(&'a self, task: ModelTask, _prompt: &'a str) -> FlowFuture<'a, String> {
            let reply = match task {
                ModelTask::Answer => "- Refunds are issued within 30 days",
                ModelTask::Judge => "8",
                ModelTask::Rewrite => "refund policy",
            };
            Box::pin(async move { Ok::<_, FlowError>(reply.to_string()) })
        }
    }

    /// Holds every write until a permit is released.
    struct GatedStore {
        inner: Arc<InMemoryStore>,
        gate: Arc<Semaphore>,
    }

    impl ChunkStore for GatedStore {
        fn store(&self, chunks: Vec<Chunk>) -> StoreFuture<'_, usize> {
            Box::pin(async move {
                let _permit = self.gate.acquire().await.unwrap();
                self.inner.store(chunks).await
            })
        }

        fn search<'a>(
            &'a self,
            query: &'a str,
            k: usize,
            file_names: &'a [String],
        ) -> StoreFuture<'a, Vec<ChunkHit>> {
            self.inner.search(query, k, file_names)
        }

        fn delete_file<'a>(&'a self, file_name: &'a str) -> StoreFuture<'a, u64> {
            self.inner.delete_file(file_name)
        }

        fn list_file_names(&self) -> StoreFuture<'_, BTreeSet<String>> {
            self.inner.list_file_names()
        }
    }

    fn test_state() -> (Arc<AppState>, Arc<InMemoryStore>) {
        let memory = Arc::new(InMemoryStore::with_keyword_embedder());
        (state_over(memory.clone()), memory)
    }

    fn state_over(store: Arc<dyn ChunkStore>) -> Arc<AppState> {
        let rag = CorrectiveRag::new(
            Arc::new(StoreRetriever::new(store.clone())),
            Arc::new(CannedModels),
            FlowConfig::default(),
        );
        let ingestor = Ingestor::new(store.clone(), RecursiveSplitter::default());
        Arc::new(AppState::new(store, ingestor, rag))
    }

    async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
        let res: Response = router(state.clone(), 10 * 1024 * 1024)
            .oneshot(req)
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn pptx_bytes(slides: &[&str]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (i, text) in slides.iter().enumerate() {
            zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), SimpleFileOptions::default())
                .unwrap();
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
            );
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn upload(file_name: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "docqa-test-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/files")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn upload_ask_history_delete_round_trip() {
        let (state, memory) = test_state();
        let deck = pptx_bytes(&["Refunds are issued within 30 days", "Contact support"]);

        let (status, body) = send(&state, upload("Policies.pptx", &deck)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["data"]["file_name"], "Policies.pptx");
        assert_eq!(body["data"]["sections"], 2);

        let (_, body) = send(&state, get_req("/files")).await;
        assert_eq!(body["data"]["files"][0]["status"], "ready");

        let (status, body) = send(
            &state,
            json_post("/ask", r#"{"question":"What is the refund policy?","files":["Policies.pptx"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["outcome"], "accepted");
        assert_eq!(body["data"]["relevance_score"], 8);
        assert_eq!(body["data"]["answer"], "- Refunds are issued within 30 days");

        let (_, body) = send(&state, get_req("/history?files=Policies.pptx")).await;
        let messages = body["data"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "What is the refund policy?");

        let del = Request::builder()
            .method("DELETE")
            .uri("/files/Policies.pptx")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, del).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["data"]["deleted_chunks"].as_u64().unwrap() >= 2);

        assert!(memory.is_empty().await);
        assert!(state.sessions.files().await.is_empty());
        let (_, body) = send(&state, get_req("/history?files=Policies.pptx")).await;
        assert!(body["data"]["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_unsupported_and_duplicate_uploads() {
        let (state, _) = test_state();

        let (status, body) = send(&state, upload("notes.docx", b"hello")).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_FILE_TYPE");
        assert!(state.sessions.files().await.is_empty());

        let deck = pptx_bytes(&["Slide"]);
        let (status, _) = send(&state, upload("deck.pptx", &deck)).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&state, upload("deck.pptx", &deck)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn unreadable_upload_leaves_no_trace() {
        let (state, memory) = test_state();
        let (status, body) = send(&state, upload("broken.pptx", b"not a zip")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert_eq!(body["error"]["code"], "UNREADABLE_DOCUMENT");
        assert!(state.sessions.files().await.is_empty());
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn ask_validates_selection() {
        let (state, _) = test_state();

        let (status, body) = send(&state, json_post("/ask", r#"{"question":"q","files":[]}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "NO_FILES_SELECTED");

        let (status, _) =
            send(&state, json_post("/ask", r#"{"question":"q","files":["missing.pdf"]}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&state, json_post("/ask", r#"{"question":"q"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["details"][0]["path"], "files");
    }

    #[tokio::test]
    async fn history_needs_files_and_health_reports_store() {
        let (state, _) = test_state();
        let (status, _) = send(&state, get_req("/history?files=,")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&state, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["store"]["files"], 0);
    }

    #[tokio::test]
    async fn dropped_upload_still_settles_its_file() {
        let memory = Arc::new(InMemoryStore::with_keyword_embedder());
        let gate = Arc::new(Semaphore::new(0));
        let state = state_over(Arc::new(GatedStore {
            inner: memory.clone(),
            gate: gate.clone(),
        }));
        let deck = pptx_bytes(&["Refunds are issued within 30 days"]);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(200), send(&state, upload("deck.pptx", &deck)))
                .await;
        assert!(cancelled.is_err(), "upload should still be waiting on the store");
        assert_eq!(state.sessions.status("deck.pptx").await, Some(FileStatus::Ingesting));

        gate.add_permits(1);
        for _ in 0..200 {
            if state.sessions.status("deck.pptx").await == Some(FileStatus::Ready) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.sessions.status("deck.pptx").await, Some(FileStatus::Ready));

        let del = Request::builder()
            .method("DELETE")
            .uri("/files/deck.pptx")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, del).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(memory.is_empty().await);

        let (status, body) = send(&state, upload("deck.pptx", &deck)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
}
