use crate::api_error::ApiError;
use crate::payloads::{ChatPayload, LanguagePayload, NotesPayload};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tutor_pipeline::file_normalizer::guess_mime_type;
use tutor_pipeline::{Language, Session, SessionView, UploadedFile};

/// Uploads are whole images and PDFs.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn router(session: Arc<Session>) -> Router {
    Router::new()
        .route("/session", get(get_session))
        .route("/files", post(upload_files))
        .route("/files/:index", delete(remove_file))
        .route("/notes", put(set_notes))
        .route("/language", put(set_language))
        .route("/analyze", post(analyze))
        .route("/questions/:index/explain", post(explain_question))
        .route("/chat", post(send_message))
        .route("/slides", post(generate_slides).delete(close_slides))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(session)
}

/// Session work runs on its own task so a dropped connection cannot leave
/// the session stuck mid-transition.
async fn run_detached<T, F>(work: F) -> Result<T, ApiError>
where
    F: Future<Output = tutor_pipeline::error::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            log::error!("Session task failed: {}", e);
            Err(ApiError::internal("session task failed"))
        }
    }
}

async fn get_session(State(session): State<Arc<Session>>) -> Json<SessionView> {
    Json(session.view().await)
}

async fn upload_files(
    State(session): State<Arc<Session>>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}", files.len() + 1));
        let mime_type = field
            .content_type()
            .filter(|m| !m.is_empty() && *m != "application/octet-stream")
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime_type(&name).to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read {}: {}", name, e)))?;

        log::info!("Received {} ({}, {} bytes)", name, mime_type, bytes.len());
        files.push(UploadedFile::new(name, mime_type, bytes.to_vec()));
    }

    session.add_files(files).await;
    Ok(Json(session.view().await))
}

async fn remove_file(
    State(session): State<Arc<Session>>,
    Path(index): Path<usize>,
) -> Result<Json<SessionView>, ApiError> {
    session.remove_file(index).await?;
    Ok(Json(session.view().await))
}

async fn set_notes(
    State(session): State<Arc<Session>>,
    Json(payload): Json<NotesPayload>,
) -> Json<SessionView> {
    session.set_notes(payload.notes).await;
    Json(session.view().await)
}

async fn set_language(
    State(session): State<Arc<Session>>,
    Json(payload): Json<LanguagePayload>,
) -> Result<Json<SessionView>, ApiError> {
    let language = Language::parse(&payload.language)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown language: {}", payload.language)))?;
    session.set_language(language).await;
    Ok(Json(session.view().await))
}

async fn analyze(State(session): State<Arc<Session>>) -> Result<Json<SessionView>, ApiError> {
    let worker = session.clone();
    run_detached(async move { worker.analyze().await }).await?;
    Ok(Json(session.view().await))
}

async fn explain_question(
    State(session): State<Arc<Session>>,
    Path(index): Path<usize>,
) -> Result<Json<SessionView>, ApiError> {
    let worker = session.clone();
    run_detached(async move { worker.explain_question(index).await }).await?;
    Ok(Json(session.view().await))
}

async fn send_message(
    State(session): State<Arc<Session>>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<SessionView>, ApiError> {
    let worker = session.clone();
    run_detached(async move { worker.send_message(payload.message).await }).await?;
    Ok(Json(session.view().await))
}

async fn generate_slides(
    State(session): State<Arc<Session>>,
) -> Result<Json<SessionView>, ApiError> {
    let worker = session.clone();
    run_detached(async move { worker.generate_slides().await }).await?;
    Ok(Json(session.view().await))
}

async fn close_slides(State(session): State<Arc<Session>>) -> Json<SessionView> {
    session.close_slides().await;
    Json(session.view().await)
}
