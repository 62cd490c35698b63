//! Route handlers for the SupportChat API.

use axum::extract::multipart::Multipart;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use supportchat_chat::ChatReply;
use supportchat_core::types::{ChatSession, Document};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// JSON body for `POST /api/documents`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateDocumentRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// JSON body for `POST /api/chat`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub document_count: u64,
}

// =============================================================================
// Service endpoints
// =============================================================================

/// GET / - liveness banner.
pub async fn root() -> &'static str {
    "AI Support Chat API is running"
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let document_count = state.chat.document_count()?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        document_count,
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

// =============================================================================
// Documents
// =============================================================================

/// GET /api/documents - all documents, newest first.
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.chat.list_documents()?))
}

/// POST /api/documents - create a document from JSON or a multipart form.
///
/// Multipart accepts `title`, `content` and an optional UTF-8 `file` whose
/// text replaces `content`; the file name stands in for a missing title.
pub async fn create_document(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let body = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_document_form(multipart).await?
    } else {
        let payload: Result<Json<CreateDocumentRequest>, JsonRejection> =
            Json::from_request(request, &state).await;
        payload?.0
    };

    let title = body.title.unwrap_or_default();
    let content = body.content.unwrap_or_default();
    let doc = state.chat.create_document(&title, &content)?;

    Ok((StatusCode::CREATED, Json(doc)))
}

async fn read_document_form(mut multipart: Multipart) -> Result<CreateDocumentRequest, ApiError> {
    let mut title = None;
    let mut content = None;
    let mut file_text = None;
    let mut file_name = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => title = Some(field.text().await?),
            Some("content") => content = Some(field.text().await?),
            Some("file") => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    ApiError::BadRequest("Uploaded file must be UTF-8 text".to_string())
                })?;
                file_text = Some(text);
            }
            other => debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    let title = match title {
        Some(t) if !t.trim().is_empty() => Some(t),
        _ => file_name,
    };

    Ok(CreateDocumentRequest {
        title,
        content: file_text.or(content),
    })
}

/// DELETE /api/documents/{id} - delete a document.
///
/// Unknown ids answer the same as existing ones.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.chat.delete_document(&id)?;
    Ok(Json(MessageResponse {
        message: "Document deleted".to_string(),
    }))
}

// =============================================================================
// Chat
// =============================================================================

/// GET /api/chat/{session_id} - load a session, creating it if absent.
pub async fn get_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatSession>, ApiError> {
    Ok(Json(state.chat.get_or_create_session(&session_id)?))
}

/// POST /api/chat - answer a message and persist both turns.
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = payload?;
    let session_id = body.session_id.unwrap_or_default();
    let message = body.message.unwrap_or_default();

    let reply = state.chat.handle_message(&session_id, &message).await?;
    Ok(Json(reply))
}
