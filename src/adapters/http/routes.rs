//! Operator HTTP API: read the archive, manage the command table, send on demand.
//!
//! JSON in and out. Zero changed rows on mutation is a success; only the
//! single-record fetch returns 404. Error bodies are always {"error": "..."}.

use crate::domain::{AnalyticsSummary, CommandRecord, DomainError, MessageRecord, UserRecord};
use crate::ports::{OutboundSink, StorePort};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Messages endpoint cap: the most recent rows only, no pagination beyond it.
const MESSAGE_LIST_LIMIT: u32 = 200;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn StorePort>,
    /// Absent when no bot token is configured; send requests then fail with 503.
    pub sink: Option<Arc<dyn OutboundSink>>,
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Caller-visible error: domain error kind mapped to an HTTP status.
#[derive(Debug)]
pub struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::SinkUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Send(_) => StatusCode::BAD_GATEWAY,
            DomainError::Storage(_) | DomainError::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self.0, "control API request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/messages", get(list_messages))
        .route("/api/messages/{id}", get(get_message))
        .route("/api/users", get(list_users))
        .route("/api/commands", get(list_commands).post(create_command))
        .route(
            "/api/commands/{id}",
            put(update_command).delete(delete_command),
        )
        .route("/api/send", post(send_message))
        .route("/api/analytics", get(analytics))
        .with_state(state)
}

async fn list_messages(
    State(state): State<ApiState>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    Ok(Json(state.store.list_messages(MESSAGE_LIST_LIMIT).await?))
}

async fn get_message(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageRecord>, ApiError> {
    match state.store.get_message(id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(DomainError::NotFound("Not found".into()).into()),
    }
}

async fn list_users(State(state): State<ApiState>) -> Result<Json<Vec<UserRecord>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

async fn list_commands(
    State(state): State<ApiState>,
) -> Result<Json<Vec<CommandRecord>>, ApiError> {
    Ok(Json(state.store.list_commands().await?))
}

#[derive(Debug, Deserialize)]
struct CreateCommandBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Serialize)]
struct IdBody {
    id: i64,
}

async fn create_command(
    State(state): State<ApiState>,
    Json(body): Json<CreateCommandBody>,
) -> Result<Json<IdBody>, ApiError> {
    let id = state
        .store
        .create_command(
            body.name.as_deref().unwrap_or(""),
            body.description.as_deref(),
            body.response.as_deref(),
        )
        .await?;
    Ok(Json(IdBody { id }))
}

#[derive(Debug, Deserialize)]
struct UpdateCommandBody {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChangesBody {
    changes: u64,
}

async fn update_command(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCommandBody>,
) -> Result<Json<ChangesBody>, ApiError> {
    let changes = state
        .store
        .update_command(
            id,
            &body.name,
            body.description.as_deref(),
            body.response.as_deref(),
        )
        .await?;
    Ok(Json(ChangesBody { changes }))
}

async fn delete_command(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<ChangesBody>, ApiError> {
    let changes = state.store.delete_command(id).await?;
    Ok(Json(ChangesBody { changes }))
}

#[derive(Debug, Deserialize)]
struct SendBody {
    #[serde(default)]
    chat_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendOkBody {
    ok: bool,
}

async fn send_message(
    State(state): State<ApiState>,
    Json(body): Json<SendBody>,
) -> Result<Json<SendOkBody>, ApiError> {
    // Validate before touching the sink: bad input must not reach the network.
    let chat_id = body.chat_id.as_deref().unwrap_or("");
    let text = body.text.as_deref().unwrap_or("");
    if chat_id.is_empty() || text.is_empty() {
        return Err(DomainError::Validation("chat_id and text required".into()).into());
    }
    let sink = state.sink.as_ref().ok_or(DomainError::SinkUnavailable)?;
    sink.send(chat_id, text).await?;
    Ok(Json(SendOkBody { ok: true }))
}

async fn analytics(State(state): State<ApiState>) -> Result<Json<AnalyticsSummary>, ApiError> {
    Ok(Json(AnalyticsSummary {
        total_messages: state.store.count_messages().await?,
        total_users: state.store.count_users().await?,
    }))
}
