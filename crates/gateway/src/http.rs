//! The chat HTTP façade: durable history, authenticated send, presence
//! queries, and deletion. Always persists before notifying.

use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode, header},
        response::IntoResponse,
    },
    serde::Deserialize,
    tracing::debug,
};

use studyhall_protocol::DEFAULT_PAGE_LIMIT;

use crate::{auth::Identity, error::ApiError, state::GatewayState};

// ── Request auth ─────────────────────────────────────────────────────────────

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the calling identity from the Authorization header.
async fn authenticate(state: &GatewayState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::MissingToken)?;
    state
        .verifier
        .verify(token)
        .await
        .map_err(|_| ApiError::InvalidToken)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// `GET /messages/{roomId}?page&limit`
pub async fn get_messages(
    State(state): State<Arc<GatewayState>>,
    Path(room_id): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&state, &headers).await?;
    let page = state
        .chat
        .get_messages(
            &room_id,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub text: String,
    #[serde(rename = "chatRoom")]
    pub chat_room: Option<String>,
}

/// `POST /messages`
pub async fn post_message(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = authenticate(&state, &headers).await?;
    let message = state
        .chat
        .send_message(&caller.user_id, &body.text, body.chat_room.as_deref())
        .await?;
    Ok(Json(serde_json::json!({ "message": message })))
}

/// `GET /users/{roomId}` — recently active authors (durable-history
/// presence, not live connections).
pub async fn get_active_users(
    State(state): State<Arc<GatewayState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&state, &headers).await?;
    let users = state.chat.recently_active_users(&room_id).await?;
    Ok(Json(serde_json::json!({ "users": users })))
}

/// `GET /rooms/{roomId}/connections` — live connection count for the room.
pub async fn get_room_connections(
    State(state): State<Arc<GatewayState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&state, &headers).await?;
    let count = state.hub.count_connections(&room_id);
    Ok(Json(serde_json::json!({ "connections": count })))
}

/// `DELETE /messages/{messageId}`
pub async fn delete_message(
    State(state): State<Arc<GatewayState>>,
    Path(message_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let caller = authenticate(&state, &headers).await?;
    state
        .chat
        .delete_message(&caller.user_id, &message_id)
        .await?;
    debug!(message_id, caller = %caller.user_id, "message deleted via http");
    Ok(StatusCode::OK)
}

/// `GET /health`
pub async fn health(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "connections": state.hub.connection_count(),
    }))
}
