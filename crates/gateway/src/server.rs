use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Json, Router,
        extract::{Query, State, WebSocketUpgrade},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
    },
    serde::Deserialize,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use {
    studyhall_chat::{ChatService, InMemoryUserDirectory, SqliteMessageStore, UserProfile},
    studyhall_config::StudyhallConfig,
};

use crate::{auth, http, hub::RealtimeHub, state::GatewayState, ws};

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(http::health))
        .route("/ws", get(ws_upgrade_handler))
        .route("/messages", axum::routing::post(http::post_message))
        .route(
            "/messages/{id}",
            get(http::get_messages).delete(http::delete_message),
        )
        .route("/users/{room_id}", get(http::get_active_users))
        .route(
            "/rooms/{room_id}/connections",
            get(http::get_room_connections),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ── WebSocket upgrade ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Authenticate the connection from its handshake credential, bounded by the
/// auth timeout, before upgrading. A rejected connection is never registered
/// and can never join rooms.
async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    let token = query.token.unwrap_or_default();
    let verified = tokio::time::timeout(state.auth_timeout, state.verifier.verify(&token)).await;

    let identity = match verified {
        Ok(Ok(identity)) => identity,
        Ok(Err(e)) => {
            warn!(error = %e, "ws connection rejected");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "unauthorized" })),
            )
                .into_response();
        },
        Err(_) => {
            warn!("ws authentication timed out");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "authentication timed out" })),
            )
                .into_response();
        },
    };

    ws.on_upgrade(move |socket| ws::handle_connection(socket, state, identity))
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Start the gateway HTTP + WebSocket server from config.
pub async fn start_gateway(config: StudyhallConfig) -> anyhow::Result<()> {
    let store = Arc::new(SqliteMessageStore::open(&config.database.path).await?);

    // The user directory is an external system; here it is seeded from the
    // identities the auth table knows about.
    let mut directory = InMemoryUserDirectory::new();
    for identity in config.auth.tokens.values() {
        directory.insert(UserProfile {
            id: identity.user_id.clone(),
            name: identity.display_name.clone(),
            email: identity.email.clone(),
        });
    }

    let verifier = auth::verifier_from_config(&config.auth);
    let hub = Arc::new(RealtimeHub::new());
    let chat = Arc::new(ChatService::new(
        store,
        Arc::new(directory),
        Arc::clone(&hub) as _,
    ));
    let state = GatewayState::new(hub, chat, verifier);

    let app = build_gateway_app(Arc::clone(&state));
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(version = %state.version, %addr, db = %config.database.path, "studyhall gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}
