//! WebSocket Upgrade Handler

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    Extension,
};
use futures::StreamExt;

use super::connection::ConnectionActor;
use crate::presentation::middleware::AuthUser;
use crate::startup::AppState;

/// WebSocket upgrade handler. The caller is already authenticated.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    let settings = state.settings.websocket.clone();

    tracing::debug!(user_id = %user.user_id, "WebSocket upgrade requested");

    ws.max_message_size(settings.max_message_size)
        .on_upgrade(move |socket| async move {
            let (sink, stream) = socket.split();
            ConnectionActor::new(user.user_id, user.username, state.router.clone(), settings)
                .run(stream, sink)
                .await;
        })
}
