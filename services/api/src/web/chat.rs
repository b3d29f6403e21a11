//! services/api/src/web/chat.rs
//!
//! The WebSocket endpoint for the chat assistant. Each user line is stored and
//! echoed, then a reply task answers after the configured delay. Closing the
//! socket cancels every reply still pending.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use chrono::Utc;
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use learnhub_core::{
    domain::{AuthSession, ChatAuthor, ChatMessage},
    ports::{PortResult, Table},
    records::keys,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

type Sender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to chat WebSocket connections.
#[utoipa::path(
    get,
    path = "/chat",
    responses(
        (status = 101, description = "Switching to the chat WebSocket protocol"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn chat_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Response {
    let user_id = auth.user.id;
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New chat connection established for user: {}", user_id);

    let (sender, mut receiver) = socket.split();
    let ws_sender: Sender = Arc::new(Mutex::new(sender));
    let shutdown = CancellationToken::new();

    // --- 1. Replay the stored conversation ---
    if !send_history(&app_state, &ws_sender, user_id).await {
        return;
    }

    // --- 2. Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Message { text }) => {
                    handle_user_line(&app_state, &ws_sender, &shutdown, user_id, text).await;
                }
                Ok(ClientMessage::History) => {
                    if !send_history(&app_state, &ws_sender, user_id).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                    send(
                        &ws_sender,
                        &ServerMessage::Error {
                            message: "Unrecognised message".to_string(),
                        },
                    )
                    .await;
                }
            },
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    shutdown.cancel();
    info!("Chat connection closed for user: {}", user_id);
}

async fn handle_user_line(
    app_state: &Arc<AppState>,
    ws_sender: &Sender,
    shutdown: &CancellationToken,
    user_id: Uuid,
    text: String,
) {
    let text = text.trim().to_string();
    if text.is_empty() {
        return;
    }

    let message = match store_message(app_state, user_id, ChatAuthor::User, text.clone()).await {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to store chat message: {:?}", e);
            send(
                ws_sender,
                &ServerMessage::Error {
                    message: "Failed to save your message".to_string(),
                },
            )
            .await;
            return;
        }
    };
    send(ws_sender, &ServerMessage::Message { message }).await;
    send(ws_sender, &ServerMessage::Typing).await;

    let app_state = app_state.clone();
    let ws_sender = ws_sender.clone();
    let token = shutdown.child_token();
    tokio::spawn(async move {
        if let Some(message) = pending_reply(&app_state, user_id, &text, token).await {
            send(&ws_sender, &ServerMessage::Message { message }).await;
        }
    });
}

/// Waits out the reply delay, then answers and stores the reply. Returns `None`
/// when `token` fires first or the reply could not be produced.
async fn pending_reply(
    app_state: &AppState,
    user_id: Uuid,
    text: &str,
    token: CancellationToken,
) -> Option<ChatMessage> {
    tokio::select! {
        _ = token.cancelled() => {
            info!("Pending chat reply cancelled for user: {}", user_id);
            None
        }
        _ = tokio::time::sleep(app_state.config.chat_reply_delay) => {
            reply(app_state, user_id, text).await
        }
    }
}

async fn reply(app_state: &AppState, user_id: Uuid, text: &str) -> Option<ChatMessage> {
    let answer = match app_state.assistant.reply(text).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("Failed to produce chat reply: {:?}", e);
            return None;
        }
    };
    match store_message(app_state, user_id, ChatAuthor::Assistant, answer).await {
        Ok(message) => Some(message),
        Err(e) => {
            error!("Failed to store chat reply: {:?}", e);
            None
        }
    }
}

/// Appends a message to the local log and mirrors it to the remote `messages` table.
async fn store_message(
    app_state: &AppState,
    user_id: Uuid,
    from: ChatAuthor,
    text: String,
) -> PortResult<ChatMessage> {
    let message = ChatMessage {
        id: Uuid::new_v4(),
        user_id,
        from,
        text,
        sent_at: Utc::now(),
    };
    app_state
        .records
        .push(keys::CHAT_MESSAGES, message.clone())
        .await?;
    app_state.mirror(Table::Messages, message.id, &message).await;
    Ok(message)
}

async fn history(app_state: &AppState, user_id: Uuid) -> PortResult<Vec<ChatMessage>> {
    let all: Vec<ChatMessage> = app_state.records.load(keys::CHAT_MESSAGES).await?;
    Ok(all.into_iter().filter(|m| m.user_id == user_id).collect())
}

/// Returns false once the socket is gone.
async fn send_history(app_state: &AppState, ws_sender: &Sender, user_id: Uuid) -> bool {
    match history(app_state, user_id).await {
        Ok(messages) => send(ws_sender, &ServerMessage::History { messages }).await,
        Err(e) => {
            error!("Failed to load chat history: {:?}", e);
            send(
                ws_sender,
                &ServerMessage::Error {
                    message: "Failed to load chat history".to_string(),
                },
            )
            .await
        }
    }
}

/// Returns false once the socket is gone.
async fn send(ws_sender: &Sender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to encode server message: {:?}", e);
            return true;
        }
    };
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .is_ok()
}
