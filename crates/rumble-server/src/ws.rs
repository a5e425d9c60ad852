use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use rumble_core::PlayerId;
use rumble_core::net::messages::{ClientMessage, ServerMessage, ServerNoticeMsg};
use rumble_core::net::protocol::{
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION, decode_client_message, encode_server_message,
};

use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Wait for the first message: must be a Join.
    let first_msg = match ws_receiver.next().await {
        Some(Ok(Message::Binary(data))) => data,
        _ => return,
    };

    let Ok(client_msg) = decode_client_message(&first_msg) else {
        return;
    };

    let join = match client_msg {
        ClientMessage::Join(j) => j,
        _ => return,
    };

    // Validate protocol version. Zero means a client predating the field.
    if join.protocol_version != 0 && join.protocol_version != PROTOCOL_VERSION {
        send_notice(
            &mut ws_sender,
            &format!(
                "Protocol version mismatch: client={}, server={}",
                join.protocol_version, PROTOCOL_VERSION
            ),
        )
        .await;
        return;
    }

    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);

    // Allocate an identity, register the outbound channel, then attempt the
    // join while still holding the write lock so the snapshot the joiner
    // receives cannot race with another player's mutation.
    let (player_id, joined) = {
        let mut game = state.game.write().await;
        let id = game.alloc_player_id();
        game.connect(id, tx);
        let joined = game.join(id, join).is_ok();
        (id, joined)
    };

    // The writer drains the channel even when the join was refused, so the
    // rejection notice still reaches the client before the socket closes.
    spawn_writer(ws_sender, rx);

    if joined {
        read_loop(&mut ws_receiver, &state, player_id).await;
    }

    let mut game = state.game.write().await;
    game.disconnect(player_id);
}

async fn send_notice(
    ws_sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    text: &str,
) {
    let msg = ServerMessage::ServerNotice(ServerNoticeMsg {
        message: text.to_string(),
    });
    if let Ok(data) = encode_server_message(&msg)
        && let Err(e) = ws_sender.send(Message::Binary(data.into())).await
    {
        tracing::warn!(error = %e, "Failed to send notice");
    }
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender
                .send(Message::Binary(data.to_vec().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    player_id: PlayerId,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        // Rate limit: drop messages that exceed per-connection rate
        if !rate_limiter.allow() {
            tracing::warn!(player_id, "Rate limited");
            continue;
        }

        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }

        // Decoding rejects server-only message types up front, so the
        // dispatcher only ever sees well-formed client intents.
        let client_msg = match decode_client_message(&data) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(player_id, error = %e, "Dropping undecodable message");
                continue;
            },
        };

        let mut game = state.game.write().await;
        // A liveness eviction already tore down this identity's registry
        // entry and session; close the socket so the client reconnects
        // through a fresh handshake instead of mutating state unheard.
        if !game.is_connected(player_id) {
            tracing::debug!(player_id, "Connection evicted, closing socket");
            break;
        }
        game.touch(player_id);
        game.handle_message(player_id, client_msg);
    }
}
