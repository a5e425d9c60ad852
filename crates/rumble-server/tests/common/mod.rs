use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use rumble_core::PlayerId;
use rumble_core::net::messages::{ClientMessage, CurrentSessionsMsg, JoinMsg, ServerMessage};
use rumble_core::net::protocol::{
    PROTOCOL_VERSION, decode_server_message, encode_client_message,
};
use rumble_core::team::Team;

use rumble_server::config::ServerConfig;
use rumble_server::{build_app, spawn_liveness_sweep};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default configuration.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);
        spawn_liveness_sweep(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a ClientMessage over a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Join the arena and consume the welcome sequence (CurrentSessions,
/// MatchStats, TeamCounts). Returns the joiner's id and the world snapshot.
pub async fn ws_join(stream: &mut WsStream, name: &str, team: Option<Team>) -> (PlayerId, CurrentSessionsMsg) {
    ws_send_client_msg(
        stream,
        &ClientMessage::Join(JoinMsg {
            username: Some(name.to_string()),
            team,
            protocol_version: PROTOCOL_VERSION,
        }),
    )
    .await;

    let snapshot = match ws_read_server_msg(stream).await {
        ServerMessage::CurrentSessions(m) => m,
        other => panic!("Expected CurrentSessions, got: {other:?}"),
    };
    let stats = ws_read_server_msg(stream).await;
    assert!(matches!(stats, ServerMessage::MatchStats(_)));
    let counts = ws_read_server_msg(stream).await;
    assert!(matches!(counts, ServerMessage::TeamCounts(_)));

    let id = snapshot
        .sessions
        .iter()
        .find(|(_, s)| s.username == name)
        .map(|(&id, _)| id)
        .expect("joiner should appear in its own snapshot");
    (id, snapshot)
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}
