//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::PlayerInput;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

type WsSink = futures::stream::SplitSink<WebSocket, Message>;
type WsStream = futures::stream::SplitStream<WebSocket>;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let identity = Uuid::new_v4();
    info!(identity = %identity, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        identity,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(identity = %identity, error = %e, "Failed to send welcome");
        return;
    }

    let outbound_rx = state.outbox.register(identity);
    let input_tx = state.game.input_tx.clone();

    run_session(identity, ws_sink, ws_stream, input_tx, outbound_rx).await;

    state.outbox.unregister(&identity);
    info!(identity = %identity, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    identity: Uuid,
    mut ws_sink: WsSink,
    mut ws_stream: WsStream,
    input_tx: mpsc::Sender<PlayerInput>,
    mut outbound_rx: mpsc::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(identity = %identity, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> game task
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(identity = %identity, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        let input = PlayerInput {
                            identity,
                            msg,
                            received_at: unix_millis(),
                        };
                        if input_tx.send(input).await.is_err() {
                            debug!(identity = %identity, "Input channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(identity = %identity, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(identity = %identity, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(identity = %identity, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(identity = %identity, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Vacate the seat on the game task
    let _ = input_tx
        .send(PlayerInput {
            identity,
            msg: ClientMsg::Leave,
            received_at: unix_millis(),
        })
        .await;

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
