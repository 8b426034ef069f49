use crate::model::{ClientCommand, ClientId, MatchError};
use crate::server::{ClientEventHandler, ConnectionHandler};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::Receiver;

/// Events a client may fall behind by before it is dropped.
const OUTGOING_CAPACITY: usize = 64;

pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    connection_handler: ConnectionHandler,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| listen(socket, connection_handler))
}

async fn listen(socket: WebSocket, connection_handler: ConnectionHandler) {
    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = tokio::sync::mpsc::channel(OUTGOING_CAPACITY);

    let client_id = match connection_handler.connect(tx).await {
        Ok(client_id) => client_id,
        Err(e) => {
            log::error!("Failed to register connection: {:?}", e);
            return;
        }
    };

    let sender_task = handle_outgoing_messages(rx, ws_sender);
    let receiver_task = handle_incoming_messages(ws_receiver, client_id, &connection_handler);

    tokio::select! {
        _ = sender_task => {
            log::info!("Sender task completed for client {}", client_id);
        }
        _ = receiver_task => {
            log::info!("Receiver task completed for client {}", client_id);
        }
    }
    if let Err(e) = connection_handler.disconnect(client_id).await {
        log::error!("Failed to disconnect {}: {:?}", client_id, e);
    }
}

pub async fn handle_outgoing_messages(
    mut rx: Receiver<Message>,
    mut ws_sender: SplitSink<WebSocket, Message>,
) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = ws_sender.send(msg).await {
            log::error!("Failed to send message: {:?}", e);
            break;
        }
    }
}

pub async fn handle_incoming_messages(
    mut receiver: SplitStream<WebSocket>,
    client_id: ClientId,
    connection_handler: &ConnectionHandler,
) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Close(_)) => {
                log::info!("Client {} closed the connection", client_id);
                break;
            }
            Ok(message) => handle_message(message, client_id, connection_handler).await,
            Err(e) => {
                log::error!("Failed to receive message: {:?}", e);
                break;
            }
        }
    }
}

pub async fn handle_message(
    message: Message,
    client_id: ClientId,
    connection_handler: &ConnectionHandler,
) {
    match message {
        Message::Text(text) => match parse_command(&text) {
            Ok(command) => {
                if let Err(e) = connection_handler.on_event(client_id, command).await {
                    log::error!("Failed to handle command: {:?}", e);
                }
            }
            Err(e) => {
                log::warn!("Ignoring frame from {}: {}", client_id, e);
            }
        },
        Message::Binary(data) => {
            log::debug!("Ignoring {} byte binary frame from {}", data.len(), client_id);
        }
        Message::Ping(_) | Message::Pong(_) => {}
        Message::Close(_) => {}
    }
}

fn parse_command(text: &str) -> Result<ClientCommand, MatchError> {
    Ok(serde_json::from_str(text)?)
}
