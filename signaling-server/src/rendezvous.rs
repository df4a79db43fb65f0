use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use stranger_chat_protocol::{decode, encode, SessionId, Signal, SignalMessage};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// Outbound text frames of every connected client.
pub type Connections = Arc<RwLock<HashMap<SessionId, mpsc::UnboundedSender<String>>>>;

/// Matches waiting clients pairwise and relays addressed messages between them.
///
/// The server never looks at session descriptions or candidates, it only
/// stamps `senderSessionId` on whatever it forwards.
#[derive(Default, Clone)]
pub struct Rendezvous {
    connections: Connections,
    waiting: Arc<Mutex<Option<SessionId>>>,
}

impl Rendezvous {
    /// Register a client, returning the session id assigned to it.
    pub async fn connect(&self, tx: mpsc::UnboundedSender<String>) -> SessionId {
        let session_id = SessionId::new(Uuid::new_v4().to_string());
        self.connections
            .write()
            .await
            .insert(session_id.clone(), tx);
        info!("new user connected: {}", session_id);
        session_id
    }

    /// Forget a client, including its place in the waiting slot.
    pub async fn disconnect(&self, session_id: &SessionId) {
        self.connections.write().await.remove(session_id);
        let mut waiting = self.waiting.lock().await;
        if waiting.as_ref() == Some(session_id) {
            *waiting = None;
        }
        info!("user disconnected: {}", session_id);
    }

    /// Client currently parked waiting for a stranger.
    pub async fn waiting(&self) -> Option<SessionId> {
        self.waiting.lock().await.clone()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Handle one text frame sent by `sender`.
    pub async fn user_message(&self, sender: &SessionId, frame: &str) {
        let message = match decode(frame) {
            Ok(message) => message,
            Err(err) => {
                warn!("dropping frame from {}: {}", sender, err);
                return;
            }
        };
        debug!("`{}` message received from {}", message.kind(), sender);

        match message.recipient_session_id.clone() {
            Some(recipient) => {
                self.relay(&recipient, message.relayed_from(sender.clone()))
                    .await;
            }
            None if message.signal == Signal::Start => self.start(sender).await,
            None => warn!(
                "`{}` message from {} has no recipient, dropping it",
                message.kind(),
                sender
            ),
        }
    }

    /// Pair `sender` with the waiting client, or park it until someone shows up.
    async fn start(&self, sender: &SessionId) {
        let mut waiting = self.waiting.lock().await;
        match waiting.take() {
            Some(waiting_id) if waiting_id == *sender => {
                debug!("{} is already waiting", sender);
                *waiting = Some(waiting_id);
            }
            Some(waiting_id) => {
                let start = SignalMessage::new(Signal::Start).relayed_from(sender.clone());
                if self.relay(&waiting_id, start).await {
                    info!("paired {} with waiting {}", sender, waiting_id);
                } else {
                    *waiting = Some(sender.clone());
                }
            }
            None => {
                info!("{} is waiting for a stranger", sender);
                *waiting = Some(sender.clone());
            }
        }
    }

    /// Returns `false` if the recipient is gone.
    async fn relay(&self, recipient: &SessionId, message: SignalMessage) -> bool {
        let frame = match encode(&message) {
            Ok(frame) => frame,
            Err(err) => {
                error!("failed to encode `{}` message: {}", message.kind(), err);
                return false;
            }
        };
        let connections = self.connections.read().await;
        let Some(recipient_tx) = connections.get(recipient) else {
            warn!(
                "no such user {}, dropping `{}` message",
                recipient,
                message.kind()
            );
            return false;
        };
        if recipient_tx.send(frame).is_err() {
            warn!("connection to {} is closing", recipient);
            return false;
        }
        true
    }
}

pub async fn user_connected(ws: WebSocket, rendezvous: Rendezvous) {
    let (mut user_ws_tx, mut user_ws_rx) = ws.split();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut rx = UnboundedReceiverStream::new(rx);
    let session_id = rendezvous.connect(tx).await;

    tokio::task::spawn(async move {
        while let Some(frame) = rx.next().await {
            if let Err(err) = user_ws_tx.send(Message::Text(frame)).await {
                error!("websocket send error: {}", err);
                break;
            }
        }
    });

    while let Some(result) = user_ws_rx.next().await {
        let message = match result {
            Ok(message) => message,
            Err(err) => {
                error!("websocket error (id={}): {}", session_id, err);
                break;
            }
        };
        match message {
            Message::Text(frame) => rendezvous.user_message(&session_id, &frame).await,
            Message::Close(_) => break,
            Message::Binary(_) => warn!("binary frame from {}, ignoring it", session_id),
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    rendezvous.disconnect(&session_id).await;
}
