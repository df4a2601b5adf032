use crate::backend::ModelBackend;
use crate::config::ServerConfig;
use crate::connection::serve_connection;
use crate::handler::StageHandler;
use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use ctx_protocol::{CloseReason, Inbound, Transport, TransportError};
use std::borrow::Cow;
use std::sync::Arc;

/// Close text sent alongside a close code
fn close_text(reason: CloseReason) -> &'static str {
    match reason {
        CloseReason::InternalError => "ai generation failed",
        CloseReason::GoingAway => "server shutting down",
        CloseReason::Normal | CloseReason::Abnormal => "",
    }
}

/// Server end of a websocket session
pub struct SocketTransport {
    socket: WebSocket,
    closed: bool,
}

impl SocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Send("socket already closed".into()));
        }
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        loop {
            match self.socket.recv().await {
                None => return Ok(Inbound::Closed(Some(CloseReason::Abnormal))),
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                Some(Ok(Message::Text(text))) => return Ok(Inbound::Text(text)),
                Some(Ok(Message::Close(frame))) => {
                    return Ok(Inbound::Closed(
                        frame.and_then(|f| CloseReason::from_code(f.code)),
                    ))
                }
                // ping/pong is answered by axum; binary frames carry nothing for us
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn close(&mut self, reason: CloseReason) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let frame = CloseFrame {
            code: reason.code(),
            reason: Cow::Borrowed(close_text(reason)),
        };
        self.socket
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Shared by every connection
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ModelBackend>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(backend: Arc<dyn ModelBackend>, config: ServerConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    fn handler(&self) -> StageHandler {
        StageHandler::new(self.backend.clone(), self.config.temperature)
            .with_dump_path(self.config.dump_path.clone())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/data", get(data_upgrade))
        .route("/ping", get(ping_upgrade))
        .with_state(state)
}

async fn data_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        log::debug!("Session connection opened");
        let handler = state.handler();
        if let Err(e) = serve_connection(SocketTransport::new(socket), handler).await {
            log::warn!("Session connection ended: {}", e);
        }
    })
}

async fn ping_upgrade(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|socket| async move {
        let mut transport = SocketTransport::new(socket);
        loop {
            match transport.recv().await {
                Ok(Inbound::Text(_)) => {
                    if transport.send("pong".to_string()).await.is_err() {
                        break;
                    }
                }
                Ok(Inbound::Closed(_)) | Err(_) => break,
            }
        }
    })
}
