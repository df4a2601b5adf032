use async_trait::async_trait;
use ctx_protocol::{CloseReason, Inbound, Transport, TransportError};
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Session endpoint for a server address.
///
/// Bare `host:port` gets the `ws://` scheme; full URLs keep theirs.
pub fn data_url(addr: &str) -> String {
    let addr = addr.trim().trim_end_matches('/');
    if addr.contains("://") {
        format!("{addr}/data")
    } else {
        format!("ws://{addr}/data")
    }
}

/// Client end of a websocket session
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl WsTransport {
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        log::info!("Connecting to {}", url);
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionLost(format!("{url}: {e}")))?;
        Ok(Self {
            stream,
            closed: false,
        })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Send("socket already closed".into()));
        }
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        loop {
            match self.stream.next().await {
                None | Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return Ok(Inbound::Closed(Some(CloseReason::Abnormal)))
                }
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                Some(Ok(Message::Text(text))) => return Ok(Inbound::Text(text)),
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = &frame {
                        log::debug!("Close frame {}: {}", u16::from(frame.code), frame.reason);
                    }
                    return Ok(Inbound::Closed(
                        frame.and_then(|f| CloseReason::from_code(u16::from(f.code))),
                    ));
                }
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
            code: CloseCode::from(reason.code()),
            reason: Cow::Borrowed(""),
        };
        match self.stream.close(Some(frame)).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Send(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        assert_eq!(data_url("localhost:8000"), "ws://localhost:8000/data");
        assert_eq!(data_url("wss://ctx.example.com/"), "wss://ctx.example.com/data");
    }
}
