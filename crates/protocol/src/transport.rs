use crate::close::CloseReason;
use crate::error::TransportError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Message received from the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Closed(Option<CloseReason>),
}

/// Duplex text channel carrying one JSON envelope per message
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text message or the close notice. Non-text frames are the
    /// implementation's business and never surface here.
    async fn recv(&mut self) -> Result<Inbound, TransportError>;

    async fn close(&mut self, reason: CloseReason) -> Result<(), TransportError>;
}

/// In-process transport backed by tokio channels
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Inbound>,
    rx: mpsc::UnboundedReceiver<Inbound>,
    closed: bool,
}

/// Two connected ends
pub fn channel_pair() -> (ChannelTransport, ChannelTransport) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
        ChannelTransport {
            tx: a_tx,
            rx: b_rx,
            closed: false,
        },
        ChannelTransport {
            tx: b_tx,
            rx: a_rx,
            closed: false,
        },
    )
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Send("transport already closed".into()));
        }
        self.tx
            .send(Inbound::Text(text))
            .map_err(|_| TransportError::ConnectionLost("peer dropped".into()))
    }

    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        match self.rx.recv().await {
            Some(message) => Ok(message),
            // a dropped peer looks like an abnormal close
            None => Ok(Inbound::Closed(Some(CloseReason::Abnormal))),
        }
    }

    async fn close(&mut self, reason: CloseReason) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // peer may already be gone
        let _ = self.tx.send(Inbound::Closed(Some(reason)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_pair_delivers_both_ways() {
        let (mut left, mut right) = channel_pair();
        left.send("ping".into()).await.unwrap();
        assert_eq!(right.recv().await.unwrap(), Inbound::Text("ping".into()));
        right.close(CloseReason::Normal).await.unwrap();
        assert_eq!(
            left.recv().await.unwrap(),
            Inbound::Closed(Some(CloseReason::Normal))
        );
        assert!(right.send("late".into()).await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_peer_reads_as_abnormal_close() {
        let (mut left, right) = channel_pair();
        drop(right);
        assert_eq!(
            left.recv().await.unwrap(),
            Inbound::Closed(Some(CloseReason::Abnormal))
        );
    }
}
