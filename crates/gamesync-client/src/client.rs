use crate::error::ClientError;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use gamesync_types::{PeerId, PeerState, ServerFrame, SharedState};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A registered peer connection.
///
/// `connect` only returns once the server has admitted the peer, so
/// [`identity`](Self::identity) is always the one the server assigned.
pub struct PeerClient {
    identity: PeerId,
    capacity: u16,
    sender: PeerSender,
    receiver: PeerReceiver,
}

impl PeerClient {
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (socket, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let (sink, stream) = socket.split();
        let mut receiver = PeerReceiver { stream, close_code: None };

        match receiver.next_frame().await? {
            Some(ServerFrame::Welcome { identity, capacity }) => {
                tracing::debug!("Connected to {} as peer {}", url, identity);
                Ok(Self { identity, capacity, sender: PeerSender { sink }, receiver })
            }
            Some(ServerFrame::Rejected { error }) => Err(ClientError::Rejected(error)),
            Some(other) => Err(ClientError::Protocol(format!("expected welcome, got {:?}", other))),
            None => Err(ClientError::Closed { code: receiver.close_code }),
        }
    }

    pub fn identity(&self) -> PeerId {
        self.identity
    }

    /// Capacity the server announced in its welcome frame.
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    pub async fn send(&mut self, state: &PeerState) -> Result<(), ClientError> {
        self.sender.send(state).await
    }

    pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>, ClientError> {
        self.receiver.next_frame().await
    }

    pub async fn next_snapshot(&mut self) -> Result<Option<Arc<SharedState>>, ClientError> {
        self.receiver.next_snapshot().await
    }

    /// Close code of the server's close frame, once one has been read.
    pub fn close_code(&self) -> Option<u16> {
        self.receiver.close_code
    }

    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.sender.close().await
    }

    /// Split into halves that can be driven from separate tasks.
    pub fn into_split(self) -> (PeerSender, PeerReceiver) {
        (self.sender, self.receiver)
    }
}

/// Write half of a [`PeerClient`].
pub struct PeerSender {
    sink: SplitSink<Socket, Message>,
}

impl PeerSender {
    /// Publish this peer's state. Any `identity` set on `state` is ignored
    /// by the server.
    pub async fn send(&mut self, state: &PeerState) -> Result<(), ClientError> {
        let text = serde_json::to_string(state).map_err(|e| ClientError::Protocol(e.to_string()))?;
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), ClientError> {
        match self.sink.send(Message::Close(None)).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Read half of a [`PeerClient`].
pub struct PeerReceiver {
    stream: SplitStream<Socket>,
    close_code: Option<u16>,
}

impl PeerReceiver {
    /// Next server frame, or `None` once the stream has closed.
    pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>, ClientError> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let frame = serde_json::from_str(&text)
                        .map_err(|e| ClientError::Protocol(format!("{}: {}", e, text)))?;
                    return Ok(Some(frame));
                }
                Ok(Message::Close(frame)) => {
                    self.close_code = frame.map(|f| u16::from(f.code));
                    return Ok(None);
                }
                Ok(Message::Binary(data)) => {
                    tracing::debug!("Ignoring binary frame ({} bytes)", data.len());
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    /// Next snapshot, skipping any other frame kind.
    pub async fn next_snapshot(&mut self) -> Result<Option<Arc<SharedState>>, ClientError> {
        loop {
            match self.next_frame().await? {
                Some(ServerFrame::Snapshot { state }) => return Ok(Some(state)),
                Some(ServerFrame::Rejected { error }) => return Err(ClientError::Rejected(error)),
                Some(ServerFrame::Welcome { .. }) => {}
                None => return Ok(None),
            }
        }
    }

    pub fn close_code(&self) -> Option<u16> {
        self.close_code
    }
}
