use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use futures::SinkExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::info;

/// Classified channel outcomes
///
/// `Closed` is the orderly end of a direction and is non-fatal to the
/// session; `Transport` failures end the affected pump and trigger a drain.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Sending half of the duplex channel
#[async_trait]
pub trait MessageSink: Send {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), ChannelError>;

    /// Signal end-of-stream to the peer
    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Receiving half of the duplex channel
///
/// `Ok(None)` means the peer closed the connection.
#[async_trait]
pub trait MessageSource: Send {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ChannelError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket-backed duplex channel
pub struct WsChannel;

impl WsChannel {
    /// Open the connection and split it into independently owned halves
    pub async fn connect(
        url: &str,
        headers: &[(String, String)],
    ) -> Result<(Box<dyn MessageSink>, Box<dyn MessageSource>), ChannelError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ChannelError::Handshake(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ChannelError::Handshake(e.to_string()))?;
            request.headers_mut().insert(name, value);
        }

        info!("Opening transcription channel");
        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;
        info!("Transcription channel established");

        let (sink, source) = stream.split();
        Ok((
            Box::new(WsSink { inner: sink }),
            Box::new(WsSource { inner: source }),
        ))
    }
}

fn map_ws_error(error: WsError) -> ChannelError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => ChannelError::Closed,
        other => ChannelError::Transport(other.to_string()),
    }
}

struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl MessageSink for WsSink {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), ChannelError> {
        self.inner
            .send(Message::Binary(frame))
            .await
            .map_err(map_ws_error)
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        match self.inner.close().await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(ChannelError::Transport(e.to_string())),
        }
    }
}

struct WsSource {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl MessageSource for WsSource {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        loop {
            match self.inner.next().await {
                None => return Ok(None),
                Some(Ok(Message::Binary(bytes))) => return Ok(Some(bytes)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                // control frames are the transport's concern
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) => {
                    return Ok(None)
                }
                Some(Err(e)) => return Err(ChannelError::Transport(e.to_string())),
            }
        }
    }
}

/// In-process duplex pair: two connected (sink, source) ends
///
/// Frames sent on one end's sink arrive on the other end's source. Used by
/// the integration tests to stand in for the service connection.
pub fn loopback_pair() -> (
    (Box<dyn MessageSink>, Box<dyn MessageSource>),
    (Box<dyn MessageSink>, Box<dyn MessageSource>),
) {
    let (a_tx, a_rx) = mpsc::channel(64);
    let (b_tx, b_rx) = mpsc::channel(64);
    (
        (
            Box::new(LoopbackSink { tx: Some(a_tx) }),
            Box::new(LoopbackSource { rx: b_rx }),
        ),
        (
            Box::new(LoopbackSink { tx: Some(b_tx) }),
            Box::new(LoopbackSource { rx: a_rx }),
        ),
    )
}

struct LoopbackSink {
    tx: Option<mpsc::Sender<Vec<u8>>>,
}

#[async_trait]
impl MessageSink for LoopbackSink {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), ChannelError> {
        match &self.tx {
            Some(tx) => tx.send(frame).await.map_err(|_| ChannelError::Closed),
            None => Err(ChannelError::Closed),
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.tx.take();
        Ok(())
    }
}

struct LoopbackSource {
    rx: mpsc::Receiver<Vec<u8>>,
}

#[async_trait]
impl MessageSource for LoopbackSource {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        Ok(self.rx.recv().await)
    }
}
