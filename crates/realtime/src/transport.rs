//! Wire side of the realtime connection.
//!
//! The server streams events over SSE (`GET /socket`) and accepts client
//! events on `POST /socket/{connectionId}/emit`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};

use gasdesk_events::{EventName, RealtimeEnvelope, SubscribeFrame};

use crate::sse::{SseDecoder, SseFrame};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("stream ended before the connect frame")]
    NoConnectFrame,

    #[error("no connect frame within {0:?}")]
    ConnectTimeout(Duration),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("not connected")]
    NotConnected,
}

/// A decoded domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub event: EventName,
    pub envelope: RealtimeEnvelope,
}

/// An open stream. Dropping it stops the reader that feeds `messages`.
#[derive(Debug)]
pub struct Connection {
    pub connection_id: String,
    pub messages: mpsc::Receiver<InboundMessage>,
    pump: Option<JoinHandle<()>>,
}

impl Connection {
    pub fn new(connection_id: impl Into<String>, messages: mpsc::Receiver<InboundMessage>) -> Self {
        Self {
            connection_id: connection_id.into(),
            messages,
            pump: None,
        }
    }

    fn with_pump(mut self, pump: JoinHandle<()>) -> Self {
        self.pump = Some(pump);
        self
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the event stream and wait for its connect frame.
    async fn open(&self, token: &str) -> Result<Connection, TransportError>;

    /// Send a client event on an open connection.
    async fn emit(&self, token: &str, connection_id: &str, frame: &SubscribeFrame) -> Result<(), TransportError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectPayload {
    connection_id: String,
}

/// Turn a frame into a domain event. Unknown names and lifecycle frames are
/// not domain events.
pub fn decode_frame(frame: &SseFrame) -> Result<Option<InboundMessage>, TransportError> {
    let Ok(event) = frame.event.parse::<EventName>() else {
        tracing::debug!(event = %frame.event, "ignoring unknown realtime event");
        return Ok(None);
    };
    if event.is_lifecycle() {
        return Ok(None);
    }
    let envelope: RealtimeEnvelope = serde_json::from_str(&frame.data)
        .map_err(|e| TransportError::Malformed(format!("{}: {e}", frame.event)))?;
    Ok(Some(InboundMessage { event, envelope }))
}

/// SSE over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    buffer: usize,
    connect_timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            buffer: 256,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// How long `open` waits for the connect frame once the stream is up.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(TransportError::Rejected { status, message })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, token: &str) -> Result<Connection, TransportError> {
        let resp = self
            .client
            .get(format!("{}/socket", self.base_url))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let mut bytes = Box::pin(resp.bytes_stream());
        let mut decoder = SseDecoder::new();
        let mut pending = Vec::new();

        let connection_id = tokio::time::timeout(
            self.connect_timeout,
            read_connect_frame(&mut bytes, &mut decoder, &mut pending),
        )
        .await
        .map_err(|_| TransportError::ConnectTimeout(self.connect_timeout))??;

        let (tx, rx) = mpsc::channel(self.buffer);
        let pump = tokio::spawn(async move {
            for frame in pending {
                if !forward(&tx, &frame).await {
                    return;
                }
            }
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::warn!(error = %e, "realtime stream failed");
                        return;
                    }
                };
                for frame in decoder.push(&chunk) {
                    if !forward(&tx, &frame).await {
                        return;
                    }
                }
            }
            tracing::debug!("realtime stream ended");
        });

        tracing::info!(connection_id = %connection_id, "realtime stream open");
        Ok(Connection::new(connection_id, rx).with_pump(pump))
    }

    async fn emit(&self, token: &str, connection_id: &str, frame: &SubscribeFrame) -> Result<(), TransportError> {
        let resp = self
            .client
            .post(format!("{}/socket/{}/emit", self.base_url, connection_id))
            .bearer_auth(token)
            .json(frame)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// Read until the connect frame. Frames after it in the same chunk are left
/// in `pending` for the pump.
async fn read_connect_frame<S, B>(
    bytes: &mut S,
    decoder: &mut SseDecoder,
    pending: &mut Vec<SseFrame>,
) -> Result<String, TransportError>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    while let Some(chunk) = bytes.next().await {
        let mut frames = decoder.push(chunk?.as_ref()).into_iter();
        while let Some(frame) = frames.next() {
            if frame.event == EventName::Connect.as_str() {
                let payload: ConnectPayload = serde_json::from_str(&frame.data)
                    .map_err(|e| TransportError::Malformed(format!("connect: {e}")))?;
                pending.extend(frames);
                return Ok(payload.connection_id);
            }
        }
    }
    Err(TransportError::NoConnectFrame)
}

/// `false` once the receiving side is gone.
async fn forward(tx: &mpsc::Sender<InboundMessage>, frame: &SseFrame) -> bool {
    match decode_frame(frame) {
        Ok(Some(message)) => tx.send(message).await.is_ok(),
        Ok(None) => true,
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed realtime frame");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: event.to_string(),
            data: data.to_string(),
            id: None,
        }
    }

    #[test]
    fn domain_frames_decode_to_envelopes() {
        let envelope = RealtimeEnvelope::new(EventName::OrderCreated, json!({"id": "o1"}));
        let data = serde_json::to_string(&envelope).unwrap();

        let message = decode_frame(&frame("order:created", &data)).unwrap().unwrap();
        assert_eq!(message.event, EventName::OrderCreated);
        assert_eq!(message.envelope, envelope);
    }

    #[test]
    fn lifecycle_and_unknown_frames_are_skipped() {
        assert!(decode_frame(&frame("connect", "{}")).unwrap().is_none());
        assert!(decode_frame(&frame("something:else", "{}")).unwrap().is_none());
    }

    #[tokio::test]
    async fn silent_stream_times_out_waiting_for_connect() {
        // Answers with SSE headers, then never writes a frame.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let transport =
            HttpTransport::new(format!("http://{addr}")).with_connect_timeout(Duration::from_millis(100));
        let err = transport.open("token").await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectTimeout(_)));
        server.abort();
    }

    #[tokio::test]
    async fn connect_frame_splits_off_following_frames() {
        let chunk = "event: connect\ndata: {\"connectionId\":\"c1\"}\n\nevent: tax:deleted\ndata: {}\n\n";
        let mut bytes = tokio_stream::iter(vec![Ok::<_, reqwest::Error>(chunk.as_bytes().to_vec())]);
        let mut decoder = SseDecoder::new();
        let mut pending = Vec::new();

        let id = read_connect_frame(&mut bytes, &mut decoder, &mut pending).await.unwrap();
        assert_eq!(id, "c1");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event, "tax:deleted");
    }

    #[test]
    fn broken_payload_is_an_error() {
        assert!(matches!(
            decode_frame(&frame("tax:updated", "not json")),
            Err(TransportError::Malformed(_))
        ));
    }
}
