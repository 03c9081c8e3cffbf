//! Gotify `/stream` WebSocket connection.
//!
//! [`connect`] opens the subscription and returns a [`WsReader`] that the
//! consumer polls for frames, plus a [`WsWriter`] kept only to say goodbye on
//! shutdown. The stream is read-only from the bridge's side: Gotify never
//! expects anything from a client besides control frames, and tungstenite
//! answers pings on its own.

// Rust guideline compliant 2026-02

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use crate::error::StreamError;

type GotifySocket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Close code reported when the server closes without one.
const NO_STATUS_CODE: u16 = 1005;

/// One frame from the Gotify stream.
#[derive(Debug)]
pub enum WsMessage {
    /// A message event as JSON text. Gotify only ever sends these.
    Text(String),
    /// JSON delivered as a binary frame.
    Binary(Vec<u8>),
    /// Keepalive from the server. Already answered.
    Ping,
    /// Reply to a keepalive.
    Pong,
    /// Server ended the subscription, e.g. because the client token was revoked.
    Close {
        /// Close status code.
        code: u16,
        /// Close reason supplied by the server, possibly empty.
        reason: String,
    },
}

/// Sending side of the subscription. Only used to close it.
#[derive(Debug)]
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<GotifySocket, tungstenite::Message>,
}

impl WsWriter {
    /// Sends a close frame so the server drops the client promptly.
    pub async fn close(&mut self) -> Result<(), StreamError> {
        self.sink
            .close()
            .await
            .map_err(|e| StreamError::Read(format!("close failed: {e}")))
    }
}

/// Receiving side of the subscription.
#[derive(Debug)]
pub struct WsReader {
    stream: futures_util::stream::SplitStream<GotifySocket>,
}

impl WsReader {
    /// Next frame, or `None` once the TCP connection is gone.
    pub async fn recv(&mut self) -> Option<Result<WsMessage, StreamError>> {
        loop {
            let raw = match self.stream.next().await? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(StreamError::Read(e.to_string()))),
            };
            let frame = match raw {
                tungstenite::Message::Text(text) => WsMessage::Text(text),
                tungstenite::Message::Binary(data) => WsMessage::Binary(data),
                tungstenite::Message::Ping(_) => WsMessage::Ping,
                tungstenite::Message::Pong(_) => WsMessage::Pong,
                tungstenite::Message::Close(close) => match close {
                    Some(close) => WsMessage::Close {
                        code: close.code.into(),
                        reason: close.reason.into_owned(),
                    },
                    None => WsMessage::Close {
                        code: NO_STATUS_CODE,
                        reason: String::new(),
                    },
                },
                // Raw frames are never yielded while reading.
                tungstenite::Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }
}

/// Subscribes to the Gotify stream at `url` (token already in the query).
pub async fn connect(url: &reqwest::Url) -> Result<(WsWriter, WsReader), StreamError> {
    let (socket, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| StreamError::Connect(e.to_string()))?;

    let (sink, stream) = socket.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_unreachable_host_returns_error() {
        let url = reqwest::Url::parse("ws://127.0.0.1:1/stream?token=x").unwrap();
        let result = connect(&url).await;
        assert!(matches!(result, Err(StreamError::Connect(_))));
    }

    #[tokio::test]
    async fn test_text_and_close_frames_are_surfaced() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(tungstenite::Message::Text("hello".into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let url = reqwest::Url::parse(&format!("ws://{addr}/stream")).unwrap();
        let (_writer, mut reader) = connect(&url).await.unwrap();

        match reader.recv().await {
            Some(Ok(WsMessage::Text(text))) => assert_eq!(text, "hello"),
            other => panic!("expected text frame, got {other:?}"),
        }
        match reader.recv().await {
            Some(Ok(WsMessage::Close { .. })) | None => {}
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_ping_gets_exactly_one_pong() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(tungstenite::Message::Ping(b"hb".to_vec())).await.unwrap();
            let first = ws.next().await.unwrap().unwrap();
            ws.send(tungstenite::Message::Text("after".into())).await.unwrap();
            let second = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
            (first, second.is_err())
        });

        let url = reqwest::Url::parse(&format!("ws://{addr}/stream")).unwrap();
        let (_writer, mut reader) = connect(&url).await.unwrap();

        assert!(matches!(reader.recv().await, Some(Ok(WsMessage::Ping))));
        match reader.recv().await {
            Some(Ok(WsMessage::Text(text))) => assert_eq!(text, "after"),
            other => panic!("expected text frame, got {other:?}"),
        }
        // Keep reading so a second pong would be flushed if one were queued.
        let reading = tokio::spawn(async move { reader.recv().await.is_some() });

        let (first, nothing_more) = server.await.unwrap();
        assert_eq!(first, tungstenite::Message::Pong(b"hb".to_vec()));
        assert!(nothing_more, "only one pong per ping");
        reading.abort();
    }
}
