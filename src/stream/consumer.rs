//! Reconnecting stream consumer.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::constants::{RECONNECT_INITIAL_DELAY, RECONNECT_MAX_DELAY, STREAM_HANDSHAKE_TIMEOUT};
use crate::error::StreamError;
use crate::gotify::InboundEvent;
use crate::ws::{self, WsMessage, WsReader};

/// Receives every decoded event, one at a time, in stream order.
///
/// `forward` is awaited to completion before the next frame is read, so an
/// implementation never sees two events concurrently. It has no error
/// channel: failures must be handled (logged) inside.
#[async_trait]
pub trait EventSink: Send {
    /// Handles one event.
    async fn forward(&mut self, event: InboundEvent);
}

/// Connection state of the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; waiting to (re)connect.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Reading frames.
    Connected,
}

/// Settings for [`StreamConsumer`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Full stream URL including the client token.
    pub url: reqwest::Url,
    /// Delay before the first reconnect attempt.
    pub initial_backoff: Duration,
    /// Ceiling for the doubling reconnect delay.
    pub max_backoff: Duration,
    /// Upper bound on one handshake.
    pub handshake_timeout: Duration,
}

impl ConsumerConfig {
    /// Config with default backoff and handshake timeout.
    pub fn new(url: reqwest::Url) -> Self {
        Self {
            url,
            initial_backoff: RECONNECT_INITIAL_DELAY,
            max_backoff: RECONNECT_MAX_DELAY,
            handshake_timeout: STREAM_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Why the per-connection read loop ended.
enum ConsumeExit {
    Shutdown,
    Disconnected(StreamError),
}

/// Owns the stream subscription and drives events into a sink.
#[derive(Debug)]
pub struct StreamConsumer<S> {
    config: ConsumerConfig,
    sink: S,
    state_tx: watch::Sender<ConnectionState>,
}

impl<S: EventSink> StreamConsumer<S> {
    /// Creates a consumer in the `Disconnected` state.
    pub fn new(config: ConsumerConfig, sink: S) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            sink,
            state_tx,
        }
    }

    /// Watches connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Runs until `cancel` fires, reconnecting with capped exponential backoff.
    ///
    /// Cancellation is observed before each connect, during the handshake,
    /// during the retry delay and between frames. An event already being
    /// forwarded is allowed to finish. Returns the sink.
    pub async fn run(mut self, cancel: CancellationToken) -> S {
        let mut backoff = self.config.initial_backoff;

        while !cancel.is_cancelled() {
            self.set_state(ConnectionState::Connecting);
            log::info!("[Stream] Connecting to {}", redact(&self.config.url));

            let attempt = tokio::select! {
                () = cancel.cancelled() => break,
                attempt = tokio::time::timeout(
                    self.config.handshake_timeout,
                    ws::connect(&self.config.url),
                ) => attempt,
            };

            let connected = match attempt {
                Ok(result) => result,
                Err(_) => Err(StreamError::HandshakeTimeout(self.config.handshake_timeout)),
            };

            let (mut writer, mut reader) = match connected {
                Ok(pair) => pair,
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    log::warn!(
                        "[Stream] Cannot connect: {} (retry in {:?})",
                        e,
                        backoff
                    );
                    if !wait(backoff, &cancel).await {
                        break;
                    }
                    backoff = next_backoff(backoff, self.config.max_backoff);
                    continue;
                }
            };

            self.set_state(ConnectionState::Connected);
            backoff = self.config.initial_backoff;
            log::info!("[Stream] Connected, ready for forwarding");

            let exit = self.consume(&mut reader, &cancel).await;
            self.set_state(ConnectionState::Disconnected);

            match exit {
                ConsumeExit::Shutdown => {
                    if let Err(e) = writer.close().await {
                        log::debug!("[Stream] Close on shutdown: {}", e);
                    }
                    break;
                }
                ConsumeExit::Disconnected(e) => {
                    log::warn!("[Stream] Disconnected: {} (reconnect in {:?})", e, backoff);
                }
            }

            if !wait(backoff, &cancel).await {
                break;
            }
            backoff = next_backoff(backoff, self.config.max_backoff);
        }

        self.set_state(ConnectionState::Disconnected);
        log::info!("[Stream] Shutdown requested, consumer stopped");
        self.sink
    }

    async fn consume(
        &mut self,
        reader: &mut WsReader,
        cancel: &CancellationToken,
    ) -> ConsumeExit {
        loop {
            let msg = tokio::select! {
                () = cancel.cancelled() => return ConsumeExit::Shutdown,
                msg = reader.recv() => msg,
            };

            let frame = match msg {
                Some(Ok(WsMessage::Text(text))) => InboundEvent::from_frame(&text),
                Some(Ok(WsMessage::Binary(data))) => serde_json::from_slice(&data),
                // tungstenite queues the pong itself and flushes it on the next read.
                Some(Ok(WsMessage::Ping | WsMessage::Pong)) => continue,
                Some(Ok(WsMessage::Close { code, reason })) => {
                    return ConsumeExit::Disconnected(StreamError::Closed { code, reason });
                }
                Some(Err(e)) => return ConsumeExit::Disconnected(e),
                None => {
                    return ConsumeExit::Disconnected(StreamError::Closed {
                        code: 1006,
                        reason: "stream ended".to_string(),
                    });
                }
            };

            match frame {
                Ok(event) => {
                    log::debug!(
                        "[Stream] Message {} from app {} (priority {})",
                        event.id,
                        event.appid,
                        event.priority
                    );
                    self.sink.forward(event).await;
                }
                Err(e) => return ConsumeExit::Disconnected(StreamError::Decode(e)),
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }
}

/// Sleeps for `delay` unless cancelled first. Returns `false` on cancellation.
async fn wait(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

/// Stream URL with the token query value masked, for logs.
fn redact(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    if url.query().is_some() {
        url.set_query(Some("token=***"));
    }
    url.to_string()
}
