use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Duration, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::pending::PendingWrites;
use super::registry::{ConnectionId, LinkState, Registration};
use crate::config::RelayConfig;
use crate::frame::{encode_frame, FrameDecoder};
use crate::protocol::{RelayEvent, RelayRequest};

const READ_CHUNK: usize = 8 * 1024;

/// Why a bridged connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The browser closed its socket or the socket failed.
    BrowserGone,
    /// The bridge is shutting down.
    Shutdown,
    /// The game server closed the stream.
    UpstreamClosed,
    Unreachable(String),
    UpstreamError(String),
    IdleTimeout(Duration),
    FrameOversized(usize),
    WriteOverflow(usize),
}

impl CloseReason {
    /// The terminal notification owed to the browser, if it is still there.
    pub fn notification(&self) -> Option<RelayEvent> {
        let error = match self {
            CloseReason::BrowserGone => return None,
            CloseReason::UpstreamClosed => return Some(RelayEvent::disconnected()),
            CloseReason::Shutdown => "Relay is shutting down".to_string(),
            CloseReason::Unreachable(e) => format!("Game server unreachable: {e}"),
            CloseReason::UpstreamError(e) => format!("Game server connection error: {e}"),
            CloseReason::IdleTimeout(after) => {
                format!("Game server connection idle for {}s", after.as_secs())
            }
            CloseReason::FrameOversized(limit) => {
                format!("Game server sent a message larger than {limit} bytes")
            }
            CloseReason::WriteOverflow(limit) => {
                format!("Too much data queued for the game server (limit {limit} bytes)")
            }
        };
        Some(RelayEvent::ServerError { error })
    }
}

/// One browser paired with at most one stream to the game server.
pub(crate) struct Connection {
    ws: WebSocketStream<TcpStream>,
    config: Arc<RelayConfig>,
    registration: Registration,
    shutdown: watch::Receiver<bool>,
}

impl Connection {
    pub(crate) fn new(
        ws: WebSocketStream<TcpStream>,
        config: Arc<RelayConfig>,
        registration: Registration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            ws,
            config,
            registration,
            shutdown,
        }
    }

    fn id(&self) -> ConnectionId {
        self.registration.id()
    }

    /// Drive the connection to completion. The upstream stream and the
    /// registry entry are gone once this returns.
    pub(crate) async fn run(mut self) -> CloseReason {
        if *self.shutdown.borrow() {
            return self.finish(CloseReason::Shutdown).await;
        }
        // Browser messages sent before the link is up wait here.
        let mut pending = PendingWrites::new(self.config.max_pending_write);
        let upstream = match self.connect(&mut pending).await {
            Ok(stream) => stream,
            Err(reason) => return self.finish(reason).await,
        };

        self.registration.set_state(LinkState::Bridged);
        info!(
            "[conn {}] bridged to {}",
            self.id(),
            self.config.upstream_addr
        );
        if self.notify(&RelayEvent::connected()).await.is_err() {
            return self.finish(CloseReason::BrowserGone).await;
        }

        let reason = self.pump(upstream, pending).await;
        self.finish(reason).await
    }

    async fn connect(&mut self, pending: &mut PendingWrites) -> Result<TcpStream, CloseReason> {
        let connect = timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.upstream_addr.clone()),
        );
        tokio::pin!(connect);

        loop {
            tokio::select! {
                res = &mut connect => {
                    return match res {
                        Ok(Ok(stream)) => {
                            // Frames are small and latency matters more than batching.
                            let _ = stream.set_nodelay(true);
                            Ok(stream)
                        }
                        Ok(Err(e)) => Err(CloseReason::Unreachable(e.to_string())),
                        Err(_) => Err(CloseReason::Unreachable(format!(
                            "no answer within {}s",
                            self.config.connect_timeout.as_secs()
                        ))),
                    };
                }
                msg = self.ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("[conn {}] message while connecting, queued", self.id());
                        self.queue_browser_text(&text, pending).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => return Err(CloseReason::BrowserGone),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        info!("[conn {}] browser socket error: {}", self.registration.id(), e);
                        return Err(CloseReason::BrowserGone);
                    }
                },
                _ = self.shutdown.changed() => return Err(CloseReason::Shutdown),
            }
        }
    }

    /// Move traffic both ways until one side goes away.
    async fn pump(&mut self, upstream: TcpStream, mut pending: PendingWrites) -> CloseReason {
        let id = self.id();
        let idle_timeout = self.config.idle_timeout;
        let (mut reader, mut writer) = upstream.into_split();
        let mut decoder = FrameDecoder::new(self.config.max_frame_len);
        let mut chunk = vec![0u8; READ_CHUNK];
        let idle = sleep(idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                msg = self.ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(reason) = self.queue_browser_text(&text, &mut pending).await {
                            return reason;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return CloseReason::BrowserGone,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        info!("[conn {}] browser socket error: {}", id, e);
                        return CloseReason::BrowserGone;
                    }
                },
                read = reader.read(&mut chunk) => match read {
                    Ok(0) => return CloseReason::UpstreamClosed,
                    Ok(n) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                        for item in decoder.push::<Value>(&chunk[..n]) {
                            match item {
                                Ok(message) => {
                                    debug!("[conn {}] <- {}", id, message);
                                    if self.notify(&RelayEvent::ServerMessage(message)).await.is_err() {
                                        return CloseReason::BrowserGone;
                                    }
                                }
                                Err(e) if e.is_fatal() => {
                                    return CloseReason::FrameOversized(self.config.max_frame_len);
                                }
                                Err(e) => warn!("[conn {}] dropping frame: {}", id, e),
                            }
                        }
                    }
                    Err(e) => return CloseReason::UpstreamError(e.to_string()),
                },
                written = writer.write(pending.front()), if !pending.is_empty() => match written {
                    Ok(0) => return CloseReason::UpstreamError("write returned zero bytes".to_string()),
                    Ok(n) => {
                        pending.advance(n);
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                    }
                    Err(e) => return CloseReason::UpstreamError(e.to_string()),
                },
                _ = &mut idle => return CloseReason::IdleTimeout(idle_timeout),
                _ = self.shutdown.changed() => return CloseReason::Shutdown,
            }
        }
    }

    /// Frame a browser `client-message` onto the outbound queue. Unreadable
    /// messages are answered with an `error` event and skipped.
    async fn queue_browser_text(
        &mut self,
        text: &str,
        pending: &mut PendingWrites,
    ) -> Result<(), CloseReason> {
        let id = self.id();
        let payload = match serde_json::from_str::<RelayRequest>(text) {
            Ok(RelayRequest::ClientMessage(payload)) => payload,
            Err(e) => {
                warn!("[conn {}] unreadable browser message: {}", id, e);
                let refusal = RelayEvent::Error {
                    message: "Malformed client-message".to_string(),
                };
                return match self.notify(&refusal).await {
                    Ok(()) => Ok(()),
                    Err(_) => Err(CloseReason::BrowserGone),
                };
            }
        };
        let frame = match encode_frame(&payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("[conn {}] cannot encode client message: {}", id, e);
                return Ok(());
            }
        };
        debug!("[conn {}] -> {}", id, String::from_utf8_lossy(&frame).trim_end());
        pending
            .push(frame)
            .map_err(|overflow| CloseReason::WriteOverflow(overflow.limit))
    }

    async fn notify(&mut self, event: &RelayEvent) -> anyhow::Result<()> {
        let text = serde_json::to_string(event)?;
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn finish(mut self, reason: CloseReason) -> CloseReason {
        self.registration.set_state(LinkState::Closed);
        match &reason {
            CloseReason::BrowserGone => info!("[conn {}] browser disconnected", self.id()),
            CloseReason::Shutdown | CloseReason::UpstreamClosed => {
                info!("[conn {}] closed: {:?}", self.id(), reason)
            }
            other => error!("[conn {}] transport failure: {:?}", self.id(), other),
        }

        if let Some(note) = reason.notification() {
            if self.notify(&note).await.is_ok() {
                let _ = self.ws.close(None).await;
            }
        }
        reason
    }
}
