use anyhow::Context;
use futures::{SinkExt, StreamExt};
use log::{info, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::protocol::{RelayEvent, RelayRequest};
use crate::transport::Transport;

/// WebSocket connection to a running bridge.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("failed to reach bridge at {url}"))?;
        info!("[WsTransport] connected to {}", url);
        Ok(Self { stream })
    }

    pub async fn close(&mut self) -> anyhow::Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, msg: RelayRequest) -> anyhow::Result<()> {
        let text = serde_json::to_string(&msg)?;
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> anyhow::Result<Option<RelayEvent>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str(&text) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => warn!("[WsTransport] unreadable relay event: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}
