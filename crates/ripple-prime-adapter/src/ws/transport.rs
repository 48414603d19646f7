/*
[INPUT]:  WebSocket URL
[OUTPUT]: Open connections yielding text frames, errors, and close notifications
[POS]:    WebSocket layer - socket transport behind a trait seam
[UPDATE]: When changing the socket library or frame handling
*/

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::http::{PrimeError, Result};

/// What a connection produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    Error(String),
    Closed,
}

/// Opens socket connections
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>>;
}

/// One open socket
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next frame; `Incoming::Closed` once the peer is gone
    async fn recv(&mut self) -> Incoming;

    async fn ping(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// tokio-tungstenite backed connector
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| PrimeError::Connectivity(format!("connect {url}: {e}")))?;
        debug!(url, status = response.status().as_u16(), "websocket connected");
        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for TungsteniteConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| PrimeError::Connectivity(format!("send failed: {e}")))
    }

    async fn recv(&mut self) -> Incoming {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return Incoming::Text(text.as_str().to_string()),
                Some(Ok(WsMessage::Binary(bytes))) => {
                    return Incoming::Text(String::from_utf8_lossy(&bytes).into_owned());
                }
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {}
                Some(Ok(WsMessage::Frame(_))) => {}
                Some(Ok(WsMessage::Close(_))) | None => return Incoming::Closed,
                Some(Err(err)) => return Incoming::Error(err.to_string()),
            }
        }
    }

    async fn ping(&mut self) -> Result<()> {
        self.stream
            .send(WsMessage::Ping(Default::default()))
            .await
            .map_err(|e| PrimeError::Connectivity(format!("ping failed: {e}")))
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .map_err(|e| PrimeError::Connectivity(format!("close failed: {e}")))
    }
}
