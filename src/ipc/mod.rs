//! Local control endpoint
//!
//! Drives the accessory's writable characteristics over TCP so a protocol
//! bridge or the `ctl` subcommand can talk to it. Uses length-prefixed JSON.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::accessory::{TelevisionAccessory, TelevisionControl};
use crate::constants::network::MAX_MESSAGE_SIZE;

mod messages;
pub use messages::{ControlRequest, ControlResponse};

/// Client connection to a running accessory
pub struct ControlClient {
    stream: TcpStream,
}

impl ControlClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .context(format!("Failed to connect to accessory at {addr}"))?;
        Ok(Self { stream })
    }

    /// Send request and wait for response
    pub async fn request(&mut self, req: ControlRequest) -> Result<ControlResponse> {
        write_message(&mut self.stream, &req).await?;
        read_message(&mut self.stream).await
    }
}

/// Listener accepting control connections
pub struct ControlServer {
    listener: TcpListener,
}

impl ControlServer {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context(format!("Failed to bind control endpoint at {addr}"))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read control endpoint address")
    }

    /// Accept connections forever, one task per client
    pub async fn serve(self, accessory: TelevisionAccessory) -> Result<()> {
        info!(address = ?self.listener.local_addr().ok(), "Control endpoint listening");
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .context("Failed to accept control connection")?;
            let accessory = accessory.clone();
            tokio::spawn(async move {
                debug!(%peer, "Control client connected");
                if let Err(e) = handle_connection(stream, &accessory).await {
                    warn!(%peer, error = ?e, "Control connection closed with error");
                }
                debug!(%peer, "Control client disconnected");
            });
        }
    }
}

/// Apply one request to the accessory
pub fn dispatch(accessory: &TelevisionAccessory, req: ControlRequest) -> ControlResponse {
    match req {
        ControlRequest::SetActive(on) => {
            accessory.set_power(on);
            ControlResponse::Ready
        }
        ControlRequest::SetActiveIdentifier(identifier) => {
            if identifier == 0 {
                return ControlResponse::Error("identifier must be positive".to_string());
            }
            accessory.set_active_identifier(identifier);
            ControlResponse::Ready
        }
        ControlRequest::GetState => ControlResponse::State(accessory.snapshot()),
        ControlRequest::ListInputs => ControlResponse::Inputs(accessory.inputs().to_vec()),
        ControlRequest::Ping => ControlResponse::Pong,
    }
}

async fn handle_connection<S>(mut stream: S, accessory: &TelevisionAccessory) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let req: ControlRequest = match read_message(&mut stream).await {
            Ok(req) => req,
            Err(e) if is_eof(&e) => return Ok(()),
            Err(e) => return Err(e),
        };
        debug!(request = ?req, "Control request");
        let resp = dispatch(accessory, req);
        write_message(&mut stream, &resp).await?;
    }
}

fn is_eof(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::UnexpectedEof)
    })
}

/// Write length-prefixed message to stream
async fn write_message<W, T>(stream: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Write length prefix (u32 little-endian)
    let len = u32::try_from(json.len()).context("Message too large to frame")?;
    stream
        .write_all(&len.to_le_bytes())
        .await
        .context("Failed to write message length")?;

    stream
        .write_all(&json)
        .await
        .context("Failed to write message payload")?;

    stream.flush().await.context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream
async fn read_message<R, T>(stream: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .await
        .context("Failed to read message payload")?;

    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}
