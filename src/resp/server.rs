use std::sync::Arc;

use bytes::{Buf, BytesMut};
use redis_protocol::resp2::decode::decode;
use redis_protocol::resp2::encode::encode;
use redis_protocol::resp2::types::{OwnedFrame as RespFrame, Resp2Frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::handler::handle_command;
use crate::queue::QueueService;

#[derive(Debug, Clone)]
pub struct RespConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RespConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6379,
        }
    }
}

/// RESP front end over a queue backend
pub struct RespServer {
    config: RespConfig,
    service: Arc<dyn QueueService>,
}

impl RespServer {
    pub fn new(config: RespConfig, service: Arc<dyn QueueService>) -> Self {
        Self { config, service }
    }

    pub async fn run(self) -> std::io::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!(backend = self.service.name(), "tideq RESP server listening on {}", addr);

        self.serve(listener).await
    }

    /// Accepts connections on an already bound listener, one task each.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (socket, peer_addr) = listener.accept().await?;
            tracing::debug!("New connection from {}", peer_addr);

            let service = self.service.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, service).await {
                    tracing::error!("Connection error: {} (kind: {:?})", e, e.kind());
                }
            });
        }
    }
}

async fn write_frame(socket: &mut TcpStream, frame: &RespFrame) -> std::io::Result<()> {
    let mut response_bytes = vec![0u8; frame.encode_len()];
    let written = encode(&mut response_bytes, frame).map_err(|e| {
        tracing::error!("Encode error: {:?}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{:?}", e))
    })?;
    socket.write_all(&response_bytes[..written]).await
}

async fn handle_connection(
    mut socket: TcpStream,
    service: Arc<dyn QueueService>,
) -> std::io::Result<()> {
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        let n = socket.read_buf(&mut buffer).await?;

        tracing::trace!("Read {} bytes, buffer len: {}", n, buffer.len());

        if n == 0 {
            tracing::debug!("Connection closed by client");
            return Ok(());
        }

        loop {
            match decode(&buffer) {
                Ok(Some((frame, consumed))) => {
                    tracing::trace!("Received frame: {:?}", frame);

                    buffer.advance(consumed);

                    let response = handle_command(frame, service.clone()).await;

                    tracing::trace!("Sending response: {:?}", response);

                    write_frame(&mut socket, &response).await?;
                }
                Ok(None) => {
                    break;
                }
                Err(e) => {
                    tracing::warn!("Parse error: {:?}", e);
                    let error_response = RespFrame::Error(format!("ERR {}", e));
                    write_frame(&mut socket, &error_response).await?;

                    buffer.clear();
                    break;
                }
            }
        }
    }
}
