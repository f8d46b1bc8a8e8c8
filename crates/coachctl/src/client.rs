//! TCP client for communicating with the inference server.

use coach_common::protocol::{self, ProtocolError};
use coach_common::types::{SessionReport, SurveyResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Client holding the persistent connection to the inference server.
///
/// The connection is established once at startup and reused for every
/// request; transport failures are fatal for the session because the
/// connection cannot self-heal. Retry policy, where it exists, lives in the
/// caller.
pub struct InferenceClient {
    stream: TcpStream,
}

impl InferenceClient {
    /// Connect to the inference server.
    pub async fn connect(host: &str, port: u16) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect((host, port)).await.map_err(|e| {
            ProtocolError::Transport(format!("cannot connect to {host}:{port}: {e}"))
        })?;
        Ok(Self { stream })
    }

    /// Send one survey payload and read the server's report.
    ///
    /// Both directions carry one newline-terminated JSON object, so a large
    /// report is read to its delimiter instead of being truncated at an
    /// arbitrary buffer size.
    pub async fn send(&mut self, payload: &SurveyResponse) -> Result<SessionReport, ProtocolError> {
        let request = serde_json::to_string(payload)
            .map_err(|e| ProtocolError::Transport(format!("failed to encode request: {e}")))?;

        self.stream
            .write_all(format!("{request}\n").as_bytes())
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;

        let (reader, _) = self.stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;

        if bytes_read == 0 {
            return Err(ProtocolError::Transport(
                "server closed the connection".to_string(),
            ));
        }

        debug!(raw = %line.trim(), "server response");
        protocol::parse_response(&line)
    }

    /// Close the connection before exit.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
