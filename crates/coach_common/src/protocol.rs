//! Wire protocol between the client and the inference server.
//!
//! One JSON object per line in each direction over a persistent TCP
//! connection: the request carries the survey payload, the response is
//! either a `SessionReport` or an `{"error": ...}` object.

use thiserror::Error;

use crate::types::SessionReport;

/// Default inference server endpoint.
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 65432;

/// Failures from one request/response round trip.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Connection-level failure. The connection cannot self-heal, so this
    /// aborts the whole session.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Response body was not valid JSON (or not report-shaped).
    #[error("server response was not valid JSON: {raw}")]
    Malformed { raw: String },

    /// The server answered with an explicit error field. Business-level;
    /// the session loop continues.
    #[error("server reported an error: {0}")]
    Server(String),
}

impl ProtocolError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::Transport(_))
    }
}

/// Parse one response line from the server.
///
/// An object carrying an `error` field is a server-side failure; anything
/// else must deserialize as a `SessionReport`.
pub fn parse_response(raw: &str) -> Result<SessionReport, ProtocolError> {
    let trimmed = raw.trim();
    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|_| ProtocolError::Malformed {
            raw: trimmed.to_string(),
        })?;

    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ProtocolError::Server(message));
    }

    serde_json::from_value(value).map_err(|_| ProtocolError::Malformed {
        raw: trimmed.to_string(),
    })
}
