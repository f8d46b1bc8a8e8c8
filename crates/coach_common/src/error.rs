//! Session error taxonomy.
//!
//! Only transport-level failures terminate the controller; everything else
//! is caught at the nearest enclosing step, logged, and turned into an
//! audible message so the session can continue.

use thiserror::Error;

use crate::distribution::DistributionError;
use crate::protocol::ProtocolError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed server response: {0}")]
    MalformedResponse(String),

    #[error("server reported an error: {0}")]
    ServerReported(String),

    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("could not extract a usable rating after {attempts} attempts")]
    InputAmbiguous { attempts: usize },

    #[error("speech service failure: {0}")]
    Speech(String),

    #[error("completion service failure: {0}")]
    Completion(String),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Transport(msg) => SessionError::Transport(msg),
            ProtocolError::Malformed { raw } => SessionError::MalformedResponse(raw),
            ProtocolError::Server(msg) => SessionError::ServerReported(msg),
        }
    }
}

impl SessionError {
    /// Whether this error terminates the controller. Capability transport
    /// failures cannot be talked around: there is no voice left to apologize
    /// with.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Transport(_)
                | SessionError::Speech(_)
                | SessionError::Completion(_)
                | SessionError::Io(_)
        )
    }
}
