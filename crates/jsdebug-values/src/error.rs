use jsdebug_protocol::{ProtocolError, TransportError};
use thiserror::Error;

pub type ValueResult<T> = Result<T, ValueError>;

/// Result of an operation that may block the calling thread on a remote round trip.
///
/// Never call these from a thread that must stay responsive; see
/// [`crate::blocking::forbid_blocking`].
pub type Blocking<T> = Result<T, ValueError>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("transport: {0}")]
    Transport(TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("debug connection is closed")]
    Disconnected,
    #[error("`{operation}` is not applicable to {kind} values")]
    NotApplicable {
        operation: &'static str,
        kind: String,
    },
    #[error("`{0}` would block on a remote round trip")]
    WouldBlock(&'static str),
}

impl ValueError {
    pub fn not_applicable(operation: &'static str, kind: impl Into<String>) -> Self {
        Self::NotApplicable {
            operation,
            kind: kind.into(),
        }
    }

    /// Failures the next caller may retry by issuing a fresh request.
    pub fn is_transient(&self) -> bool {
        matches!(self, ValueError::Transport(_) | ValueError::WouldBlock(_))
    }
}

impl From<TransportError> for ValueError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionClosed => ValueError::Disconnected,
            TransportError::Protocol(err) => ValueError::Protocol(err),
            other => ValueError::Transport(other),
        }
    }
}
