//! Typed records for the browser JavaScript debug protocols.
//!
//! Two wire flavours exist: the legacy V8 JSON debugger protocol and the WebKit
//! Inspector ("WIP") protocol. Both are reduced here to the small set of typed
//! requests, responses and events the value model needs. Framing, correlation and
//! byte-level encoding stay inside [`Transport`] implementations.

mod frame;
pub mod json;
mod request;
mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use frame::{DebugEvent, FrameDescription, PauseReason, ScopeBody, ScopeRef};
pub use request::{LookupBody, Request, Response, SetTarget, ValueBody};
pub use value::{
    HandleDescription, InlineValue, PrimitiveValue, PropertyKind, PropertyName, RawProperty,
    RawRef, RefOrValue, SourceLocation, ValueKind, ATTRIBUTE_READ_ONLY,
};

/// Debuggee-assigned object identifier, valid for one pause.
///
/// V8 hands out negative handles for transient objects such as scope objects.
pub type HandleId = i64;
pub type CallFrameId = u64;
pub type ScriptId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolFlavor {
    /// Legacy V8 JSON debugger protocol.
    V8,
    /// WebKit Inspector protocol.
    Wip,
}

/// The response did not match the schema of the request it answers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("protocol error: {message}")]
pub struct ProtocolError {
    pub message: String,
}

impl ProtocolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn unexpected_response(request: &Request, response: &Response) -> Self {
        Self::new(format!(
            "`{}` request answered with a `{}` response",
            request.command(),
            response.command()
        ))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("debug connection is closed")]
    ConnectionClosed,
    #[error("timed out waiting for a reply")]
    Timeout,
    #[error("remote command `{command}` failed: {message}")]
    CommandFailed {
        command: &'static str,
        message: String,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("{0}")]
    Other(String),
}

/// Request/response seam between the value model and a protocol backend.
///
/// Implementations are shared between the IDE threads that trigger loads and the
/// receiver thread that delivers replies, so `send` takes `&self` and blocks the
/// calling thread until the correlated reply (or a failure) arrives.
pub trait Transport: Send + Sync {
    fn flavor(&self) -> ProtocolFlavor;

    fn send(&self, request: Request) -> Result<Response, TransportError>;
}
