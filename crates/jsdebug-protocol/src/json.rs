//! JSON decoding of response bodies.
//!
//! Transports receive bodies as `serde_json::Value` and use these helpers to
//! produce typed [`Response`]s; schema violations become [`ProtocolError`]s.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    DebugEvent, FrameDescription, LookupBody, PauseReason, ProtocolError, Request, Response,
    ScopeBody, ValueBody,
};

pub fn decode<T: DeserializeOwned>(command: &str, body: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(body)
        .map_err(|err| ProtocolError::new(format!("malformed `{command}` body: {err}")))
}

/// Decodes the body of the reply to `request`.
pub fn decode_response(request: &Request, body: Value) -> Result<Response, ProtocolError> {
    let command = request.command();
    Ok(match request {
        Request::Lookup { .. } => Response::Lookup(decode::<LookupBody>(command, body)?),
        Request::Scope { .. } => Response::Scope(decode::<ScopeBody>(command, body)?),
        Request::SetValue { .. } => Response::Value(decode::<ValueBody>(command, body)?),
    })
}

/// Decodes a `break`/`exception` event body into [`DebugEvent::Paused`].
pub fn decode_paused(reason: PauseReason, frames: Value) -> Result<DebugEvent, ProtocolError> {
    let frames: Vec<FrameDescription> = decode("backtrace", frames)?;
    Ok(DebugEvent::Paused { frames, reason })
}
