use serde::{Deserialize, Serialize};

use crate::{CallFrameId, HandleDescription, RawRef, SourceLocation};

/// Scope descriptor carried by a frame description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRef {
    /// Numeric scope type code (`0=Global, 1=Local, 2=With, 3=Closure, 4=Catch`).
    #[serde(rename = "type")]
    pub scope_type: i64,
    pub index: u32,
    /// Reference to the scope object, when the debuggee sent one up front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<RawRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDescription {
    /// Frame identifier used by scope requests (the frame number for V8).
    pub id: CallFrameId,
    #[serde(default)]
    pub function_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub receiver: RawRef,
    #[serde(default)]
    pub scopes: Vec<ScopeRef>,
}

/// Reply to a scope request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeBody {
    pub index: u32,
    pub frame_index: CallFrameId,
    #[serde(rename = "type")]
    pub scope_type: i64,
    /// `None` when the debuggee could not materialise the scope object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<HandleDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PauseReason {
    Breakpoint,
    Step,
    Exception,
    DebuggerStatement,
    Other,
}

impl PauseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PauseReason::Breakpoint => "breakpoint",
            PauseReason::Step => "step",
            PauseReason::Exception => "exception",
            PauseReason::DebuggerStatement => "debugger",
            PauseReason::Other => "pause",
        }
    }
}

/// Events delivered by the transport's receiver thread.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugEvent {
    Paused {
        frames: Vec<FrameDescription>,
        reason: PauseReason,
    },
    Resumed,
    Disconnected,
}
