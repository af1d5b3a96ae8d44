use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CallFrameId, HandleDescription, HandleId, PropertyName, RawRef, ScopeBody};

/// Owner of a property being assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetTarget {
    /// A property of a heap object.
    Object(HandleId),
    /// A variable of a scope in a paused frame.
    Scope {
        frame_id: CallFrameId,
        scope_index: u32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Describe a set of handles.
    Lookup {
        handles: Vec<HandleId>,
        inline_refs: bool,
        max_string_length: Option<u32>,
    },
    /// Describe the scope object of one scope of a paused frame.
    Scope {
        scope_index: u32,
        frame_id: CallFrameId,
        inline_refs: bool,
    },
    /// Evaluate `expression` and assign the result to `name` on `target`.
    SetValue {
        target: SetTarget,
        name: PropertyName,
        expression: String,
    },
}

impl Request {
    pub fn command(&self) -> &'static str {
        match self {
            Request::Lookup { .. } => "lookup",
            Request::Scope { .. } => "scope",
            Request::SetValue { .. } => "setValue",
        }
    }
}

/// Reply to [`Request::Lookup`]: one description per requested handle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupBody {
    pub handles: BTreeMap<HandleId, HandleDescription>,
}

impl LookupBody {
    pub fn from_descriptions(descriptions: impl IntoIterator<Item = HandleDescription>) -> Self {
        Self {
            handles: descriptions
                .into_iter()
                .map(|desc| (desc.handle, desc))
                .collect(),
        }
    }
}

/// Reply to [`Request::SetValue`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueBody {
    pub value: RawRef,
    /// Full description of the new value when it is a heap object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<HandleDescription>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Lookup(LookupBody),
    Scope(ScopeBody),
    Value(ValueBody),
}

impl Response {
    pub fn command(&self) -> &'static str {
        match self {
            Response::Lookup(_) => "lookup",
            Response::Scope(_) => "scope",
            Response::Value(_) => "setValue",
        }
    }
}
