use jsdebug_protocol::ProtocolFlavor;
use serde::{Deserialize, Serialize};

/// Where an object's internal properties (`__proto__`, `constructor`, ...) show up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InternalProperties {
    /// Only through `JsObject::internal_properties`.
    #[default]
    Separate,
    /// Appended to `JsObject::properties`.
    Merged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    /// Ask the debuggee to inline primitive property values into descriptions.
    pub inline_refs: bool,
    /// String truncation hint forwarded with every lookup.
    pub max_string_length: Option<u32>,
    pub internal_properties: InternalProperties,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            inline_refs: true,
            max_string_length: Some(10_000),
            internal_properties: InternalProperties::Separate,
        }
    }
}

impl LoaderConfig {
    pub fn for_flavor(flavor: ProtocolFlavor) -> Self {
        match flavor {
            ProtocolFlavor::V8 => Self::default(),
            ProtocolFlavor::Wip => Self {
                internal_properties: InternalProperties::Merged,
                ..Self::default()
            },
        }
    }
}
