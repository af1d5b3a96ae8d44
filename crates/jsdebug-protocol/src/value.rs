use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{HandleId, ProtocolError, ScriptId};

/// V8 `PropertyAttribute::READ_ONLY`.
pub const ATTRIBUTE_READ_ONLY: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Number,
    String,
    Boolean,
    Null,
    Undefined,
    Object,
    Array,
    Function,
    Error,
    Regexp,
    Date,
    Script,
}

impl ValueKind {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            ValueKind::Number
                | ValueKind::String
                | ValueKind::Boolean
                | ValueKind::Null
                | ValueKind::Undefined
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Boolean => "boolean",
            ValueKind::Null => "null",
            ValueKind::Undefined => "undefined",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::Function => "function",
            ValueKind::Error => "error",
            ValueKind::Regexp => "regexp",
            ValueKind::Date => "date",
            ValueKind::Script => "script",
        }
    }

    /// Refines a generic `object` kind using the remote class name.
    ///
    /// The legacy V8 protocol reports arrays, dates, regexps and errors as plain
    /// objects and only distinguishes them by `className`.
    pub fn refine(self, class_name: Option<&str>) -> ValueKind {
        if self != ValueKind::Object {
            return self;
        }
        match class_name {
            Some("Array") => ValueKind::Array,
            Some("Date") => ValueKind::Date,
            Some("RegExp") => ValueKind::Regexp,
            Some(name) if name == "Error" || name.ends_with("Error") => ValueKind::Error,
            _ => ValueKind::Object,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded payload of a primitive value.
///
/// `null` and `undefined` carry no payload; their [`ValueKind`] is enough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimitiveValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl PrimitiveValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PrimitiveValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrimitiveValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrimitiveValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// JavaScript-style textual rendering, used when the debuggee did not send one.
    pub fn to_text(&self) -> String {
        match self {
            PrimitiveValue::Boolean(b) => b.to_string(),
            PrimitiveValue::Number(n) if n.is_nan() => "NaN".to_string(),
            PrimitiveValue::Number(n) if n.is_infinite() => {
                if *n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
            }
            PrimitiveValue::Number(n) if *n == 0.0 => "0".to_string(),
            PrimitiveValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e21 => format!("{n:.0}"),
            PrimitiveValue::Number(n) => n.to_string(),
            PrimitiveValue::String(s) => s.clone(),
        }
    }
}

/// Property key as delivered by the debuggee.
///
/// Integer keys stay integers and string keys stay strings; `"1"` and `1` are
/// not conflated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyName {
    Index(u32),
    Name(String),
}

impl PropertyName {
    /// Returns the array index this key addresses, if any.
    ///
    /// String keys count only in canonical form (`"7"`, never `"07"`).
    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyName::Index(idx) => Some(*idx),
            PropertyName::Name(name) => {
                let idx = name.parse::<u32>().ok()?;
                (idx.to_string() == *name).then_some(idx)
            }
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, PropertyName::Name(n) if n == name)
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyName::Index(idx) => write!(f, "{idx}"),
            PropertyName::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for PropertyName {
    fn from(name: &str) -> Self {
        PropertyName::Name(name.to_string())
    }
}

impl From<u32> for PropertyName {
    fn from(idx: u32) -> Self {
        PropertyName::Index(idx)
    }
}

/// A reference to a value as it appears inside another description.
///
/// Depending on the protocol flavour and the `inlineRefs` option the debuggee
/// either sends only `ref`, or `ref` plus enough data to render a primitive.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRef {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<HandleId>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PrimitiveValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl RawRef {
    pub fn handle(handle: HandleId) -> Self {
        Self {
            handle: Some(handle),
            ..Self::default()
        }
    }

    pub fn inline(kind: ValueKind, value: Option<PrimitiveValue>) -> Self {
        Self {
            kind: Some(kind),
            value,
            ..Self::default()
        }
    }

    /// Classifies the reference as an inline primitive or an unresolved handle.
    ///
    /// Primitive values that arrive with their payload are returned inline even
    /// when a handle is present; they are fully described and never need a lookup.
    pub fn resolve(&self) -> Result<RefOrValue, ProtocolError> {
        if let Some(kind) = self.kind.filter(|kind| kind.is_primitive()) {
            let payload_present = self.value.is_some()
                || matches!(kind, ValueKind::Null | ValueKind::Undefined);
            if payload_present {
                let text = self
                    .text
                    .clone()
                    .or_else(|| self.value.as_ref().map(PrimitiveValue::to_text))
                    .unwrap_or_else(|| kind.as_str().to_string());
                return Ok(RefOrValue::Inline(InlineValue {
                    kind,
                    value: self.value.clone(),
                    text,
                }));
            }
        }

        match self.handle {
            Some(handle) => Ok(RefOrValue::Handle {
                handle,
                hint: self.kind.map(|kind| kind.refine(self.class_name.as_deref())),
            }),
            None => Err(ProtocolError::new(
                "value reference carries neither a handle nor an inline value",
            )),
        }
    }
}

/// Fully decoded primitive carried inline by a reference.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineValue {
    pub kind: ValueKind,
    pub value: Option<PrimitiveValue>,
    pub text: String,
}

impl InlineValue {
    pub fn undefined() -> Self {
        Self {
            kind: ValueKind::Undefined,
            value: None,
            text: "undefined".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RefOrValue {
    Handle {
        handle: HandleId,
        /// Kind advertised next to the reference, if the debuggee sent one.
        hint: Option<ValueKind>,
    },
    Inline(InlineValue),
}

impl RefOrValue {
    pub fn handle(&self) -> Option<HandleId> {
        match self {
            RefOrValue::Handle { handle, .. } => Some(*handle),
            RefOrValue::Inline(_) => None,
        }
    }
}

/// V8 property classification (`propertyType`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Normal,
    Field,
    ConstantFunction,
    Callbacks,
    Handler,
    Interceptor,
    Other(u32),
}

impl PropertyKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => PropertyKind::Normal,
            1 => PropertyKind::Field,
            2 => PropertyKind::ConstantFunction,
            3 => PropertyKind::Callbacks,
            4 => PropertyKind::Handler,
            5 => PropertyKind::Interceptor,
            other => PropertyKind::Other(other),
        }
    }

    /// Real properties live on the object; handler and interceptor entries are
    /// produced by proxies / embedder interceptors.
    pub fn is_real(self) -> bool {
        !matches!(self, PropertyKind::Handler | PropertyKind::Interceptor)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProperty {
    pub name: PropertyName,
    #[serde(flatten)]
    pub value: RawRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<u32>,
}

impl RawProperty {
    pub fn new(name: impl Into<PropertyName>, value: RawRef) -> Self {
        Self {
            name: name.into(),
            value,
            property_type: None,
            attributes: None,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        self.property_type
            .map(PropertyKind::from_code)
            .unwrap_or(PropertyKind::Normal)
    }

    pub fn is_read_only(&self) -> bool {
        self.attributes
            .is_some_and(|attrs| attrs & ATTRIBUTE_READ_ONLY != 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub script_id: ScriptId,
    /// 0-based.
    pub line: u32,
    /// 0-based.
    pub column: u32,
}

/// Full description of one remote handle, as returned by `lookup`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleDescription {
    pub handle: HandleId,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PrimitiveValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// `None` when the debuggee omitted the property list for this handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<RawProperty>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_properties: Vec<RawProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto_object: Option<RawRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor_function: Option<RawRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype_object: Option<RawRef>,
    // Function-only fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<ScriptId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl HandleDescription {
    pub fn new(handle: HandleId, kind: ValueKind) -> Self {
        Self {
            handle,
            kind,
            class_name: None,
            value: None,
            text: None,
            properties: None,
            internal_properties: Vec::new(),
            proto_object: None,
            constructor_function: None,
            prototype_object: None,
            name: None,
            inferred_name: None,
            script_id: None,
            line: None,
            column: None,
        }
    }

    pub fn object(handle: HandleId, class_name: &str, properties: Vec<RawProperty>) -> Self {
        Self {
            class_name: Some(class_name.to_string()),
            properties: Some(properties),
            ..Self::new(handle, ValueKind::Object)
        }
    }

    pub fn effective_kind(&self) -> ValueKind {
        self.kind.refine(self.class_name.as_deref())
    }

    /// Function position, present only when the debuggee resolved the script.
    pub fn source_location(&self) -> Option<SourceLocation> {
        Some(SourceLocation {
            script_id: self.script_id?,
            line: self.line?,
            column: self.column.unwrap_or(0),
        })
    }

    pub fn function_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.inferred_name.as_deref())
    }
}
