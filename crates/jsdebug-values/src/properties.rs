//! Raw object descriptions to ordered property references.

use std::collections::HashMap;

use jsdebug_protocol::{
    HandleDescription, PropertyKind, PropertyName, ProtocolError, RawProperty, RawRef,
    RefOrValue,
};

const PROTO: &str = "__proto__";
const CONSTRUCTOR: &str = "constructor";
const PROTOTYPE: &str = "prototype";

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyRef {
    pub name: PropertyName,
    pub target: RefOrValue,
    pub kind: PropertyKind,
    pub read_only: bool,
}

impl PropertyRef {
    pub fn new(name: impl Into<PropertyName>, target: RefOrValue) -> Self {
        Self {
            name: name.into(),
            target,
            kind: PropertyKind::Normal,
            read_only: false,
        }
    }

    fn from_raw(raw: &RawProperty) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: raw.name.clone(),
            target: raw.value.resolve()?,
            kind: raw.kind(),
            read_only: raw.is_read_only(),
        })
    }

    fn synthetic(name: &str, raw: &RawRef) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: PropertyName::Name(name.to_string()),
            target: raw.resolve()?,
            kind: PropertyKind::Normal,
            read_only: true,
        })
    }
}

/// V8 stores hidden properties under an empty name; they are not part of the
/// object as seen from script.
fn is_sentinel(name: &PropertyName) -> bool {
    matches!(name, PropertyName::Name(name) if name.is_empty())
}

/// Collects properties in delivery order, one per name. `1` and `"1"` are
/// the same name.
///
/// A later real property replaces an earlier interceptor/handler entry of the
/// same name in place; any other duplicate is dropped.
fn collect(raw: &[RawProperty]) -> Result<Vec<PropertyRef>, ProtocolError> {
    let mut out: Vec<PropertyRef> = Vec::with_capacity(raw.len());
    let mut positions: HashMap<PropertyName, usize> = HashMap::with_capacity(raw.len());

    for property in raw {
        if is_sentinel(&property.name) {
            continue;
        }
        let property = PropertyRef::from_raw(property)?;
        let key = match property.name.as_index() {
            Some(index) => PropertyName::Index(index),
            None => property.name.clone(),
        };
        match positions.get(&key) {
            Some(&pos) => {
                if !out[pos].kind.is_real() && property.kind.is_real() {
                    out[pos] = property;
                }
            }
            None => {
                positions.insert(key, out.len());
                out.push(property);
            }
        }
    }
    Ok(out)
}

pub fn extract_object_properties(
    description: &HandleDescription,
) -> Result<Vec<PropertyRef>, ProtocolError> {
    match &description.properties {
        Some(raw) => collect(raw),
        None => Ok(Vec::new()),
    }
}

/// Internal properties: the explicit list followed by the `__proto__`,
/// `constructor` and `prototype` slots.
///
/// A slot is skipped when a property of the same name is already visible; in
/// particular an explicit `__proto__` hides the synthesised one.
pub fn extract_internal_properties(
    description: &HandleDescription,
) -> Result<Vec<PropertyRef>, ProtocolError> {
    let mut out = collect(&description.internal_properties)?;

    let is_shadowed = |name: &str, out: &[PropertyRef]| {
        out.iter().any(|prop| prop.name.is_named(name))
            || description
                .properties
                .iter()
                .flatten()
                .any(|prop| prop.name.is_named(name))
    };

    let slots = [
        (PROTO, &description.proto_object),
        (CONSTRUCTOR, &description.constructor_function),
        (PROTOTYPE, &description.prototype_object),
    ];
    for (name, slot) in slots {
        let Some(raw) = slot else {
            continue;
        };
        if is_shadowed(name, &out) {
            continue;
        }
        out.push(PropertyRef::synthetic(name, raw)?);
    }
    Ok(out)
}
