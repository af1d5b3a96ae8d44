use std::fmt;
use std::sync::Arc;

use jsdebug_protocol::{
    HandleDescription, HandleId, InlineValue, PrimitiveValue, PropertyName, ProtocolError,
    RefOrValue, SourceLocation, ValueKind,
};
use parking_lot::RwLock;

use crate::cache::CacheGeneration;
use crate::future::FutureCell;
use crate::properties::{extract_internal_properties, extract_object_properties, PropertyRef};
use crate::value::Variable;

/// Parsed contents of one remote value.
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorData {
    pub kind: ValueKind,
    pub class_name: Option<String>,
    pub text: String,
    pub value: Option<PrimitiveValue>,
    /// `None` until a description with a property list arrived.
    pub properties: Option<Arc<[PropertyRef]>>,
    pub internal_properties: Arc<[PropertyRef]>,
    pub function_name: Option<String>,
    pub location: Option<SourceLocation>,
}

impl MirrorData {
    pub fn from_inline(value: &InlineValue) -> Self {
        Self {
            kind: value.kind,
            class_name: None,
            text: value.text.clone(),
            value: value.value.clone(),
            properties: None,
            internal_properties: Arc::from(Vec::new()),
            function_name: None,
            location: None,
        }
    }

    pub fn undefined() -> Self {
        Self::from_inline(&InlineValue::undefined())
    }

    pub fn from_description(description: &HandleDescription) -> Result<Self, ProtocolError> {
        let kind = description.effective_kind();
        let properties = match description.properties {
            Some(_) => Some(Arc::from(extract_object_properties(description)?)),
            None => None,
        };
        let text = description
            .text
            .clone()
            .or_else(|| description.value.as_ref().map(PrimitiveValue::to_text))
            .or_else(|| description.class_name.as_ref().map(|class| format!("#<{class}>")))
            .unwrap_or_else(|| kind.as_str().to_string());

        Ok(Self {
            kind,
            class_name: description.class_name.clone(),
            text,
            value: description.value.clone(),
            properties,
            internal_properties: Arc::from(extract_internal_properties(description)?),
            function_name: description.function_name().map(str::to_string),
            location: description.source_location(),
        })
    }

    /// A value needs a lookup until it is known, and objects until their
    /// properties are known.
    fn is_complete(&self) -> bool {
        self.kind.is_primitive() || self.properties.is_some()
    }
}

/// Local snapshot of one remote value, tagged with the generation it was
/// created in.
pub struct ValueMirror {
    handle: Option<HandleId>,
    generation: CacheGeneration,
    hint: Option<ValueKind>,
    data: RwLock<Option<Arc<MirrorData>>>,
    pub(crate) children: FutureCell<Arc<[Variable]>>,
}

impl fmt::Debug for ValueMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueMirror")
            .field("handle", &self.handle)
            .field("generation", &self.generation)
            .field("kind", &self.kind())
            .field("loaded", &!self.needs_load())
            .finish()
    }
}

impl ValueMirror {
    /// Placeholder for a handle nobody described yet.
    pub(crate) fn placeholder(
        handle: HandleId,
        hint: Option<ValueKind>,
        generation: CacheGeneration,
    ) -> Self {
        Self {
            handle: Some(handle),
            generation,
            hint,
            data: RwLock::new(None),
            children: FutureCell::new(),
        }
    }

    pub(crate) fn with_data(
        handle: Option<HandleId>,
        data: MirrorData,
        generation: CacheGeneration,
    ) -> Self {
        Self {
            handle,
            generation,
            hint: Some(data.kind),
            data: RwLock::new(Some(Arc::new(data))),
            children: FutureCell::new(),
        }
    }

    /// Immutable primitive mirror; never stored in a registry.
    pub fn inline(value: &InlineValue, generation: CacheGeneration) -> Self {
        Self::with_data(None, MirrorData::from_inline(value), generation)
    }

    pub fn from_target(target: &RefOrValue, generation: CacheGeneration) -> Self {
        match target {
            RefOrValue::Handle { handle, hint } => Self::placeholder(*handle, *hint, generation),
            RefOrValue::Inline(value) => Self::inline(value, generation),
        }
    }

    pub fn handle(&self) -> Option<HandleId> {
        self.handle
    }

    pub fn generation(&self) -> CacheGeneration {
        self.generation
    }

    pub fn data(&self) -> Option<Arc<MirrorData>> {
        self.data.read().clone()
    }

    pub fn needs_load(&self) -> bool {
        self.data
            .read()
            .as_ref()
            .is_none_or(|data| !data.is_complete())
    }

    pub fn kind(&self) -> ValueKind {
        match self.data.read().as_ref() {
            Some(data) => data.kind,
            None => self.hint.unwrap_or(ValueKind::Object),
        }
    }

    pub fn class_name(&self) -> Option<String> {
        self.data.read().as_ref().and_then(|data| data.class_name.clone())
    }

    /// Textual rendering; the kind name until the value is loaded.
    pub fn text(&self) -> String {
        match self.data.read().as_ref() {
            Some(data) => data.text.clone(),
            None => self.kind().as_str().to_string(),
        }
    }

    /// Merges a new description into this mirror.
    ///
    /// A description without a property list keeps the list already published.
    pub(crate) fn install(&self, mut incoming: MirrorData) {
        let mut data = self.data.write();
        if incoming.properties.is_none() {
            if let Some(current) = data.as_ref() {
                incoming.properties = current.properties.clone();
            }
        }
        let changed = data
            .as_ref()
            .map_or(true, |current| current.properties != incoming.properties);
        *data = Some(Arc::new(incoming));
        drop(data);
        if changed {
            self.children.clear();
        }
    }

    pub(crate) fn mark_stale(&self) {
        *self.data.write() = Some(Arc::new(MirrorData::undefined()));
        self.children.clear();
    }

    /// Points the property `name` at `target` after an assignment.
    pub(crate) fn replace_property(&self, name: &PropertyName, target: &RefOrValue) {
        let mut data = self.data.write();
        let Some(current) = data.as_ref() else {
            return;
        };
        let Some(properties) = current.properties.as_ref() else {
            return;
        };
        if !properties.iter().any(|prop| &prop.name == name) {
            return;
        }
        let properties: Vec<PropertyRef> = properties
            .iter()
            .map(|prop| {
                if &prop.name == name {
                    PropertyRef {
                        target: target.clone(),
                        ..prop.clone()
                    }
                } else {
                    prop.clone()
                }
            })
            .collect();
        let updated = MirrorData {
            properties: Some(Arc::from(properties)),
            ..MirrorData::clone(current)
        };
        *data = Some(Arc::new(updated));
    }

    /// Drops the cached children, breaking mirror -> variable -> mirror cycles.
    pub(crate) fn detach(&self) {
        self.children.clear();
    }
}
