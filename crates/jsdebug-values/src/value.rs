//! IDE-facing value tree.
//!
//! Values are thin views over [`ValueMirror`]s. They hold the loader weakly:
//! once the debug context is gone every remote read fails with
//! [`ValueError::Disconnected`].

use std::fmt;
use std::sync::{Arc, Weak};

use jsdebug_protocol::{
    HandleId, InlineValue, PrimitiveValue, PropertyKind, PropertyName, RefOrValue, SetTarget,
    SourceLocation, TransportError, ValueKind,
};
use parking_lot::{Mutex, RwLock};

use crate::cache::CacheGeneration;
use crate::error::{Blocking, ValueError, ValueResult};
use crate::loader::ValueLoader;
use crate::mirror::ValueMirror;
use crate::properties::PropertyRef;
use crate::scope::Scope;

pub(crate) fn upgrade(loader: &Weak<ValueLoader>) -> ValueResult<Arc<ValueLoader>> {
    loader.upgrade().ok_or(ValueError::Disconnected)
}

#[derive(Clone, Debug)]
pub enum JsValue {
    Primitive(JsPrimitive),
    Object(JsObject),
    Array(JsArray),
    Function(JsFunction),
    ScopeObject(ScopeObject),
}

impl JsValue {
    pub fn from_mirror(mirror: Arc<ValueMirror>, loader: Weak<ValueLoader>) -> Self {
        match mirror.kind() {
            kind if kind.is_primitive() => JsValue::Primitive(JsPrimitive { mirror }),
            ValueKind::Array => JsValue::Array(JsArray {
                object: JsObject::new(mirror, loader),
            }),
            ValueKind::Function => JsValue::Function(JsFunction {
                object: JsObject::new(mirror, loader),
            }),
            _ => JsValue::Object(JsObject::new(mirror, loader)),
        }
    }

    pub fn undefined(generation: CacheGeneration) -> Self {
        JsValue::Primitive(JsPrimitive {
            mirror: Arc::new(ValueMirror::inline(&InlineValue::undefined(), generation)),
        })
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            JsValue::Primitive(value) => value.kind(),
            JsValue::Object(object) => object.mirror().kind(),
            JsValue::Array(array) => array.object.mirror().kind(),
            JsValue::Function(function) => function.object.mirror().kind(),
            JsValue::ScopeObject(_) => ValueKind::Object,
        }
    }

    pub fn value_string(&self) -> String {
        match self {
            JsValue::Primitive(value) => value.text(),
            JsValue::Object(object) => object.value_string(),
            JsValue::Array(array) => array.object.value_string(),
            JsValue::Function(function) => function.object.value_string(),
            JsValue::ScopeObject(scope) => scope.class_name().to_string(),
        }
    }

    pub fn class_name(&self) -> Option<String> {
        match self {
            JsValue::Primitive(_) => None,
            JsValue::ScopeObject(scope) => Some(scope.class_name().to_string()),
            other => other.as_object().and_then(JsObject::class_name),
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.kind() == ValueKind::Undefined
    }

    pub fn as_primitive(&self) -> Option<&JsPrimitive> {
        match self {
            JsValue::Primitive(value) => Some(value),
            _ => None,
        }
    }

    /// The object view of objects, arrays and functions.
    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(object) => Some(object),
            JsValue::Array(array) => Some(&array.object),
            JsValue::Function(function) => Some(&function.object),
            JsValue::Primitive(_) | JsValue::ScopeObject(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&JsArray> {
        match self {
            JsValue::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&JsFunction> {
        match self {
            JsValue::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_scope_object(&self) -> Option<&ScopeObject> {
        match self {
            JsValue::ScopeObject(scope) => Some(scope),
            _ => None,
        }
    }

    /// Children as shown in a variables view; empty for primitives.
    pub fn properties(&self) -> Blocking<Arc<[Variable]>> {
        match self {
            JsValue::Primitive(_) => Ok(Arc::from(Vec::new())),
            JsValue::ScopeObject(scope) => scope.properties(),
            other => match other.as_object() {
                Some(object) => object.properties(),
                None => Ok(Arc::from(Vec::new())),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct JsPrimitive {
    mirror: Arc<ValueMirror>,
}

impl JsPrimitive {
    pub fn kind(&self) -> ValueKind {
        self.mirror.kind()
    }

    pub fn value(&self) -> Option<PrimitiveValue> {
        self.mirror.data().and_then(|data| data.value.clone())
    }

    pub fn text(&self) -> String {
        self.mirror.text()
    }
}

#[derive(Debug)]
struct ObjectInner {
    mirror: RwLock<Arc<ValueMirror>>,
    loader: Weak<ValueLoader>,
}

/// A remote heap object.
#[derive(Clone, Debug)]
pub struct JsObject {
    inner: Arc<ObjectInner>,
}

impl JsObject {
    fn new(mirror: Arc<ValueMirror>, loader: Weak<ValueLoader>) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                mirror: RwLock::new(mirror),
                loader,
            }),
        }
    }

    pub fn handle(&self) -> Option<HandleId> {
        self.mirror().handle()
    }

    /// The mirror this view last resolved to.
    pub fn mirror(&self) -> Arc<ValueMirror> {
        self.inner.mirror.read().clone()
    }

    pub fn class_name(&self) -> Option<String> {
        self.mirror().class_name()
    }

    pub fn value_string(&self) -> String {
        self.mirror().text()
    }

    /// Mirror of the current generation, reloading a stale or incomplete one.
    fn fresh_mirror(&self, loader: &ValueLoader) -> Blocking<Arc<ValueMirror>> {
        let mirror = self.mirror();
        if mirror.generation() == loader.current_cache_state() && !mirror.needs_load() {
            return Ok(mirror);
        }
        let Some(handle) = mirror.handle() else {
            return Ok(mirror);
        };
        let fresh = loader.get_or_load_value(&RefOrValue::Handle {
            handle,
            hint: Some(mirror.kind()),
        })?;
        *self.inner.mirror.write() = fresh.clone();
        Ok(fresh)
    }

    /// Properties in the order the debuggee delivered them.
    ///
    /// Loaded on first call and cached on the mirror; after a resume the object
    /// is looked up again and the list rebuilt from scratch.
    pub fn properties(&self) -> Blocking<Arc<[Variable]>> {
        let loader = upgrade(&self.inner.loader)?;
        let mirror = self.fresh_mirror(&loader)?;

        let observed = mirror.children.get();
        if let Some(future) = &observed {
            if !future.failed_transiently() {
                return future.get_sync();
            }
        }
        mirror
            .children
            .init(mirror.generation(), true, observed.as_ref())
            .run(|| loader.object_variables(&mirror))
            .get_sync()
    }

    pub fn property(&self, name: &str) -> Blocking<Option<Variable>> {
        Ok(self
            .properties()?
            .iter()
            .find(|variable| variable.name() == name)
            .cloned())
    }

    /// `__proto__`, `constructor`, `prototype` and engine-internal slots.
    pub fn internal_properties(&self) -> Blocking<Arc<[Variable]>> {
        let loader = upgrade(&self.inner.loader)?;
        let mirror = self.fresh_mirror(&loader)?;
        match mirror.data() {
            Some(data) => loader.load_variables(&data.internal_properties, None),
            None => Ok(Arc::from(Vec::new())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct JsArray {
    object: JsObject,
}

impl JsArray {
    pub fn object(&self) -> &JsObject {
        &self.object
    }

    /// The numeric `length` property, or the highest index plus one.
    pub fn length(&self) -> Blocking<u32> {
        let properties = self.object.properties()?;
        let explicit = properties
            .iter()
            .find(|variable| variable.property_name().is_named("length"))
            .and_then(|variable| variable.mirror().data())
            .and_then(|data| data.value.as_ref().and_then(PrimitiveValue::as_f64))
            .filter(|len| len.is_finite() && *len >= 0.0);
        if let Some(len) = explicit {
            return Ok(len.min(u32::MAX as f64) as u32);
        }
        Ok(properties
            .iter()
            .filter_map(|variable| variable.property_name().as_index())
            .max()
            .map_or(0, |max| max.saturating_add(1)))
    }

    /// Element at `index`; holes read as `undefined`.
    pub fn get(&self, index: u32) -> Blocking<JsValue> {
        let properties = self.object.properties()?;
        Ok(properties
            .iter()
            .find(|variable| variable.property_name().as_index() == Some(index))
            .map(Variable::value)
            .unwrap_or_else(|| JsValue::undefined(self.object.mirror().generation())))
    }

    /// Present elements sorted by index.
    pub fn elements(&self) -> Blocking<Vec<(u32, Variable)>> {
        let mut elements: Vec<(u32, Variable)> = self
            .object
            .properties()?
            .iter()
            .filter_map(|variable| Some((variable.property_name().as_index()?, variable.clone())))
            .collect();
        elements.sort_by_key(|(index, _)| *index);
        Ok(elements)
    }
}

#[derive(Clone, Debug)]
pub struct JsFunction {
    object: JsObject,
}

impl JsFunction {
    pub fn object(&self) -> &JsObject {
        &self.object
    }

    pub fn name(&self) -> Option<String> {
        self.object
            .mirror()
            .data()
            .and_then(|data| data.function_name.clone())
    }

    pub fn source_location(&self) -> Option<SourceLocation> {
        self.object.mirror().data().and_then(|data| data.location)
    }
}

/// A scope presented as a read-only object whose properties are its variables.
#[derive(Clone, Debug)]
pub struct ScopeObject {
    scope: Scope,
}

impl ScopeObject {
    pub(crate) fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// `<GLOBAL>`, `<LOCAL>` and so on.
    pub fn name(&self) -> String {
        format!("<{}>", self.scope.scope_type().as_str().to_ascii_uppercase())
    }

    pub fn class_name(&self) -> &'static str {
        "#Scope"
    }

    pub fn is_mutable(&self) -> bool {
        false
    }

    pub fn properties(&self) -> Blocking<Arc<[Variable]>> {
        self.scope.variables()
    }

    pub fn property(&self, name: &str) -> Blocking<Option<Variable>> {
        Ok(self
            .properties()?
            .iter()
            .find(|variable| variable.name() == name)
            .cloned())
    }
}

struct VariableInner {
    name: PropertyName,
    kind: PropertyKind,
    read_only: bool,
    owner: Option<SetTarget>,
    value: RwLock<Arc<ValueMirror>>,
    loader: Weak<ValueLoader>,
}

/// A named slot of an object or scope.
#[derive(Clone)]
pub struct Variable {
    inner: Arc<VariableInner>,
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.inner.name)
            .field("value", &self.mirror())
            .field("mutable", &self.is_mutable())
            .finish()
    }
}

impl Variable {
    pub(crate) fn new(
        property: &PropertyRef,
        mirror: Arc<ValueMirror>,
        owner: Option<SetTarget>,
        loader: Weak<ValueLoader>,
    ) -> Self {
        Self {
            inner: Arc::new(VariableInner {
                name: property.name.clone(),
                kind: property.kind,
                read_only: property.read_only,
                owner,
                value: RwLock::new(mirror),
                loader,
            }),
        }
    }

    pub fn name(&self) -> String {
        self.inner.name.to_string()
    }

    pub fn property_name(&self) -> &PropertyName {
        &self.inner.name
    }

    pub fn mirror(&self) -> Arc<ValueMirror> {
        self.inner.value.read().clone()
    }

    pub fn value(&self) -> JsValue {
        JsValue::from_mirror(self.mirror(), self.inner.loader.clone())
    }

    pub fn is_mutable(&self) -> bool {
        !self.inner.read_only && self.inner.kind.is_real() && self.inner.owner.is_some()
    }

    /// Evaluates `expression` in the debuggee and stores the result in this slot.
    pub fn set_value(&self, expression: &str) -> Blocking<JsValue> {
        let owner = match &self.inner.owner {
            Some(owner) if self.is_mutable() => owner.clone(),
            _ => return Err(ValueError::not_applicable("setValue", "read-only")),
        };
        let loader = upgrade(&self.inner.loader)?;
        let mirror = loader.set_value(owner, self.inner.name.clone(), expression)?;
        *self.inner.value.write() = mirror.clone();
        Ok(JsValue::from_mirror(mirror, self.inner.loader.clone()))
    }

    /// [`Variable::set_value`] on a worker thread; `callback` runs there.
    pub fn set_value_async<F>(&self, expression: impl Into<String>, callback: F)
    where
        F: FnOnce(Blocking<JsValue>) + Send + 'static,
    {
        let variable = self.clone();
        let expression = expression.into();
        let callback = Arc::new(Mutex::new(Some(callback)));
        let worker_callback = callback.clone();

        let spawned = std::thread::Builder::new()
            .name("jsdebug-set-value".to_string())
            .spawn(move || {
                let result = variable.set_value(&expression);
                if let Some(callback) = worker_callback.lock().take() {
                    callback(result);
                }
            });

        if let Err(err) = spawned {
            if let Some(callback) = callback.lock().take() {
                callback(Err(ValueError::Transport(TransportError::Other(format!(
                    "failed to spawn setValue worker: {err}"
                )))));
            }
        }
    }
}
