//! Scope chains of paused frames.
//!
//! Scope contents are loaded on first access and tagged with the generation
//! the load started in. An access in a later generation reloads them, so
//! variables read after a step never come from before it.

use std::fmt;
use std::sync::{Arc, Weak};

use jsdebug_protocol::{CallFrameId, ScopeRef, SetTarget};

use crate::error::Blocking;
use crate::future::FutureCell;
use crate::loader::ValueLoader;
use crate::properties::extract_object_properties;
use crate::value::{upgrade, JsValue, ScopeObject, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeType {
    Global,
    Local,
    With,
    Closure,
    Catch,
    Unknown,
}

impl ScopeType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ScopeType::Global,
            1 => ScopeType::Local,
            2 => ScopeType::With,
            3 => ScopeType::Closure,
            4 => ScopeType::Catch,
            _ => ScopeType::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScopeType::Global => "Global",
            ScopeType::Local => "Local",
            ScopeType::With => "With",
            ScopeType::Closure => "Closure",
            ScopeType::Catch => "Catch",
            ScopeType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
struct PlainContents {
    variables: Arc<[Variable]>,
}

#[derive(Clone)]
struct WithContents {
    argument: JsValue,
}

/// Contents of one scope variant, loaded through the scope request.
trait DeferredData: Clone + Send + Sync + 'static {
    fn load(scope: &ScopeInner, loader: &ValueLoader) -> Blocking<Self>;
}

impl DeferredData for PlainContents {
    fn load(scope: &ScopeInner, loader: &ValueLoader) -> Blocking<Self> {
        let Some(loaded) = loader.load_scope_fields(scope.index, scope.frame_id)? else {
            return Ok(Self {
                variables: Arc::from(Vec::new()),
            });
        };
        let refs = extract_object_properties(&loaded.description)?;
        let owner = SetTarget::Scope {
            frame_id: scope.frame_id,
            scope_index: scope.index,
        };
        Ok(Self {
            variables: loader.load_variables(&refs, Some(owner))?,
        })
    }
}

impl DeferredData for WithContents {
    // The object a `with` statement introduces is the prototype of its scope object.
    fn load(scope: &ScopeInner, loader: &ValueLoader) -> Blocking<Self> {
        let Some(loaded) = loader.load_scope_fields(scope.index, scope.frame_id)? else {
            return Ok(Self {
                argument: JsValue::undefined(loader.current_cache_state()),
            });
        };
        let mirror = match &loaded.description.proto_object {
            Some(proto) => loader.get_or_load_value(&proto.resolve()?)?,
            None => loaded.mirror,
        };
        Ok(Self {
            argument: JsValue::from_mirror(mirror, loader.weak()),
        })
    }
}

enum ScopeData {
    Plain(FutureCell<PlainContents>),
    With(FutureCell<WithContents>),
}

struct ScopeInner {
    scope_type: ScopeType,
    index: u32,
    frame_id: CallFrameId,
    loader: Weak<ValueLoader>,
    data: ScopeData,
}

/// One link of a frame's scope chain.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("type", &self.inner.scope_type)
            .field("index", &self.inner.index)
            .field("frame_id", &self.inner.frame_id)
            .finish()
    }
}

impl Scope {
    pub fn new(frame_id: CallFrameId, scope: &ScopeRef, loader: Weak<ValueLoader>) -> Self {
        let scope_type = ScopeType::from_code(scope.scope_type);
        let data = match scope_type {
            ScopeType::With => ScopeData::With(FutureCell::new()),
            _ => ScopeData::Plain(FutureCell::new()),
        };
        Self {
            inner: Arc::new(ScopeInner {
                scope_type,
                index: scope.index,
                frame_id,
                loader,
                data,
            }),
        }
    }

    pub fn scope_type(&self) -> ScopeType {
        self.inner.scope_type
    }

    pub fn index(&self) -> u32 {
        self.inner.index
    }

    pub fn frame_id(&self) -> CallFrameId {
        self.inner.frame_id
    }

    pub fn is_with(&self) -> bool {
        matches!(self.inner.data, ScopeData::With(_))
    }

    pub fn variables(&self) -> Blocking<Arc<[Variable]>> {
        match &self.inner.data {
            ScopeData::Plain(cell) => Ok(self.deferred(cell)?.variables),
            ScopeData::With(cell) => self.deferred(cell)?.argument.properties(),
        }
    }

    /// The object of a `with` statement; `None` for other scopes.
    pub fn with_argument(&self) -> Blocking<Option<JsValue>> {
        match &self.inner.data {
            ScopeData::Plain(_) => Ok(None),
            ScopeData::With(cell) => Ok(Some(self.deferred(cell)?.argument)),
        }
    }

    pub fn as_scope_object(&self) -> ScopeObject {
        ScopeObject::new(self.clone())
    }

    /// Contents for the current generation.
    ///
    /// One caller per generation loads; others join its future. A future from
    /// an older generation, or one that failed transiently, is replaced.
    fn deferred<D: DeferredData>(&self, cell: &FutureCell<D>) -> Blocking<D> {
        let loader = upgrade(&self.inner.loader)?;
        loop {
            let generation = loader.current_cache_state();
            let observed = cell.get();
            if let Some(future) = &observed {
                if future.generation() == generation && !future.failed_transiently() {
                    return future.get_sync();
                }
            }

            let future = cell
                .init(generation, observed.is_some(), observed.as_ref())
                .run(|| D::load(&self.inner, &loader));
            let outcome = future.get_sync();
            if outcome.is_err() || future.generation() == loader.current_cache_state() {
                return outcome;
            }
            tracing::trace!(
                target: "jsdebug.values",
                frame_id = self.inner.frame_id,
                scope_index = self.inner.index,
                "scope loaded in a stale generation, reloading"
            );
        }
    }
}
