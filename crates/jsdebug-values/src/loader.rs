//! Handle resolution against the debuggee.
//!
//! The loader owns the per-context lock guarding the mirror registry and the
//! pending-load table. A caller that needs unloaded handles claims them under
//! the lock, sends one `lookup` for exactly those handles without holding it,
//! then installs the reply and satisfies the pending futures. Callers that need
//! a handle somebody else already claimed wait on that caller's future instead
//! of fetching it again.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use jsdebug_protocol::{
    CallFrameId, HandleDescription, HandleId, LookupBody, PropertyName, ProtocolError,
    ProtocolFlavor, RefOrValue, Request, Response, SetTarget, Transport,
};
use parking_lot::Mutex;

use crate::blocking;
use crate::cache::{CacheController, CacheGeneration};
use crate::config::{InternalProperties, LoaderConfig};
use crate::error::{Blocking, ValueError, ValueResult};
use crate::future::AsyncFuture;
use crate::mirror::{MirrorData, ValueMirror};
use crate::properties::PropertyRef;
use crate::registry::MirrorRegistry;
use crate::value::Variable;

type Pending = Arc<AsyncFuture<Arc<ValueMirror>>>;

/// Scope object returned by [`ValueLoader::load_scope_fields`].
#[derive(Debug, Clone)]
pub struct LoadedScope {
    pub description: HandleDescription,
    pub mirror: Arc<ValueMirror>,
    pub generation: CacheGeneration,
}

#[derive(Debug)]
struct LoaderState {
    registry: MirrorRegistry,
    pending: HashMap<HandleId, Pending>,
    disconnected: bool,
}

enum Slot {
    Ready(Arc<ValueMirror>),
    Waiting(Pending),
}

pub struct ValueLoader {
    transport: Arc<dyn Transport>,
    cache: Arc<CacheController>,
    config: LoaderConfig,
    state: Mutex<LoaderState>,
    this: Weak<ValueLoader>,
}

impl std::fmt::Debug for ValueLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueLoader")
            .field("flavor", &self.transport.flavor())
            .field("generation", &self.cache.current())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ValueLoader {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<CacheController>,
        config: LoaderConfig,
    ) -> Arc<Self> {
        let generation = cache.current();
        Arc::new_cyclic(|this| Self {
            transport,
            cache,
            config,
            state: Mutex::new(LoaderState {
                registry: MirrorRegistry::new(generation),
                pending: HashMap::new(),
                disconnected: false,
            }),
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn flavor(&self) -> ProtocolFlavor {
        self.transport.flavor()
    }

    pub fn current_cache_state(&self) -> CacheGeneration {
        self.cache.current()
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.lock().disconnected
    }

    /// Registry entry for `handle` in the current generation, if any.
    pub fn cached(&self, handle: HandleId) -> Option<Arc<ValueMirror>> {
        self.state.lock().registry.get(handle)
    }

    pub fn cached_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    pub(crate) fn weak(&self) -> Weak<ValueLoader> {
        self.this.clone()
    }

    /// Loaded mirrors for `refs`, in input order.
    ///
    /// Returns only once every mirror belongs to one generation; a resume during
    /// the load makes the whole list be resolved again.
    pub fn get_or_load_value_from_refs(
        &self,
        refs: &[PropertyRef],
    ) -> Blocking<Vec<Arc<ValueMirror>>> {
        let targets: Vec<&RefOrValue> = refs.iter().map(|prop| &prop.target).collect();
        self.load_targets(&targets)
    }

    pub fn get_or_load_value(&self, target: &RefOrValue) -> Blocking<Arc<ValueMirror>> {
        self.load_targets(&[target])?
            .pop()
            .ok_or_else(|| ProtocolError::new("lookup produced no mirror").into())
    }

    fn load_targets(&self, targets: &[&RefOrValue]) -> Blocking<Vec<Arc<ValueMirror>>> {
        loop {
            let (generation, slots, batch) = self.claim(targets)?;
            if !batch.is_empty() {
                self.fetch(generation, batch);
            }

            let mut mirrors = Vec::with_capacity(slots.len());
            for slot in slots {
                mirrors.push(match slot {
                    Slot::Ready(mirror) => mirror,
                    Slot::Waiting(future) => future.get_sync()?,
                });
            }

            if self.cache.current() == generation {
                return Ok(mirrors);
            }
            tracing::trace!(
                target: "jsdebug.values",
                generation,
                "generation changed during load, resolving again"
            );
        }
    }

    /// Classifies `targets` and registers this caller as the fetcher of every
    /// unloaded handle nobody else is fetching.
    fn claim(
        &self,
        targets: &[&RefOrValue],
    ) -> ValueResult<(CacheGeneration, Vec<Slot>, Vec<(HandleId, Pending)>)> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.disconnected {
            return Err(ValueError::Disconnected);
        }
        let generation = state.registry.generation();

        let must_fetch = targets.iter().any(|target| match target {
            RefOrValue::Handle { handle, .. } => {
                !state.pending.contains_key(handle)
                    && state
                        .registry
                        .get(*handle)
                        .is_none_or(|mirror| mirror.needs_load())
            }
            RefOrValue::Inline(_) => false,
        });
        if must_fetch {
            blocking::check("ValueLoader::get_or_load_value_from_refs")?;
        }

        let mut slots = Vec::with_capacity(targets.len());
        let mut batch = Vec::new();
        for target in targets {
            let mirror = state.registry.add_data_from_ref(target);
            let handle = match mirror.handle() {
                Some(handle) if mirror.needs_load() => handle,
                _ => {
                    slots.push(Slot::Ready(mirror));
                    continue;
                }
            };
            if let Some(pending) = state.pending.get(&handle) {
                slots.push(Slot::Waiting(pending.clone()));
                continue;
            }
            let pending: Pending = Arc::new(AsyncFuture::new(generation));
            state.pending.insert(handle, pending.clone());
            batch.push((handle, pending.clone()));
            slots.push(Slot::Waiting(pending));
        }
        Ok((generation, slots, batch))
    }

    fn fetch(&self, generation: CacheGeneration, batch: Vec<(HandleId, Pending)>) {
        let handles: Vec<HandleId> = batch.iter().map(|(handle, _)| *handle).collect();
        tracing::debug!(
            target: "jsdebug.values",
            generation,
            count = handles.len(),
            "dispatching lookup"
        );
        let request = Request::Lookup {
            handles,
            inline_refs: self.config.inline_refs,
            max_string_length: self.config.max_string_length,
        };
        let reply = self.send(request.clone()).and_then(|response| match response {
            Response::Lookup(body) => Ok(body),
            other => Err(ProtocolError::unexpected_response(&request, &other).into()),
        });

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let completions: Vec<(Pending, ValueResult<Arc<ValueMirror>>)> = match &reply {
            Ok(body) => batch
                .iter()
                .map(|(handle, future)| {
                    (future.clone(), Self::install_reply(state, generation, body, *handle))
                })
                .collect(),
            Err(err) => batch
                .iter()
                .map(|(_, future)| (future.clone(), Err(err.clone())))
                .collect(),
        };
        for (handle, future) in &batch {
            if state
                .pending
                .get(handle)
                .is_some_and(|current| Arc::ptr_eq(current, future))
            {
                state.pending.remove(handle);
            }
        }
        drop(guard);

        for (future, outcome) in completions {
            future.complete(outcome);
        }
    }

    fn install_reply(
        state: &mut LoaderState,
        generation: CacheGeneration,
        body: &LookupBody,
        handle: HandleId,
    ) -> ValueResult<Arc<ValueMirror>> {
        match body.handles.get(&handle) {
            Some(description) if description.handle != handle => Err(ProtocolError::new(format!(
                "lookup reply for handle {handle} describes handle {}",
                description.handle
            ))
            .into()),
            Some(description) => Self::install(state, generation, description),
            None if state.registry.generation() == generation => {
                Ok(state.registry.mark_stale(handle))
            }
            None => Ok(Arc::new(ValueMirror::with_data(
                Some(handle),
                MirrorData::undefined(),
                generation,
            ))),
        }
    }

    /// Installs `description` if `generation` is still current; a late reply
    /// only produces a mirror for its own waiters.
    fn install(
        state: &mut LoaderState,
        generation: CacheGeneration,
        description: &HandleDescription,
    ) -> ValueResult<Arc<ValueMirror>> {
        if state.registry.generation() == generation {
            Ok(state.registry.add_data_from_description(description)?)
        } else {
            Ok(Arc::new(ValueMirror::with_data(
                Some(description.handle),
                MirrorData::from_description(description)?,
                generation,
            )))
        }
    }

    /// Describes the scope object of scope `scope_index` of frame `frame_id`.
    ///
    /// `None` when the debuggee could not produce the scope object.
    pub fn load_scope_fields(
        &self,
        scope_index: u32,
        frame_id: CallFrameId,
    ) -> Blocking<Option<LoadedScope>> {
        let generation = self.begin("ValueLoader::load_scope_fields")?;
        tracing::debug!(
            target: "jsdebug.values",
            generation,
            frame_id,
            scope_index,
            "dispatching scope request"
        );
        let request = Request::Scope {
            scope_index,
            frame_id,
            inline_refs: self.config.inline_refs,
        };
        let body = match self.send(request.clone())? {
            Response::Scope(body) => body,
            other => return Err(ProtocolError::unexpected_response(&request, &other).into()),
        };
        let Some(description) = body.object else {
            return Ok(None);
        };

        let mirror = Self::install(&mut self.state.lock(), generation, &description)?;
        Ok(Some(LoadedScope {
            description,
            mirror,
            generation,
        }))
    }

    /// Assigns the value of `expression` to `name` on `target`.
    ///
    /// The new value is installed into the registry and, for object owners, into
    /// the owner's property list.
    pub fn set_value(
        &self,
        target: SetTarget,
        name: PropertyName,
        expression: &str,
    ) -> Blocking<Arc<ValueMirror>> {
        let generation = self.begin("ValueLoader::set_value")?;
        tracing::debug!(target: "jsdebug.values", generation, property = %name, "dispatching setValue");
        let request = Request::SetValue {
            target: target.clone(),
            name: name.clone(),
            expression: expression.to_string(),
        };
        let body = match self.send(request.clone())? {
            Response::Value(body) => body,
            other => return Err(ProtocolError::unexpected_response(&request, &other).into()),
        };
        let new_target = body.value.resolve()?;

        let mirror = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let current = state.registry.generation() == generation;
            let mirror = match &body.description {
                Some(description) => Self::install(state, generation, description)?,
                None if current => state.registry.add_data_from_ref(&new_target),
                None => Arc::new(ValueMirror::from_target(&new_target, generation)),
            };
            if let (SetTarget::Object(owner), true) = (&target, current) {
                if let Some(owner) = state.registry.get(*owner) {
                    owner.replace_property(&name, &new_target);
                }
            }
            mirror
        };

        if mirror.needs_load() {
            return self.get_or_load_value(&new_target);
        }
        Ok(mirror)
    }

    /// Resume handling: advances the generation and forgets every mirror and
    /// pending entry. In-flight fetches still satisfy their own waiters.
    pub fn on_resumed(&self) -> CacheGeneration {
        let mut state = self.state.lock();
        let generation = self.cache.advance(&mut state.registry);
        state.pending.clear();
        generation
    }

    /// Fails every in-flight load; later loads fail immediately.
    pub fn on_disconnected(&self) {
        let pending: Vec<Pending> = {
            let mut state = self.state.lock();
            state.disconnected = true;
            state.pending.drain().map(|(_, future)| future).collect()
        };
        tracing::debug!(
            target: "jsdebug.values",
            in_flight = pending.len(),
            "debug connection closed"
        );
        for future in pending {
            future.complete(Err(ValueError::Disconnected));
        }
    }

    /// Resolves `refs` and wraps them as variables owned by `owner`.
    pub(crate) fn load_variables(
        &self,
        refs: &[PropertyRef],
        owner: Option<SetTarget>,
    ) -> Blocking<Arc<[Variable]>> {
        let mirrors = self.get_or_load_value_from_refs(refs)?;
        Ok(refs
            .iter()
            .zip(mirrors)
            .map(|(prop, mirror)| Variable::new(prop, mirror, owner.clone(), self.weak()))
            .collect())
    }

    /// Children of an object mirror as listed by `JsObject::properties`.
    pub(crate) fn object_variables(&self, mirror: &ValueMirror) -> Blocking<Arc<[Variable]>> {
        let Some(data) = mirror.data() else {
            return Ok(Arc::from(Vec::new()));
        };
        let mut refs: Vec<PropertyRef> = data.properties.as_deref().unwrap_or_default().to_vec();
        if self.config.internal_properties == InternalProperties::Merged {
            refs.extend(data.internal_properties.iter().cloned());
        }
        self.load_variables(&refs, mirror.handle().map(SetTarget::Object))
    }

    fn begin(&self, operation: &'static str) -> ValueResult<CacheGeneration> {
        let state = self.state.lock();
        if state.disconnected {
            return Err(ValueError::Disconnected);
        }
        blocking::check(operation)?;
        Ok(state.registry.generation())
    }

    fn send(&self, request: Request) -> Blocking<Response> {
        let command = request.command();
        self.transport.send(request).map_err(|err| {
            let err = ValueError::from(err);
            tracing::debug!(target: "jsdebug.values", command, error = %err, "request failed");
            if err == ValueError::Disconnected {
                self.on_disconnected();
            }
            err
        })
    }
}
