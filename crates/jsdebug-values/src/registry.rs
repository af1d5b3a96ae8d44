//! Per-context handle -> mirror map.

use std::collections::HashMap;
use std::sync::Arc;

use jsdebug_protocol::{HandleDescription, HandleId, ProtocolError, RefOrValue};

use crate::cache::CacheGeneration;
use crate::mirror::{MirrorData, ValueMirror};

/// Stores at most one mirror per handle for one cache generation.
///
/// Not synchronised on its own; the loader keeps it behind the context lock
/// together with the pending-load table.
#[derive(Debug)]
pub struct MirrorRegistry {
    generation: CacheGeneration,
    mirrors: HashMap<HandleId, Arc<ValueMirror>>,
}

impl MirrorRegistry {
    pub fn new(generation: CacheGeneration) -> Self {
        Self {
            generation,
            mirrors: HashMap::new(),
        }
    }

    pub fn generation(&self) -> CacheGeneration {
        self.generation
    }

    /// Mirror for `target`: the stored one for a handle (a placeholder if the
    /// handle is new), or a fresh unstored mirror for an inline value.
    pub fn add_data_from_ref(&mut self, target: &RefOrValue) -> Arc<ValueMirror> {
        match target {
            RefOrValue::Handle { handle, hint } => self
                .mirrors
                .entry(*handle)
                .or_insert_with(|| Arc::new(ValueMirror::placeholder(*handle, *hint, self.generation)))
                .clone(),
            RefOrValue::Inline(value) => Arc::new(ValueMirror::inline(value, self.generation)),
        }
    }

    /// Merges `description` into the mirror for its handle, creating it if needed.
    pub fn add_data_from_description(
        &mut self,
        description: &HandleDescription,
    ) -> Result<Arc<ValueMirror>, ProtocolError> {
        let data = MirrorData::from_description(description)?;
        let generation = self.generation;
        let mirror = self
            .mirrors
            .entry(description.handle)
            .or_insert_with(|| Arc::new(ValueMirror::placeholder(description.handle, None, generation)))
            .clone();
        mirror.install(data);
        Ok(mirror)
    }

    /// Records that `handle` no longer exists in the debuggee.
    pub fn mark_stale(&mut self, handle: HandleId) -> Arc<ValueMirror> {
        let generation = self.generation;
        let mirror = self
            .mirrors
            .entry(handle)
            .or_insert_with(|| Arc::new(ValueMirror::placeholder(handle, None, generation)))
            .clone();
        mirror.mark_stale();
        tracing::trace!(target: "jsdebug.values", handle, "stale handle read as undefined");
        mirror
    }

    pub fn get(&self, handle: HandleId) -> Option<Arc<ValueMirror>> {
        self.mirrors.get(&handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// Forgets every mirror and moves to `generation`.
    pub(crate) fn clear_all(&mut self, generation: CacheGeneration) {
        for mirror in self.mirrors.values() {
            mirror.detach();
        }
        self.mirrors.clear();
        self.generation = generation;
    }
}

impl Drop for MirrorRegistry {
    fn drop(&mut self) {
        for mirror in self.mirrors.values() {
            mirror.detach();
        }
    }
}
