//! Cache generations.
//!
//! One monotone counter per debug context, advanced on every resume. Cached
//! mirrors and futures remember the generation they belong to and are reloaded
//! when it no longer matches.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::MirrorRegistry;

pub type CacheGeneration = u64;

/// Read-only view of the current cache generation.
pub trait ContextClock: Send + Sync {
    fn current_generation(&self) -> CacheGeneration;
}

#[derive(Debug, Default)]
pub struct CacheController {
    generation: AtomicU64,
}

impl CacheController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> CacheGeneration {
        self.generation.load(Ordering::Acquire)
    }

    /// Handles a resume: bumps the counter and clears `registry`.
    ///
    /// Callers hold the context lock that guards `registry`, which serialises
    /// resume handling with every install into the registry.
    pub(crate) fn advance(&self, registry: &mut MirrorRegistry) -> CacheGeneration {
        let next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        registry.clear_all(next);
        tracing::debug!(target: "jsdebug.values", generation = next, "cache generation advanced");
        next
    }
}

impl ContextClock for CacheController {
    fn current_generation(&self) -> CacheGeneration {
        self.current()
    }
}
