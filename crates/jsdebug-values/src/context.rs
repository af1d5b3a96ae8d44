use std::sync::Arc;

use jsdebug_protocol::{DebugEvent, FrameDescription, PauseReason, Transport};
use parking_lot::RwLock;

use crate::cache::{CacheController, CacheGeneration, ContextClock};
use crate::config::LoaderConfig;
use crate::error::{ValueError, ValueResult};
use crate::frame::CallFrame;
use crate::loader::ValueLoader;

/// A paused debuggee.
#[derive(Debug, Clone)]
pub struct Suspension {
    pub reason: PauseReason,
    pub frames: Arc<[CallFrame]>,
}

/// Value model state of one debug connection.
///
/// Owns the cache controller and the loader; events from the transport's
/// receiver thread are fed in through [`DebugContext::handle_event`].
#[derive(Debug)]
pub struct DebugContext {
    cache: Arc<CacheController>,
    loader: Arc<ValueLoader>,
    suspension: RwLock<Option<Suspension>>,
}

impl DebugContext {
    pub fn new(transport: Arc<dyn Transport>, config: LoaderConfig) -> Self {
        let cache = Arc::new(CacheController::new());
        let loader = ValueLoader::new(transport, cache.clone(), config);
        Self {
            cache,
            loader,
            suspension: RwLock::new(None),
        }
    }

    pub fn loader(&self) -> &Arc<ValueLoader> {
        &self.loader
    }

    pub fn clock(&self) -> Arc<dyn ContextClock> {
        self.cache.clone()
    }

    pub fn current_generation(&self) -> CacheGeneration {
        self.cache.current()
    }

    pub fn is_disconnected(&self) -> bool {
        self.loader.is_disconnected()
    }

    pub fn handle_event(&self, event: DebugEvent) -> ValueResult<()> {
        match event {
            DebugEvent::Paused { frames, reason } => self.on_paused(&frames, reason),
            DebugEvent::Resumed => {
                self.suspension.write().take();
                self.loader.on_resumed();
                Ok(())
            }
            DebugEvent::Disconnected => {
                self.suspension.write().take();
                self.loader.on_disconnected();
                Ok(())
            }
        }
    }

    fn on_paused(&self, frames: &[FrameDescription], reason: PauseReason) -> ValueResult<()> {
        if self.loader.is_disconnected() {
            return Err(ValueError::Disconnected);
        }
        let frames = frames
            .iter()
            .map(|frame| CallFrame::new(frame, Arc::downgrade(&self.loader)))
            .collect::<ValueResult<Arc<[CallFrame]>>>()?;
        tracing::debug!(
            target: "jsdebug.values",
            reason = reason.as_str(),
            frames = frames.len(),
            generation = self.cache.current(),
            "debuggee paused"
        );
        *self.suspension.write() = Some(Suspension { reason, frames });
        Ok(())
    }

    pub fn suspension(&self) -> Option<Suspension> {
        self.suspension.read().clone()
    }

    /// Frames of the current pause, innermost first; empty while running.
    pub fn call_frames(&self) -> Arc<[CallFrame]> {
        self.suspension
            .read()
            .as_ref()
            .map(|suspension| suspension.frames.clone())
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }
}
