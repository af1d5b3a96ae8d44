//! One-shot, multi-consumer results.
//!
//! An [`AsyncFuture`] is satisfied exactly once; every consumer (blocking,
//! callback or `async`) observes that same outcome, including a memoised error.
//! A [`FutureCell`] is the slot a future lives in: the first caller to install a
//! future becomes its initiator and is the only one that runs the operation.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use jsdebug_protocol::ProtocolError;
use parking_lot::{Condvar, Mutex};

use crate::blocking;
use crate::cache::CacheGeneration;
use crate::error::{Blocking, ValueError, ValueResult};

pub type Outcome<T> = ValueResult<T>;

type Callback<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;

pub struct AsyncFuture<T> {
    generation: CacheGeneration,
    result: OnceLock<Outcome<T>>,
    callbacks: Mutex<Vec<Callback<T>>>,
    ready: Condvar,
}

impl<T> std::fmt::Debug for AsyncFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFuture")
            .field("generation", &self.generation)
            .field("done", &self.result.get().is_some())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> AsyncFuture<T> {
    /// A pending future for work started at `generation`.
    pub fn new(generation: CacheGeneration) -> Self {
        Self {
            generation,
            result: OnceLock::new(),
            callbacks: Mutex::new(Vec::new()),
            ready: Condvar::new(),
        }
    }

    pub fn completed(generation: CacheGeneration, outcome: Outcome<T>) -> Self {
        let future = Self::new(generation);
        let _ = future.result.set(outcome);
        future
    }

    /// Cache generation that was current when the work behind this future started.
    pub fn generation(&self) -> CacheGeneration {
        self.generation
    }

    pub fn is_done(&self) -> bool {
        self.result.get().is_some()
    }

    /// Lock-free read of the outcome, if satisfied.
    pub fn peek(&self) -> Option<&Outcome<T>> {
        self.result.get()
    }

    /// True if the future failed in a way the next caller should retry.
    pub fn failed_transiently(&self) -> bool {
        matches!(self.result.get(), Some(Err(err)) if err.is_transient())
    }

    /// Satisfies the future. Only the first call has an effect; returns whether it won.
    pub fn complete(&self, outcome: Outcome<T>) -> bool {
        let callbacks = {
            let mut callbacks = self.callbacks.lock();
            if self.result.set(outcome).is_err() {
                return false;
            }
            self.ready.notify_all();
            std::mem::take(&mut *callbacks)
        };

        if let Some(outcome) = self.result.get() {
            for callback in callbacks {
                callback(outcome);
            }
        }
        true
    }

    /// Blocks until the future is satisfied.
    pub fn get_sync(&self) -> Blocking<T> {
        if let Some(outcome) = self.result.get() {
            return outcome.clone();
        }
        blocking::check("AsyncFuture::get_sync")?;

        let mut callbacks = self.callbacks.lock();
        loop {
            if let Some(outcome) = self.result.get() {
                return outcome.clone();
            }
            self.ready.wait(&mut callbacks);
        }
    }

    /// Invokes `callback` exactly once with the outcome; immediately if already satisfied.
    pub fn get_async<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        if let Some(outcome) = self.result.get() {
            callback(outcome);
            return;
        }

        {
            let mut callbacks = self.callbacks.lock();
            if self.result.get().is_none() {
                callbacks.push(Box::new(callback));
                return;
            }
        }
        if let Some(outcome) = self.result.get() {
            callback(outcome);
        }
    }

    /// Awaits the outcome without parking a runtime thread.
    pub async fn wait(&self) -> Outcome<T> {
        if let Some(outcome) = self.result.get() {
            return outcome.clone();
        }
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.get_async(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
        rx.await.unwrap_or(Err(ValueError::Disconnected))
    }
}

/// Result of [`FutureCell::init`].
pub enum Init<T> {
    /// This caller installed the future and must run the operation.
    Initiator(Arc<AsyncFuture<T>>),
    /// Another caller's future is already in the cell.
    Joined(Arc<AsyncFuture<T>>),
}

impl<T: Clone + Send + Sync + 'static> Init<T> {
    pub fn is_initiator(&self) -> bool {
        matches!(self, Init::Initiator(_))
    }

    pub fn future(&self) -> &Arc<AsyncFuture<T>> {
        match self {
            Init::Initiator(future) | Init::Joined(future) => future,
        }
    }

    /// Runs `operation` if this caller is the initiator and returns the future.
    ///
    /// A panicking operation still satisfies the future, with an error, so that
    /// joined consumers are not left waiting; the panic then continues to unwind.
    pub fn run<F>(self, operation: F) -> Arc<AsyncFuture<T>>
    where
        F: FnOnce() -> Outcome<T>,
    {
        match self {
            Init::Joined(future) => future,
            Init::Initiator(future) => {
                match panic::catch_unwind(AssertUnwindSafe(operation)) {
                    Ok(outcome) => {
                        future.complete(outcome);
                    }
                    Err(payload) => {
                        future.complete(Err(ValueError::Protocol(ProtocolError::new(
                            "load operation panicked",
                        ))));
                        panic::resume_unwind(payload);
                    }
                }
                future
            }
        }
    }
}

/// Slot holding the current future for one target.
pub struct FutureCell<T> {
    slot: Mutex<Option<Arc<AsyncFuture<T>>>>,
}

impl<T> Default for FutureCell<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> FutureCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<AsyncFuture<T>>> {
        self.slot.lock().clone()
    }

    /// Installs a fresh future tagged with `generation`.
    ///
    /// Without `force_restart` the future is installed only into an empty cell.
    /// With it, the cell is also taken over when it still holds `observed`, the
    /// stale future the caller looked at; if someone else restarted in between,
    /// the caller joins their future instead of starting a second one.
    pub fn init(
        &self,
        generation: CacheGeneration,
        force_restart: bool,
        observed: Option<&Arc<AsyncFuture<T>>>,
    ) -> Init<T> {
        let mut slot = self.slot.lock();
        if let Some(current) = slot.as_ref() {
            let take_over =
                force_restart && observed.is_some_and(|observed| Arc::ptr_eq(current, observed));
            if !take_over {
                return Init::Joined(current.clone());
            }
        }

        let future = Arc::new(AsyncFuture::new(generation));
        *slot = Some(future.clone());
        Init::Initiator(future)
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }
}
