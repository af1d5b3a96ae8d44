//! Remote JavaScript value model for paused debuggees.
//!
//! This crate provides:
//! - A typed value tree (primitives, objects, arrays, functions, scope objects)
//!   over opaque remote handles.
//! - A value loader that resolves handles with batched `lookup` requests, keeps
//!   at most one request in flight per handle, and invalidates everything it
//!   cached when the debuggee resumes.
//! - Scope chains and call frames for the IDE variables view.
//!
//! Methods returning [`Blocking`] may wait on the debuggee. See
//! [`blocking::forbid_blocking`] for threads that must not.

pub mod blocking;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod future;
pub mod loader;
pub mod mirror;
pub mod properties;
pub mod registry;
pub mod scope;
pub mod value;

pub use crate::blocking::{forbid_blocking, is_blocking_forbidden, ForbidBlockingGuard};
pub use crate::cache::{CacheController, CacheGeneration, ContextClock};
pub use crate::config::{InternalProperties, LoaderConfig};
pub use crate::context::{DebugContext, Suspension};
pub use crate::error::{Blocking, ValueError, ValueResult};
pub use crate::frame::{CallFrame, FrameVariable};
pub use crate::future::{AsyncFuture, FutureCell, Init, Outcome};
pub use crate::loader::{LoadedScope, ValueLoader};
pub use crate::mirror::{MirrorData, ValueMirror};
pub use crate::properties::{extract_internal_properties, extract_object_properties, PropertyRef};
pub use crate::registry::MirrorRegistry;
pub use crate::scope::{Scope, ScopeType};
pub use crate::value::{JsArray, JsFunction, JsObject, JsPrimitive, JsValue, ScopeObject, Variable};
