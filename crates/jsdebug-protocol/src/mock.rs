use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::{
    CallFrameId, HandleDescription, HandleId, LookupBody, ProtocolFlavor, Request, Response,
    ScopeBody, Transport, TransportError, ValueBody,
};

#[derive(Default)]
struct MockState {
    objects: HashMap<HandleId, HandleDescription>,
    scopes: HashMap<(CallFrameId, u32), ScopeBody>,
    set_results: VecDeque<Result<ValueBody, TransportError>>,
    lookup_failures: VecDeque<TransportError>,
    requests: Vec<Request>,
    held: bool,
    closed: bool,
}

/// Deterministic, in-memory transport test double.
///
/// Lookups are answered from the inserted descriptions; handles that were never
/// inserted are omitted from the reply, which is how a stale handle looks on the
/// wire. Every request is recorded before it is answered.
pub struct MockTransport {
    flavor: ProtocolFlavor,
    state: Mutex<MockState>,
    changed: Condvar,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_flavor(ProtocolFlavor::V8)
    }

    pub fn with_flavor(flavor: ProtocolFlavor) -> Self {
        Self {
            flavor,
            state: Mutex::new(MockState::default()),
            changed: Condvar::new(),
        }
    }

    pub fn insert_object(&self, description: HandleDescription) {
        self.state
            .lock()
            .objects
            .insert(description.handle, description);
    }

    pub fn remove_object(&self, handle: HandleId) {
        self.state.lock().objects.remove(&handle);
    }

    /// Forget every description, as the debuggee does when it resumes.
    pub fn clear_objects(&self) {
        self.state.lock().objects.clear();
    }

    pub fn set_scope(&self, frame_id: CallFrameId, scope_index: u32, body: ScopeBody) {
        self.state
            .lock()
            .scopes
            .insert((frame_id, scope_index), body);
    }

    pub fn push_set_value(&self, result: Result<ValueBody, TransportError>) {
        self.state.lock().set_results.push_back(result);
    }

    pub fn fail_next_lookup(&self, err: TransportError) {
        self.state.lock().lookup_failures.push_back(err);
    }

    /// Every subsequent request fails with [`TransportError::ConnectionClosed`].
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.changed.notify_all();
    }

    /// Park every request after it is recorded until [`MockTransport::release`].
    pub fn hold(&self) {
        self.state.lock().held = true;
    }

    pub fn release(&self) {
        self.state.lock().held = false;
        self.changed.notify_all();
    }

    /// Blocks until at least `count` requests were recorded, or `timeout` passes.
    pub fn wait_for_requests(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.requests.len() < count {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return state.requests.len() >= count;
            }
        }
        true
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Handle sets of every recorded lookup, in dispatch order.
    pub fn lookups(&self) -> Vec<Vec<HandleId>> {
        self.state
            .lock()
            .requests
            .iter()
            .filter_map(|request| match request {
                Request::Lookup { handles, .. } => Some(handles.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn scope_request_count(&self) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|request| matches!(request, Request::Scope { .. }))
            .count()
    }

    fn answer(state: &mut MockState, request: &Request) -> Result<Response, TransportError> {
        match request {
            Request::Lookup { handles, .. } => {
                if let Some(err) = state.lookup_failures.pop_front() {
                    return Err(err);
                }
                let found = handles
                    .iter()
                    .filter_map(|handle| state.objects.get(handle).cloned());
                Ok(Response::Lookup(LookupBody::from_descriptions(found)))
            }
            Request::Scope {
                scope_index,
                frame_id,
                ..
            } => state
                .scopes
                .get(&(*frame_id, *scope_index))
                .cloned()
                .map(Response::Scope)
                .ok_or_else(|| TransportError::CommandFailed {
                    command: "scope",
                    message: format!("no scope {scope_index} in frame {frame_id}"),
                }),
            Request::SetValue { .. } => match state.set_results.pop_front() {
                Some(result) => result.map(Response::Value),
                None => Err(TransportError::Other(
                    "no mock setValue result queued".to_string(),
                )),
            },
        }
    }
}

impl Transport for MockTransport {
    fn flavor(&self) -> ProtocolFlavor {
        self.flavor
    }

    fn send(&self, request: Request) -> Result<Response, TransportError> {
        tracing::trace!(
            target: "jsdebug.protocol",
            command = request.command(),
            "mock transport request"
        );

        let mut state = self.state.lock();
        state.requests.push(request.clone());
        self.changed.notify_all();

        while state.held && !state.closed {
            self.changed.wait(&mut state);
        }
        if state.closed {
            return Err(TransportError::ConnectionClosed);
        }
        Self::answer(&mut state, &request)
    }
}
