//! The JSON-RPC client.
//!
//! Every call is bound to the generation that was open when it was made.
//! The pending table is the only place a call can be settled from, and an
//! entry is removed under the same lock that decides its outcome, so each
//! call resolves exactly once:
//!
//! ```text
//!   call() ──insert──→ pending[id] ──response (same id, same generation)──→ Ok / Remote
//!                          │
//!                          └──Disconnected event for its generation──→ Err(Disconnected)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use razchess_protocol::{
    Codec, Incoming, JsonCodec, Notification, Request, Response, unwrap_params,
};
use razchess_transport::{ChannelEvent, ConnectionState, FrameSender, Generation};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::RpcError;

/// Callback for a named server push. Receives the (unwrapped) params.
pub type Handler = Arc<dyn Fn(Value) + Send + Sync>;

struct PendingCall {
    method: String,
    generation: Generation,
    reply: oneshot::Sender<Result<Value, RpcError>>,
}

#[derive(Default)]
struct State {
    generation: Option<Generation>,
    next_id: u64,
    pending: HashMap<u64, PendingCall>,
    next_handler_id: u64,
    handlers: HashMap<String, Vec<(u64, Handler)>>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner<C> {
    codec: C,
    frames: FrameSender,
    state: Arc<Mutex<State>>,
}

/// Request/response correlation and notification dispatch over a
/// [`TransportChannel`](razchess_transport::TransportChannel).
///
/// Cheap to clone; clones share the pending table and handler registry.
pub struct RpcClient<C: Codec = JsonCodec> {
    inner: Arc<Inner<C>>,
}

impl<C: Codec> Clone for RpcClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl RpcClient<JsonCodec> {
    /// Creates a JSON client that writes frames to `frames`.
    pub fn new(frames: FrameSender) -> Self {
        Self::with_codec(frames, JsonCodec)
    }
}

impl<C: Codec> RpcClient<C> {
    pub fn with_codec(frames: FrameSender, codec: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                codec,
                frames,
                state: Arc::new(Mutex::new(State {
                    next_id: 1,
                    ..State::default()
                })),
            }),
        }
    }

    /// Calls `method` on the server and waits for its result.
    ///
    /// Params are sent as given; callers pass positional arrays
    /// (`["e2e4"]`).
    ///
    /// # Errors
    /// - [`RpcError::Disconnected`] if no connection is open, or the
    ///   connection is lost before the response arrives.
    /// - [`RpcError::Remote`] if the server answered with an error object.
    /// - [`RpcError::Transport`] / [`RpcError::Protocol`] if the request
    ///   could not be sent.
    /// - [`RpcError::Closed`] if the client shut down meanwhile.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let (id, generation, reply) = {
            let mut state = lock(&self.inner.state);
            let Some(generation) = state.generation else {
                tracing::debug!(method, "call while disconnected");
                return Err(RpcError::Disconnected);
            };
            let id = state.next_id;
            state.next_id += 1;
            let (tx, rx) = oneshot::channel();
            state.pending.insert(
                id,
                PendingCall {
                    method: method.to_string(),
                    generation,
                    reply: tx,
                },
            );
            (id, generation, rx)
        };
        let _entry = PendingEntry {
            state: &self.inner.state,
            id,
        };

        let sent = self
            .inner
            .codec
            .encode(&Request::new(id, method, params))
            .map_err(RpcError::from)
            .and_then(|text| {
                self.inner
                    .frames
                    .send(generation, text)
                    .map_err(RpcError::from)
            });
        sent?;
        tracing::debug!(id, method, %generation, "call sent");

        reply.await.unwrap_or(Err(RpcError::Closed))
    }

    /// Sends a notification. The server never answers it.
    pub fn notify(&self, method: &str, params: Value) -> Result<(), RpcError> {
        let generation = lock(&self.inner.state)
            .generation
            .ok_or(RpcError::Disconnected)?;
        let text = self.inner.codec.encode(&Notification::new(method, params))?;
        self.inner.frames.send(generation, text)?;
        Ok(())
    }

    /// Registers `handler` for pushes named `method`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped. Handlers run on the event pump, so they should not block.
    pub fn on<F>(&self, method: &str, handler: F) -> Subscription
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let mut state = lock(&self.inner.state);
        let id = state.next_handler_id;
        state.next_handler_id += 1;
        state
            .handlers
            .entry(method.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            state: Arc::downgrade(&self.inner.state),
            method: method.to_string(),
            id,
        }
    }

    /// The generation calls are currently sent on, if any.
    pub fn current_generation(&self) -> Option<Generation> {
        lock(&self.inner.state).generation
    }

    /// Number of calls waiting for a response.
    pub fn pending_calls(&self) -> usize {
        lock(&self.inner.state).pending.len()
    }

    /// Spawns the task that feeds channel events into this client.
    ///
    /// When the event stream ends, every pending call fails with
    /// [`RpcError::Closed`].
    pub fn attach(&self, mut events: mpsc::UnboundedReceiver<ChannelEvent>) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                client.handle_event(event);
            }
            client.shut_down();
        })
    }

    /// Processes one channel event.
    pub fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Status(status) => match status.state {
                ConnectionState::Open => {
                    lock(&self.inner.state).generation = status.generation;
                    tracing::debug!(generation = ?status.generation, "rpc generation open");
                }
                ConnectionState::Disconnected => {
                    self.fail_pending(status.generation, || RpcError::Disconnected);
                }
                ConnectionState::Connecting | ConnectionState::Reconnecting => {}
            },
            ChannelEvent::Frame { generation, text } => self.handle_frame(generation, &text),
        }
    }

    fn handle_frame(&self, generation: Generation, text: &str) {
        if lock(&self.inner.state).generation != Some(generation) {
            tracing::debug!(%generation, "discarding frame from a stale connection");
            return;
        }

        let incoming = self
            .inner
            .codec
            .decode::<Value>(text)
            .and_then(Incoming::from_value);
        let incoming = match incoming {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::warn!(%generation, error = %e, "ignoring malformed frame");
                return;
            }
        };

        match incoming {
            Incoming::Response { id, outcome } => self.settle(generation, id, outcome),
            Incoming::Notification { method, params } => self.dispatch(&method, params),
            Incoming::Request { id, method, params } => {
                self.dispatch(&method, params);
                self.acknowledge(generation, id);
            }
        }
    }

    fn settle(
        &self,
        generation: Generation,
        id: u64,
        outcome: Result<Value, razchess_protocol::ErrorObject>,
    ) {
        let call = {
            let mut state = lock(&self.inner.state);
            match state.pending.get(&id).map(|call| call.generation) {
                Some(bound) if bound == generation => state.pending.remove(&id),
                Some(bound) => {
                    tracing::debug!(id, %bound, "response for a superseded call");
                    None
                }
                None => {
                    tracing::debug!(id, "response without a pending call");
                    None
                }
            }
        };
        let Some(call) = call else {
            return;
        };

        let result = outcome.map_err(|e| {
            tracing::debug!(id, method = %call.method, code = e.code, "call failed remotely");
            RpcError::Remote {
                code: e.code,
                message: e.message,
            }
        });
        // The caller may have stopped waiting.
        let _ = call.reply.send(result);
    }

    fn dispatch(&self, method: &str, params: Value) {
        let handlers: Vec<Handler> = lock(&self.inner.state)
            .handlers
            .get(method)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            tracing::debug!(method, "no handler registered");
            return;
        }

        let params = unwrap_params(params);
        for handler in handlers {
            handler(params.clone());
        }
    }

    fn acknowledge(&self, generation: Generation, id: Value) {
        let sent = self
            .inner
            .codec
            .encode(&Response::success(id, Value::Bool(true)))
            .map_err(RpcError::from)
            .and_then(|text| {
                self.inner
                    .frames
                    .send(generation, text)
                    .map_err(RpcError::from)
            });
        if let Err(e) = sent {
            tracing::debug!(%generation, error = %e, "could not acknowledge server request");
        }
    }

    /// Fails every pending call bound to `lost` (or every call, if `None`).
    fn fail_pending(&self, lost: Option<Generation>, error: impl Fn() -> RpcError) {
        let failed: Vec<PendingCall> = {
            let mut state = lock(&self.inner.state);
            if lost.is_none() || state.generation == lost {
                state.generation = None;
            }
            let ids: Vec<u64> = state
                .pending
                .iter()
                .filter(|(_, call)| lost.is_none_or(|g| call.generation == g))
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| state.pending.remove(id))
                .collect()
        };

        if !failed.is_empty() {
            tracing::info!(count = failed.len(), generation = ?lost, "failing pending calls");
        }
        for call in failed {
            let _ = call.reply.send(Err(error()));
        }
    }

    /// Fails every pending call with [`RpcError::Closed`] and forgets the
    /// open generation. Called when the event stream ends.
    pub fn shut_down(&self) {
        self.fail_pending(None, || RpcError::Closed);
        tracing::debug!("rpc event pump stopped");
    }
}

/// Removes a call's pending entry when `call()` returns or is cancelled.
/// Settled calls are already gone, so removal is then a no-op.
struct PendingEntry<'a> {
    state: &'a Mutex<State>,
    id: u64,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        if let Some(call) = lock(self.state).pending.remove(&self.id) {
            tracing::debug!(id = self.id, method = %call.method, "call abandoned by caller");
        }
    }
}

/// Keeps a handler registered; dropping it unregisters the handler.
#[must_use = "the handler is removed as soon as the subscription is dropped"]
pub struct Subscription {
    state: Weak<Mutex<State>>,
    method: String,
    id: u64,
}

impl Subscription {
    /// Name of the push this subscription listens to.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Removes the handler now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = lock(&state);
        if let Some(list) = state.handlers.get_mut(&self.method) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                state.handlers.remove(&self.method);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("method", &self.method)
            .field("id", &self.id)
            .finish()
    }
}
