//! The session client: one room, one connection, one game.
//!
//! A [`SessionClient`] wires the layers together:
//!
//! ```text
//! TransportChannel ──events──→ pump ──┬─→ GameStateStore (disconnect marker)
//!                                     └─→ RpcClient ──Session.Update──→ GameStateStore
//!                                                                          │
//!                                            SessionEvent broadcast  ←─────┘
//! ```
//!
//! It survives reconnects without any resync call: the server pushes the
//! full game state as the first `Session.Update` on every new connection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use razchess_protocol::{
    Color, GameUpdate, MoveCode, PromotionPiece, ProtocolError, methods,
};
use razchess_rpc::{RpcClient, Subscription};
use razchess_transport::{
    ChannelEvent, ChannelStatus, ConnectionState, Connector, Generation, RoomId,
    TransportChannel,
};
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::promotion::is_promotion_move;
use crate::{GameStateStore, PromotionArbiter, SessionConfig, SessionError, Sound, Transition};

/// Something the board or menu should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new authoritative update was applied.
    Updated(Transition),
    /// The board must snap back to `fen`. `sound` is set when the server
    /// rejected the move, and empty when the move never reached it.
    RolledBack { fen: String, sound: Option<Sound> },
    /// The connection was lost; a reconnect is already scheduled.
    Disconnected,
    /// A dropped move needs a promotion piece. Answer with
    /// [`SessionClient::resolve_promotion`].
    PromotionRequested { color: Color },
    /// The number of clients watching the room changed.
    ViewersChanged(u32),
}

struct Shared {
    store: Mutex<GameStateStore>,
    arbiter: PromotionArbiter,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn store(&self) -> MutexGuard<'_, GameStateStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn on_update(&self, params: Value) {
        let update: GameUpdate = match serde_json::from_value(params) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed game update");
                return;
            }
        };
        let transition = self.store().apply(update);
        tracing::debug!(
            status = %transition.current.status,
            sound = ?transition.sound,
            "game updated"
        );
        self.emit(SessionEvent::Updated(transition));
    }

    fn on_view_count(&self, params: Value) {
        let Some(count) = params.as_u64().and_then(|n| u32::try_from(n).ok()) else {
            tracing::warn!(%params, "ignoring malformed view count");
            return;
        };
        self.store().set_viewers(count);
        self.emit(SessionEvent::ViewersChanged(count));
    }

    fn on_connection_lost(&self, generation: Generation) {
        tracing::info!(%generation, "connection lost, waiting for reconnect");
        self.store().mark_disconnected();
        self.emit(SessionEvent::Disconnected);
    }

    fn roll_back(&self, fen: Option<String>, sound: Option<Sound>) {
        if let Some(fen) = fen {
            self.emit(SessionEvent::RolledBack { fen, sound });
        }
    }
}

/// Live connection to one room.
///
/// Dropping the client tears everything down; [`close`](Self::close) does
/// the same but waits for the connection to close cleanly.
pub struct SessionClient {
    room: RoomId,
    channel: Option<TransportChannel>,
    rpc: RpcClient,
    shared: Arc<Shared>,
    pump: JoinHandle<()>,
    _subscriptions: [Subscription; 2],
}

impl SessionClient {
    /// Starts connecting to `room` and returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<C: Connector>(connector: C, room: RoomId, config: SessionConfig) -> Self {
        let (channel, events) = TransportChannel::spawn(connector, room.clone(), config.channel);
        let rpc = RpcClient::new(channel.frame_sender());
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));

        let shared = Arc::new(Shared {
            store: Mutex::new(GameStateStore::new()),
            arbiter: PromotionArbiter::new(),
            events: events_tx,
        });

        let subscriptions = [
            {
                let shared = Arc::clone(&shared);
                rpc.on(methods::UPDATE, move |params| shared.on_update(params))
            },
            {
                let shared = Arc::clone(&shared);
                rpc.on(methods::UPDATE_VIEW_COUNT, move |params| {
                    shared.on_view_count(params)
                })
            },
        ];

        let pump = tokio::spawn(pump(events, rpc.clone(), Arc::clone(&shared)));
        tracing::info!(%room, "session started");

        Self {
            room,
            channel: Some(channel),
            rpc,
            shared,
            pump,
            _subscriptions: subscriptions,
        }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Receives every [`SessionEvent`] from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Current state of the underlying connection.
    pub fn connection_status(&self) -> Option<ChannelStatus> {
        self.channel.as_ref().map(TransportChannel::status)
    }

    /// Runs `f` against the game state store.
    pub fn with_store<R>(&self, f: impl FnOnce(&GameStateStore) -> R) -> R {
        f(&*self.shared.store())
    }

    /// The latest authoritative update.
    pub fn current(&self) -> Option<GameUpdate> {
        self.shared.store().current().cloned()
    }

    /// Status line, or `"Disconnected"` while the connection is down.
    pub fn status(&self) -> Option<String> {
        self.shared.store().status().map(str::to_owned)
    }

    pub fn viewers(&self) -> u32 {
        self.shared.store().viewers()
    }

    /// Whether a piece of `color` may be picked up right now.
    pub fn can_drag(&self, color: Color) -> bool {
        self.shared.store().can_drag(color)
    }

    /// Submits a move dropped on the board.
    ///
    /// If the move is a promotion and carries no piece letter, a promotion
    /// request is opened first and nothing is sent until it is answered.
    ///
    /// Returns `Ok(true)` once the server accepted the move and `Ok(false)`
    /// if it refused it or the promotion request was cancelled. In both
    /// `false` cases a [`SessionEvent::RolledBack`] is emitted.
    ///
    /// # Errors
    /// - [`SessionError::NoPosition`] before the first update.
    /// - [`SessionError::Rpc`] if the call failed; the board is restored.
    /// - [`SessionError::Protocol`] if the server's answer was not a bool.
    pub async fn submit_move(&self, mv: MoveCode) -> Result<bool, SessionError> {
        let board = self.shared.store().board()?.ok_or(SessionError::NoPosition)?;

        let mut mv = mv;
        if mv.promotion.is_none() && is_promotion_move(&board, mv.from, mv.to) {
            let color = board.piece_at(mv.from).map_or(board.active_color(), |p| p.color);
            let request = self.shared.arbiter.open(color);
            self.shared.emit(SessionEvent::PromotionRequested { color });
            tracing::debug!(%mv, %color, "waiting for promotion choice");

            match request.await {
                Ok(piece) => mv = mv.with_promotion(piece),
                Err(reason) => {
                    tracing::debug!(%mv, %reason, "promotion cancelled, move not sent");
                    let fen = self.shared.store().restore_board();
                    self.shared.roll_back(fen, None);
                    return Ok(false);
                }
            }
        }

        self.shared.store().begin_move(mv);
        let result = self
            .rpc
            .call(methods::MOVE, json!([mv.to_string()]))
            .await;

        match result {
            Ok(Value::Bool(true)) => {
                tracing::debug!(%mv, "move accepted");
                Ok(true)
            }
            Ok(Value::Bool(false)) => {
                tracing::info!(%mv, "move rejected");
                let fen = self.shared.store().reject_move();
                self.shared.roll_back(fen, Some(Sound::Illegal));
                Ok(false)
            }
            Ok(other) => {
                let fen = self.shared.store().restore_board();
                self.shared.roll_back(fen, None);
                Err(ProtocolError::InvalidMessage(format!(
                    "{} returned {other}, expected a bool",
                    methods::MOVE
                ))
                .into())
            }
            Err(e) => {
                tracing::warn!(%mv, error = %e, "move did not reach the server");
                let fen = self.shared.store().restore_board();
                self.shared.roll_back(fen, None);
                Err(e.into())
            }
        }
    }

    /// Resigns the game on behalf of `color`.
    pub async fn resign(&self, color: Color) -> Result<(), SessionError> {
        self.rpc
            .call(methods::RESIGN, json!([color.to_string()]))
            .await?;
        tracing::info!(%color, "resigned");
        Ok(())
    }

    /// Answers the open promotion request. Returns `false` if none is open.
    pub fn resolve_promotion(&self, piece: PromotionPiece) -> bool {
        self.shared.arbiter.resolve(piece)
    }

    /// Cancels the open promotion request. Returns `false` if none is open.
    pub fn dismiss_promotion(&self) -> bool {
        self.shared.arbiter.dismiss()
    }

    /// Color of the pawn the open promotion request is about.
    pub fn pending_promotion(&self) -> Option<Color> {
        self.shared.arbiter.pending_color()
    }

    /// Closes the connection and waits until every pending call has failed.
    pub async fn close(mut self) {
        self.shared.arbiter.dismiss();
        if let Some(channel) = self.channel.take() {
            channel.close().await;
        }
        if let Err(e) = (&mut self.pump).await {
            tracing::debug!(room = %self.room, error = %e, "session pump ended abnormally");
        }
        tracing::info!(room = %self.room, "session closed");
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.shared.arbiter.dismiss();
        self.pump.abort();
    }
}

/// Feeds channel events to the store and the RPC client in arrival order.
async fn pump(
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    rpc: RpcClient,
    shared: Arc<Shared>,
) {
    // Failed redials repeat the last generation; report each loss once.
    let mut last_lost = None;
    while let Some(event) = events.recv().await {
        if let ChannelEvent::Status(ChannelStatus {
            state: ConnectionState::Disconnected,
            generation: Some(generation),
        }) = event
        {
            if last_lost != Some(generation) {
                last_lost = Some(generation);
                shared.on_connection_lost(generation);
            }
        }
        rpc.handle_event(event);
    }
    rpc.shut_down();
}
