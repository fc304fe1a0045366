//! The reconnecting transport channel.
//!
//! A [`TransportChannel`] owns a supervisor task that keeps exactly one
//! connection to the room alive:
//!
//! ```text
//!   Connecting ──(connected)──→ Open ──(error / close)──→ Disconnected
//!       ↑                                                     │
//!       │                                          (fixed reconnect delay)
//!       │                                                     ▼
//!       └─────────────────────────────────────────────── Reconnecting
//! ```
//!
//! A failed dial goes straight from Connecting to Disconnected and waits the
//! same delay. There is no retry limit and the delay never grows.
//!
//! Status changes and received frames are delivered in order on a single
//! event channel, each tagged with the [`Generation`] they belong to.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{Connection, Connector, Generation, RoomId, TransportError};

/// Delay between losing a connection and the next dial attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Configuration for a [`TransportChannel`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How long to wait after a disconnect (or a failed dial) before the
    /// next attempt. The same delay is used for every attempt.
    ///
    /// Default: 1000 ms.
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Lifecycle state of the physical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A dial attempt is in progress.
    Connecting,
    /// The connection is established and frames flow.
    Open,
    /// The connection was lost (or the dial failed).
    Disconnected,
    /// The reconnect delay elapsed; a new attempt starts right away.
    Reconnecting,
}

/// Snapshot of the channel: its state plus the latest generation.
///
/// While `Open`, `generation` is the live connection. While `Disconnected`,
/// it names the connection that was just lost (`None` if none ever opened).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub state: ConnectionState,
    pub generation: Option<Generation>,
}

impl ChannelStatus {
    /// Returns the generation if the channel is currently open.
    pub fn open_generation(&self) -> Option<Generation> {
        match self.state {
            ConnectionState::Open => self.generation,
            _ => None,
        }
    }
}

/// Something the channel reports to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The connection state changed.
    Status(ChannelStatus),
    /// A frame arrived on the connection with the given generation.
    Frame { generation: Generation, text: String },
}

/// A frame queued for the connection of one specific generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub generation: Generation,
    pub text: String,
}

/// Cloneable handle for queueing outbound frames.
///
/// Frames addressed to a generation that is no longer open are dropped by
/// the supervisor instead of being written to a newer connection.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl FrameSender {
    /// Wraps the sending half of an outbound queue.
    pub fn new(tx: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self { tx }
    }

    /// Queues a frame for the connection of the given generation.
    ///
    /// # Errors
    /// Returns [`TransportError::Shutdown`] if the channel is gone.
    pub fn send(
        &self,
        generation: Generation,
        text: String,
    ) -> Result<(), TransportError> {
        self.tx
            .send(OutboundFrame { generation, text })
            .map_err(|_| TransportError::Shutdown)
    }
}

/// Handle to a running reconnecting channel.
///
/// Dropping the handle aborts the supervisor task; [`close`](Self::close)
/// shuts it down gracefully.
pub struct TransportChannel {
    room: RoomId,
    frames: FrameSender,
    status: watch::Receiver<ChannelStatus>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TransportChannel {
    /// Starts the supervisor for `room` and returns the handle together with
    /// the event stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<C: Connector>(
        connector: C,
        room: RoomId,
        config: ChannelConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ChannelStatus {
            state: ConnectionState::Connecting,
            generation: None,
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let supervisor = Supervisor {
            connector,
            room: room.clone(),
            config,
            events: events_tx,
            status: status_tx,
            outbound: outbound_rx,
            shutdown: shutdown_rx,
            generation: None,
        };
        let task = tokio::spawn(supervisor.run());

        let channel = Self {
            room,
            frames: FrameSender::new(outbound_tx),
            status: status_rx,
            shutdown: shutdown_tx,
            task,
        };
        (channel, events_rx)
    }

    /// Returns the room this channel is bound to.
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Returns a cloneable sender for outbound frames.
    pub fn frame_sender(&self) -> FrameSender {
        self.frames.clone()
    }

    /// Queues a frame for the connection of the given generation.
    pub fn send(
        &self,
        generation: Generation,
        text: String,
    ) -> Result<(), TransportError> {
        self.frames.send(generation, text)
    }

    /// Returns the current status.
    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// Returns a receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    /// Stops reconnecting, closes the live connection (if any), and waits
    /// for the supervisor to emit its final `Disconnected` status.
    pub async fn close(mut self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = (&mut self.task).await {
            tracing::debug!(room = %self.room, error = %e, "supervisor task ended abnormally");
        }
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Why the pump loop for one connection ended.
#[derive(Debug, PartialEq, Eq)]
enum Exit {
    Lost,
    Shutdown,
}

struct Supervisor<C: Connector> {
    connector: C,
    room: RoomId,
    config: ChannelConfig,
    events: mpsc::UnboundedSender<ChannelEvent>,
    status: watch::Sender<ChannelStatus>,
    outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    shutdown: watch::Receiver<bool>,
    generation: Option<Generation>,
}

impl<C: Connector> Supervisor<C> {
    async fn run(mut self) {
        tracing::info!(room = %self.room, "transport channel started");

        loop {
            self.publish(ConnectionState::Connecting);

            let attempt = tokio::select! {
                result = self.connector.connect(&self.room) => result,
                _ = shutdown_requested(&mut self.shutdown) => break,
            };

            match attempt {
                Ok(conn) => {
                    let generation =
                        self.generation.map_or(Generation::FIRST, Generation::next);
                    self.generation = Some(generation);
                    tracing::info!(room = %self.room, %generation, "connection open");
                    self.publish(ConnectionState::Open);

                    let exit = self.pump(&conn, generation).await;
                    self.publish(ConnectionState::Disconnected);
                    if let Err(e) = conn.close().await {
                        tracing::debug!(%generation, error = %e, "close after disconnect failed");
                    }
                    if exit == Exit::Shutdown {
                        tracing::info!(room = %self.room, "transport channel closed");
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(room = %self.room, error = %e, "connect failed");
                    self.publish(ConnectionState::Disconnected);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                _ = shutdown_requested(&mut self.shutdown) => break,
            }
            self.publish(ConnectionState::Reconnecting);
        }

        if self.status.borrow().state != ConnectionState::Disconnected {
            self.publish(ConnectionState::Disconnected);
        }
        tracing::info!(room = %self.room, "transport channel closed");
    }

    /// Moves frames in both directions until the connection ends.
    async fn pump(&mut self, conn: &C::Connection, generation: Generation) -> Exit {
        loop {
            tokio::select! {
                _ = shutdown_requested(&mut self.shutdown) => return Exit::Shutdown,
                incoming = conn.recv() => match incoming {
                    Ok(Some(text)) => {
                        tracing::trace!(%generation, len = text.len(), "frame received");
                        let event = ChannelEvent::Frame { generation, text };
                        if self.events.send(event).is_err() {
                            // Nobody is listening any more.
                            return Exit::Shutdown;
                        }
                    }
                    Ok(None) => {
                        tracing::info!(room = %self.room, %generation, "connection closed by peer");
                        return Exit::Lost;
                    }
                    Err(e) => {
                        tracing::warn!(room = %self.room, %generation, error = %e, "connection lost");
                        return Exit::Lost;
                    }
                },
                Some(frame) = self.outbound.recv() => {
                    if frame.generation != generation {
                        tracing::debug!(
                            %generation,
                            stale = %frame.generation,
                            "dropping frame addressed to a stale connection"
                        );
                        continue;
                    }
                    if let Err(e) = conn.send(&frame.text).await {
                        tracing::warn!(room = %self.room, %generation, error = %e, "send failed");
                        return Exit::Lost;
                    }
                }
            }
        }
    }

    fn publish(&mut self, state: ConnectionState) {
        let status = ChannelStatus {
            state,
            generation: self.generation,
        };
        tracing::debug!(room = %self.room, ?state, generation = ?self.generation, "connection state changed");
        self.status.send_replace(status);
        let _ = self.events.send(ChannelEvent::Status(status));
    }
}

/// Resolves once shutdown was requested or the handle was dropped.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
