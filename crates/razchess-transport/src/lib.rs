//! Transport layer for the razchess client.
//!
//! Owns the single duplex connection a client keeps to its room endpoint
//! and transparently re-establishes it when it drops.
//!
//! - [`Connector`] / [`Connection`] abstract over how a connection is dialed
//!   and how text frames move over it.
//! - [`TransportChannel`] runs the reconnect state machine
//!   (Connecting → Open → Disconnected → Reconnecting → Connecting) and tags
//!   everything it delivers with the [`Generation`] of the connection it
//!   arrived on.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket connector via `tokio-tungstenite`

mod channel;
mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use channel::{
    ChannelConfig, ChannelEvent, ChannelStatus, ConnectionState, FrameSender,
    OutboundFrame, TransportChannel,
};
pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;

/// Identity of the room a client is bound to.
///
/// The room never changes for the lifetime of a channel; reconnects always
/// dial the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a new `RoomId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the room identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tag for one successfully opened physical connection.
///
/// Every transition to [`ConnectionState::Open`] gets a fresh, strictly
/// greater generation. Anything bound to an older generation is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// The generation of the first connection a channel opens.
    pub const FIRST: Generation = Generation(1);

    /// Creates a `Generation` from a raw `u64`.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the generation that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Dials the endpoint of a room.
///
/// The returned futures must be `Send` because the reconnect loop runs on
/// its own Tokio task.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a new connection to the given room.
    fn connect(
        &self,
        room: &RoomId,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single physical connection that carries text frames.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the remote peer.
    fn send(
        &self,
        frame: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the peer closed the connection.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_next_is_strictly_greater() {
        let first = Generation::FIRST;
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.into_inner(), 2);
    }

    #[test]
    fn test_generation_display() {
        assert_eq!(Generation::new(7).to_string(), "gen-7");
    }

    #[test]
    fn test_room_id_display_is_raw_identifier() {
        let room = RoomId::new("custom-a1b2c3");
        assert_eq!(room.to_string(), "custom-a1b2c3");
        assert_eq!(room.as_str(), "custom-a1b2c3");
    }

    #[test]
    fn test_room_id_equality() {
        assert_eq!(RoomId::new("a"), RoomId::new(String::from("a")));
        assert_ne!(RoomId::new("a"), RoomId::new("b"));
    }
}
