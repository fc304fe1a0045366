//! `ClientBuilder`: from a session link (or server + room) to a running
//! [`SessionClient`].

use std::time::Duration;

use razchess_session::{SessionClient, SessionConfig};
use razchess_transport::{RoomId, WebSocketConnector};

use crate::{RazchessError, RoomAddress};

/// Builder for joining a room.
///
/// # Example
///
/// ```rust,no_run
/// use razchess::prelude::*;
///
/// # async fn run() -> Result<(), RazchessError> {
/// let session = ClientBuilder::new()
///     .session_url("https://chess.example.com/room/abc123")
///     .connect()?;
/// let mut events = session.subscribe();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    session_url: Option<String>,
    server: Option<String>,
    room: Option<RoomId>,
    config: SessionConfig,
}

impl ClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the room named by a shared link. Takes precedence over
    /// [`server`](Self::server) and [`room`](Self::room).
    pub fn session_url(mut self, url: impl Into<String>) -> Self {
        self.session_url = Some(url.into());
        self
    }

    /// WebSocket base of the server, e.g. `ws://127.0.0.1:8080`.
    pub fn server(mut self, base: impl Into<String>) -> Self {
        self.server = Some(base.into());
        self
    }

    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(RoomId::new(room));
        self
    }

    /// Delay between a lost connection and the next dial.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.channel.reconnect_delay = delay;
        self
    }

    /// Capacity of the session event broadcast.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Replaces the whole session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolves the room address without connecting.
    pub fn address(&self) -> Result<RoomAddress, RazchessError> {
        if let Some(url) = &self.session_url {
            return RoomAddress::from_session_url(url);
        }
        match (&self.server, &self.room) {
            (Some(server), Some(room)) => Ok(RoomAddress::new(server.clone(), room.clone())),
            _ => Err(RazchessError::InvalidSessionUrl {
                url: String::new(),
                reason: "neither a session url nor a server and room were given",
            }),
        }
    }

    /// Starts the session. Connecting happens in the background; watch
    /// [`SessionClient::subscribe`] for the first update.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(self) -> Result<SessionClient, RazchessError> {
        let address = self.address()?;
        tracing::info!(endpoint = %address, "joining room");
        let connector = WebSocketConnector::new(address.base());
        Ok(SessionClient::start(
            connector,
            address.room().clone(),
            self.config,
        ))
    }
}
