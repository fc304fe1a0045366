//! Room addresses.
//!
//! Players share rooms as page links (`https://host/room/{id}`). The live
//! endpoint for the same room is `wss://host/ws/{id}`.

use std::fmt;

use razchess_transport::RoomId;

use crate::RazchessError;

/// Where a room lives: the WebSocket base URL of the server plus the room id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAddress {
    base: String,
    room: RoomId,
}

impl RoomAddress {
    /// Creates an address from a `ws://` or `wss://` base and a room id.
    pub fn new(base: impl Into<String>, room: RoomId) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
            room,
        }
    }

    /// Parses a session link.
    ///
    /// Accepts `http(s)://host/room/{id}` and rewrites the scheme to
    /// `ws(s)`. `ws(s)://host/ws/{id}` is taken as-is. Query strings and
    /// fragments are ignored.
    pub fn from_session_url(url: &str) -> Result<Self, RazchessError> {
        let invalid = |reason| RazchessError::InvalidSessionUrl {
            url: url.to_string(),
            reason,
        };

        let (scheme, rest) = url.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            _ => return Err(invalid("unsupported scheme")),
        };

        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let (host, path) = rest.split_once('/').ok_or_else(|| invalid("missing room path"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let room = match (segments.next(), segments.next(), segments.next()) {
            (Some("room" | "ws"), Some(id), None) => id,
            _ => return Err(invalid("path is not /room/{id}")),
        };

        Ok(Self {
            base: format!("{ws_scheme}://{host}"),
            room: RoomId::new(room),
        })
    }

    /// The WebSocket base URL, without a trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// The full endpoint, `{base}/ws/{room}`.
    pub fn ws_url(&self) -> String {
        format!("{}/ws/{}", self.base, self.room)
    }
}

impl fmt::Display for RoomAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ws_url())
    }
}
