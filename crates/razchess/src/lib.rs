//! # razchess
//!
//! Live client for razchess rooms.
//!
//! A room is a two-player game hosted by the server. The client keeps a
//! WebSocket open to it (reconnecting forever on failure), receives every
//! authoritative game update, and submits moves over JSON-RPC. Locally it
//! tracks what the board should show: highlights, sounds, rollbacks after a
//! rejected move, and the "which piece?" question for pawn promotion.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use razchess::prelude::*;
//!
//! # async fn run() -> Result<(), RazchessError> {
//! razchess::init_tracing("info");
//!
//! let session = ClientBuilder::new()
//!     .session_url("https://chess.example.com/room/abc123")
//!     .connect()?;
//!
//! let mut events = session.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let SessionEvent::Updated(transition) = event {
//!         println!("{}", transition.current.status);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod address;
mod client;
mod error;

pub use address::RoomAddress;
pub use client::ClientBuilder;
pub use error::RazchessError;

pub use razchess_protocol as protocol;
pub use razchess_rpc as rpc;
pub use razchess_session as session;
pub use razchess_transport as transport;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"razchess=debug"`) when it is unset.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init();
}

/// Everything needed to join a room and follow the game.
pub mod prelude {
    pub use crate::{ClientBuilder, RazchessError, RoomAddress};
    pub use razchess_protocol::{
        Color, GameUpdate, MoveCode, PromotionPiece, Square,
    };
    pub use razchess_session::{
        GameStateStore, Highlights, PromotionCancelled, SessionClient, SessionConfig,
        SessionEvent, Sound, Transition,
    };
    pub use razchess_transport::{ChannelConfig, ConnectionState, RoomId};
}
