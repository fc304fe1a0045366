//! Wire protocol for razchess.
//!
//! This crate defines the "language" the client and the room server speak:
//!
//! - **Frames** ([`Request`], [`Response`], [`Incoming`]): JSON-RPC 2.0
//!   messages, one per WebSocket text frame.
//! - **Game values** ([`GameUpdate`], [`Color`], [`Square`], [`MoveCode`],
//!   [`PromotionPiece`]): what travels inside those frames.
//! - **Board** ([`Board`]): piece placement read from a FEN.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how values are converted
//!   to and from frame text.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw text frames) and RPC
//! (call correlation). It doesn't know about connections or generations.
//!
//! ```text
//! Transport (text) → Protocol (Incoming) → RPC (calls, handlers) → Session
//! ```

mod board;
mod codec;
mod error;
#[cfg(feature = "json")]
mod frame;
mod types;

pub use board::{Board, Piece, PieceKind, START_FEN, active_color};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
#[cfg(feature = "json")]
pub use frame::{
    ErrorObject, Incoming, JSONRPC_VERSION, Notification, Request, Response,
    SERVER_ERROR_CODE, unwrap_params,
};
pub use types::{Color, GameUpdate, MoveCode, PromotionPiece, Square};

/// Method names used on the room endpoint.
pub mod methods {
    /// Client → server: submit a move code, returns `bool`.
    pub const MOVE: &str = "Session.Move";
    /// Client → server: resign the given color.
    pub const RESIGN: &str = "Session.Resign";
    /// Server → client: a new authoritative [`GameUpdate`](crate::GameUpdate).
    pub const UPDATE: &str = "Session.Update";
    /// Server → client: number of connected viewers.
    pub const UPDATE_VIEW_COUNT: &str = "Session.UpdateViewCount";
}
