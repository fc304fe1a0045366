//! Unified error type for the razchess client.

use razchess_protocol::ProtocolError;
use razchess_rpc::RpcError;
use razchess_session::SessionError;
use razchess_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so `?`
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RazchessError {
    /// A transport-level error (dial, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (decode, bad square, bad FEN).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A call that did not complete.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// A session-level error (no position yet, bad answer).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session URL could not be turned into a room address.
    #[error("invalid session url {url:?}: {reason}")]
    InvalidSessionUrl { url: String, reason: &'static str },
}
