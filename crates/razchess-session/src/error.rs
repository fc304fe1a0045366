//! Error types for the session layer.

use razchess_protocol::ProtocolError;
use razchess_rpc::RpcError;

/// Errors returned by [`SessionClient`](crate::SessionClient) operations.
///
/// A move the server refuses is not an error; `submit_move` returns
/// `Ok(false)` for it.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The call did not complete (connection lost, remote error, ...).
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The server sent something the client could not read, such as a
    /// non-boolean answer to `Session.Move` or an unparsable FEN.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A move was submitted before the first game update arrived.
    #[error("no position received yet")]
    NoPosition,
}
