//! Error types for the RPC layer.

use razchess_protocol::ProtocolError;
use razchess_transport::TransportError;

/// Why a call did not produce a result.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The connection the call was sent on went away, or none was open
    /// when the call was made. The call is never retried.
    #[error("connection lost before the call completed")]
    Disconnected,

    /// The server answered with a JSON-RPC error object.
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    /// The frame could not be queued on the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The client's event pump has stopped.
    #[error("rpc client closed")]
    Closed,
}
