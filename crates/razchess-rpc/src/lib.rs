//! JSON-RPC 2.0 over a reconnecting razchess transport.
//!
//! [`RpcClient`] turns the frame stream of a
//! [`TransportChannel`](razchess_transport::TransportChannel) into typed
//! calls and named push handlers:
//!
//! - [`RpcClient::call`] sends a request on the open connection and waits
//!   for the response with the same id *and* the same generation.
//! - [`RpcClient::on`] registers a handler for server pushes. Pushes sent as
//!   requests (with an id) are acknowledged with `true`.
//! - When the connection drops, every call bound to it fails with
//!   [`RpcError::Disconnected`]. Nothing is retried.
//!
//! ```text
//! ChannelEvent ──attach()──→ handle_event ──┬─→ pending call (oneshot)
//!                                           └─→ handlers (Session.Update, …)
//! ```

mod client;
mod error;

pub use client::{Handler, RpcClient, Subscription};
pub use error::RpcError;
