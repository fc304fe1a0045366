//! Room session client for razchess.
//!
//! This crate is where the game lives on the client side:
//!
//! 1. **Session**: [`SessionClient`] joins a room, submits moves, resigns,
//!    and publishes [`SessionEvent`]s. It survives reconnects.
//! 2. **State**: [`GameStateStore`] keeps the latest authoritative update
//!    and derives highlights, sounds and rollbacks from it.
//! 3. **Promotion**: [`PromotionArbiter`] holds at most one open
//!    "which piece?" question; [`is_promotion_move`] decides when to ask.
//!
//! # How it fits in the stack
//!
//! ```text
//! Board / menu (above)  ← renders SessionEvents, calls submit_move
//!     ↕
//! Session Layer (this crate)  ← game state, move protocol, promotion
//!     ↕
//! RPC Layer (below)  ← Session.Move / Session.Update over JSON-RPC
//! ```

mod config;
mod error;
mod promotion;
mod session;
mod store;

pub use config::SessionConfig;
pub use error::SessionError;
pub use promotion::{PromotionArbiter, PromotionCancelled, PromotionFuture, is_promotion_move};
pub use session::{SessionClient, SessionEvent};
pub use store::{DISCONNECTED_STATUS, GameStateStore, Highlights, Sound, Transition};
