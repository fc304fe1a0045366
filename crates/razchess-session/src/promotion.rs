//! Pawn promotion: the local pre-check and the single-slot arbiter.
//!
//! When a dropped move looks like a promotion, the client has to ask the
//! player which piece they want before the move can be sent. Only one such
//! question can be open at a time; asking again cancels the old one.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use razchess_protocol::{Board, Color, PromotionPiece, Square};
use tokio::sync::oneshot;

/// Whether moving the piece on `from` to `to` is a pawn promotion
/// candidate.
///
/// This is a geometric check only. It does not know about pins, checks or
/// whose turn it is; the server still decides legality.
pub fn is_promotion_move(board: &Board, from: Square, to: Square) -> bool {
    let Some(piece) = board.piece_at(from) else {
        return false;
    };
    if !piece.is_pawn() {
        return false;
    }

    let (source_rank, target_rank) = match piece.color {
        Color::White => (7, 8),
        Color::Black => (2, 1),
    };
    if from.rank_number() != source_rank || to.rank_number() != target_rank {
        return false;
    }

    let occupied = board.piece_at(to).is_some();
    match from.file().abs_diff(to.file()) {
        0 => !occupied,
        1 => occupied,
        _ => false,
    }
}

/// Why a promotion request ended without a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PromotionCancelled {
    /// A newer request replaced this one.
    #[error("promotion request superseded")]
    Superseded,
    /// The player closed the picker, or the arbiter went away.
    #[error("promotion request dismissed")]
    Dismissed,
}

type Reply = oneshot::Sender<Result<PromotionPiece, PromotionCancelled>>;

struct PendingPromotion {
    color: Color,
    reply: Reply,
}

/// Holds at most one open promotion request.
#[derive(Default)]
pub struct PromotionArbiter {
    slot: Mutex<Option<PendingPromotion>>,
}

impl PromotionArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the slot, clearing a request whose future has been dropped.
    fn slot(&self) -> MutexGuard<'_, Option<PendingPromotion>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|pending| pending.reply.is_closed()) {
            if let Some(abandoned) = slot.take() {
                tracing::debug!(color = %abandoned.color, "promotion request abandoned");
            }
        }
        slot
    }

    /// Opens a request for `color`, superseding any request still open.
    pub fn open(&self, color: Color) -> PromotionFuture {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.slot();
        if let Some(old) = slot.take() {
            tracing::debug!(color = %old.color, "superseding open promotion request");
            let _ = old.reply.send(Err(PromotionCancelled::Superseded));
        }
        *slot = Some(PendingPromotion { color, reply: tx });
        PromotionFuture { color, reply: rx }
    }

    /// Answers the open request. Returns `false` if none was open.
    pub fn resolve(&self, piece: PromotionPiece) -> bool {
        self.finish(Ok(piece))
    }

    /// Cancels the open request. Returns `false` if none was open.
    pub fn dismiss(&self) -> bool {
        self.finish(Err(PromotionCancelled::Dismissed))
    }

    /// Color of the pawn the open request is about.
    pub fn pending_color(&self) -> Option<Color> {
        self.slot().as_ref().map(|p| p.color)
    }

    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    fn finish(&self, outcome: Result<PromotionPiece, PromotionCancelled>) -> bool {
        match self.slot().take() {
            Some(pending) => {
                let _ = pending.reply.send(outcome);
                true
            }
            None => false,
        }
    }
}

/// Resolves once the request is answered, superseded or dismissed.
///
/// Dropping the future withdraws the request: the arbiter stops reporting it
/// and a later `resolve` returns `false`.
#[must_use = "dropping the future withdraws the promotion request"]
pub struct PromotionFuture {
    color: Color,
    reply: oneshot::Receiver<Result<PromotionPiece, PromotionCancelled>>,
}

impl PromotionFuture {
    pub fn color(&self) -> Color {
        self.color
    }
}

impl Future for PromotionFuture {
    type Output = Result<PromotionPiece, PromotionCancelled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(PromotionCancelled::Dismissed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn board(fen: &str) -> Board {
        Board::from_fen(fen).unwrap()
    }

    // =====================================================================
    // Pre-check
    // =====================================================================

    #[test]
    fn test_white_pawn_straight_to_empty_square() {
        let b = board("k7/4P3/8/8/8/8/8/4K3 w - - 0 1");
        assert!(is_promotion_move(&b, sq("e7"), sq("e8")));
    }

    #[test]
    fn test_straight_push_blocked_is_not_promotion() {
        let b = board("4r2k/4P3/8/8/8/8/8/4K3 w - - 0 1");
        assert!(!is_promotion_move(&b, sq("e7"), sq("e8")));
    }

    #[test]
    fn test_diagonal_needs_occupied_target() {
        let b = board("3r3k/4P3/8/8/8/8/8/4K3 w - - 0 1");
        assert!(is_promotion_move(&b, sq("e7"), sq("d8")));
        assert!(!is_promotion_move(&b, sq("e7"), sq("f8")));
    }

    #[test]
    fn test_black_pawn_promotes_on_first_rank() {
        let b = board("4k3/8/8/8/8/8/3p4/2N1BK2 b - - 0 1");
        assert!(is_promotion_move(&b, sq("d2"), sq("d1")));
        assert!(is_promotion_move(&b, sq("d2"), sq("c1")));
        assert!(is_promotion_move(&b, sq("d2"), sq("e1")));

        let b = board("4k3/8/8/8/8/8/3p4/4K3 b - - 0 1");
        assert!(!is_promotion_move(&b, sq("d2"), sq("c1")), "nothing to capture");
    }

    #[test]
    fn test_wrong_rank_or_piece_is_not_promotion() {
        let b = board("k7/4P3/4R3/8/8/8/8/4K3 w - - 0 1");
        assert!(!is_promotion_move(&b, sq("e6"), sq("e8")), "rook, not pawn");
        let b = board("k7/8/4P3/8/8/8/8/4K3 w - - 0 1");
        assert!(!is_promotion_move(&b, sq("e6"), sq("e7")), "not from the 7th rank");
        assert!(!is_promotion_move(&b, sq("a1"), sq("a2")), "empty source");
    }

    #[test]
    fn test_file_jump_of_two_is_not_promotion() {
        let b = board("k2r4/4P3/8/8/8/8/8/4K3 w - - 0 1");
        assert!(!is_promotion_move(&b, sq("e7"), sq("c8")));
    }

    // =====================================================================
    // Arbiter
    // =====================================================================

    #[tokio::test]
    async fn test_resolve_fulfils_open_request() {
        let arbiter = PromotionArbiter::new();
        let request = arbiter.open(Color::White);
        assert_eq!(arbiter.pending_color(), Some(Color::White));

        assert!(arbiter.resolve(PromotionPiece::Knight));
        assert_eq!(request.await, Ok(PromotionPiece::Knight));
        assert!(!arbiter.is_pending());
    }

    #[tokio::test]
    async fn test_second_open_supersedes_first() {
        let arbiter = PromotionArbiter::new();
        let first = arbiter.open(Color::White);
        let second = arbiter.open(Color::Black);

        assert_eq!(first.await, Err(PromotionCancelled::Superseded));

        // A late answer goes to the newer request only.
        assert!(arbiter.resolve(PromotionPiece::Rook));
        assert_eq!(second.await, Ok(PromotionPiece::Rook));
    }

    #[tokio::test]
    async fn test_only_first_outcome_counts() {
        let arbiter = PromotionArbiter::new();
        let request = arbiter.open(Color::White);
        assert!(arbiter.dismiss());
        assert!(!arbiter.resolve(PromotionPiece::Queen));
        assert!(!arbiter.dismiss());
        assert_eq!(request.await, Err(PromotionCancelled::Dismissed));
    }

    #[tokio::test]
    async fn test_request_outliving_arbiter_is_dismissed() {
        let arbiter = PromotionArbiter::new();
        let request = arbiter.open(Color::Black);
        assert_eq!(request.color(), Color::Black);
        drop(arbiter);
        assert_eq!(request.await, Err(PromotionCancelled::Dismissed));
    }

    #[test]
    fn test_dropped_request_is_withdrawn() {
        let arbiter = PromotionArbiter::new();
        let request = arbiter.open(Color::White);
        assert!(arbiter.is_pending());

        drop(request);
        assert!(!arbiter.is_pending());
        assert_eq!(arbiter.pending_color(), None);
        assert!(!arbiter.resolve(PromotionPiece::Queen));
    }

    #[tokio::test]
    async fn test_dropped_request_does_not_block_a_new_one() {
        let arbiter = PromotionArbiter::new();
        drop(arbiter.open(Color::White));

        let request = arbiter.open(Color::Black);
        assert_eq!(arbiter.pending_color(), Some(Color::Black));
        assert!(arbiter.resolve(PromotionPiece::Bishop));
        assert_eq!(request.await, Ok(PromotionPiece::Bishop));
    }

    #[test]
    fn test_resolve_without_request_is_noop() {
        let arbiter = PromotionArbiter::new();
        assert!(!arbiter.resolve(PromotionPiece::Queen));
        assert!(!arbiter.dismiss());
    }
}
