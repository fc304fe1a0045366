//! The game state store.
//!
//! Holds the latest authoritative [`GameUpdate`] and derives what the board
//! should show from the transition between the previous update and the new
//! one. Every derived value (highlights, sound) is computed inside
//! [`GameStateStore::apply`], so readers never see a new position with old
//! highlights.

use std::collections::BTreeSet;
use std::fmt;

use razchess_protocol::{Board, Color, GameUpdate, MoveCode, ProtocolError, Square};

/// Status reported while the connection is down.
pub const DISCONNECTED_STATUS: &str = "Disconnected";

/// Which sound the board should play.
///
/// Variants are listed in priority order for updates: a game-ending capture
/// plays [`Sound::GameOver`], a checking capture plays [`Sound::Capture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    GameOver,
    Capture,
    Check,
    Move,
    /// A submitted move was rejected by the server.
    Illegal,
}

impl Sound {
    pub fn name(self) -> &'static str {
        match self {
            Sound::GameOver => "gameover",
            Sound::Capture => "capture",
            Sound::Check => "check",
            Sound::Move => "move",
            Sound::Illegal => "illegal",
        }
    }

    /// Picks the sound for an update.
    pub fn for_update(update: &GameUpdate) -> Option<Sound> {
        if update.is_game_over {
            Some(Sound::GameOver)
        } else if update.is_capture {
            Some(Sound::Capture)
        } else if update.checked_square.is_some() {
            Some(Sound::Check)
        } else if update.last_move.is_some() {
            Some(Sound::Move)
        } else {
            None
        }
    }
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Squares the board should mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlights {
    pub last_move: Option<(Square, Square)>,
    pub check: Option<Square>,
}

impl Highlights {
    pub fn for_update(update: &GameUpdate) -> Self {
        Self {
            last_move: update.last_move,
            check: update.checked_square,
        }
    }

    /// All highlighted squares, deduplicated.
    pub fn squares(&self) -> BTreeSet<Square> {
        let mut squares = BTreeSet::new();
        if let Some((from, to)) = self.last_move {
            squares.insert(from);
            squares.insert(to);
        }
        squares.extend(self.check);
        squares
    }

    pub fn contains(&self, square: Square) -> bool {
        self.squares().contains(&square)
    }

    pub fn is_empty(&self) -> bool {
        self.last_move.is_none() && self.check.is_none()
    }
}

/// What changed when an update was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub previous: Option<GameUpdate>,
    pub current: GameUpdate,
    pub highlights: Highlights,
    pub sound: Option<Sound>,
}

impl Transition {
    /// Whether the opening name differs from the previous update.
    pub fn opening_changed(&self) -> bool {
        self.previous.as_ref().map(|p| &p.opening) != Some(&self.current.opening)
    }
}

/// Latest authoritative game state plus what the board derives from it.
#[derive(Debug, Default)]
pub struct GameStateStore {
    current: Option<GameUpdate>,
    previous: Option<GameUpdate>,
    highlights: Highlights,
    sound: Option<Sound>,
    pending_move: Option<MoveCode>,
    disconnected: bool,
    viewers: u32,
}

impl GameStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current update and recomputes highlights and sound.
    ///
    /// Any move still waiting for the server is considered settled: the new
    /// update is the truth either way.
    pub fn apply(&mut self, update: GameUpdate) -> Transition {
        let highlights = Highlights::for_update(&update);
        let sound = Sound::for_update(&update);

        self.previous = self.current.replace(update.clone());
        self.highlights = highlights;
        self.sound = sound;
        self.pending_move = None;
        self.disconnected = false;

        tracing::debug!(
            fen = %update.fen,
            sound = ?sound,
            highlighted = highlights.squares().len(),
            "applied game update"
        );

        Transition {
            previous: self.previous.clone(),
            current: update,
            highlights,
            sound,
        }
    }

    /// Records a move that was dropped on the board and sent to the server.
    pub fn begin_move(&mut self, mv: MoveCode) {
        self.pending_move = Some(mv);
    }

    /// The move waiting for server validation, if any.
    pub fn pending_move(&self) -> Option<MoveCode> {
        self.pending_move
    }

    /// The server rejected the pending move.
    ///
    /// Returns the FEN the board must snap back to and selects the illegal
    /// sound. PGN, opening and status are untouched.
    pub fn reject_move(&mut self) -> Option<String> {
        let fen = self.restore_board()?;
        self.sound = Some(Sound::Illegal);
        Some(fen)
    }

    /// Drops the pending move and returns the FEN to show, without choosing
    /// a sound.
    pub fn restore_board(&mut self) -> Option<String> {
        self.pending_move = None;
        self.current.as_ref().map(|update| update.fen.clone())
    }

    /// Reports [`DISCONNECTED_STATUS`] until the next update arrives.
    pub fn mark_disconnected(&mut self) {
        self.disconnected = true;
        self.pending_move = None;
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub fn set_viewers(&mut self, viewers: u32) {
        self.viewers = viewers;
    }

    pub fn viewers(&self) -> u32 {
        self.viewers
    }

    /// Whether a piece of `color` may be picked up.
    pub fn can_drag(&self, color: Color) -> bool {
        match &self.current {
            Some(update) => !update.is_game_over && update.turn == color,
            None => false,
        }
    }

    pub fn current(&self) -> Option<&GameUpdate> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&GameUpdate> {
        self.previous.as_ref()
    }

    pub fn fen(&self) -> Option<&str> {
        self.current.as_ref().map(|u| u.fen.as_str())
    }

    pub fn pgn(&self) -> Option<&str> {
        self.current.as_ref().map(|u| u.pgn.as_str())
    }

    pub fn turn(&self) -> Option<Color> {
        self.current.as_ref().map(|u| u.turn)
    }

    pub fn status(&self) -> Option<&str> {
        if self.disconnected {
            return Some(DISCONNECTED_STATUS);
        }
        self.current.as_ref().map(|u| u.status.as_str())
    }

    pub fn opening(&self) -> Option<&str> {
        self.current.as_ref().and_then(|u| u.opening.as_deref())
    }

    pub fn is_game_over(&self) -> bool {
        self.current.as_ref().is_some_and(|u| u.is_game_over)
    }

    pub fn highlights(&self) -> Highlights {
        self.highlights
    }

    pub fn sound(&self) -> Option<Sound> {
        self.sound
    }

    /// Piece placement of the current update.
    ///
    /// Returns `Ok(None)` before the first update.
    pub fn board(&self) -> Result<Option<Board>, ProtocolError> {
        self.current
            .as_ref()
            .map(|u| Board::from_fen(&u.fen))
            .transpose()
    }
}
