//! Chess value types and the authoritative game update record.
//!
//! Everything here travels on the wire, so each type has a fixed string
//! form: colors are `"w"`/`"b"`, squares are `"e4"`, moves are `"e7e8q"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// A side of the board.
///
/// Serialized as the FEN active-color letter: `"w"` or `"b"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
}

impl Color {
    /// Returns the FEN letter for this color.
    pub fn as_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// Returns the other side.
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Parses a FEN active-color letter.
    pub fn from_char(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Color {
    type Err = ProtocolError;

    /// Accepts `w`, `b`, `white`, or `black` (any case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "w" | "white" => Ok(Color::White),
            "b" | "black" => Ok(Color::Black),
            _ => Err(ProtocolError::InvalidMessage(format!(
                "unknown color {s:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Square
// ---------------------------------------------------------------------------

/// One of the 64 board squares.
///
/// Files and ranks are stored zero-based (`a1` is `(0, 0)`, `h8` is
/// `(7, 7)`). Ordering is by file, then rank, so sets of squares print in a
/// stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Creates a square from zero-based file and rank indices.
    ///
    /// Returns `None` if either index is outside `0..8`.
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        (file < 8 && rank < 8).then_some(Square { file, rank })
    }

    /// Zero-based file index (`a` = 0).
    pub fn file(self) -> u8 {
        self.file
    }

    /// Zero-based rank index (rank 1 = 0).
    pub fn rank(self) -> u8 {
        self.rank
    }

    /// The rank as printed on the board, `1..=8`.
    pub fn rank_number(self) -> u8 {
        self.rank + 1
    }

    /// The file letter, `'a'..='h'`.
    pub fn file_char(self) -> char {
        (b'a' + self.file) as char
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_number())
    }
}

impl FromStr for Square {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ProtocolError::InvalidSquare(s.to_string()));
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(|| ProtocolError::InvalidSquare(s.to_string()))
    }
}

impl Serialize for Square {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Square {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// PromotionPiece
// ---------------------------------------------------------------------------

/// A piece a pawn may promote to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionPiece {
    Queen,
    Rook,
    Knight,
    Bishop,
}

impl PromotionPiece {
    /// Every promotion choice, strongest first.
    pub const ALL: [PromotionPiece; 4] = [
        PromotionPiece::Queen,
        PromotionPiece::Rook,
        PromotionPiece::Knight,
        PromotionPiece::Bishop,
    ];

    /// The lowercase letter appended to a move code.
    pub fn letter(self) -> char {
        match self {
            PromotionPiece::Queen => 'q',
            PromotionPiece::Rook => 'r',
            PromotionPiece::Knight => 'n',
            PromotionPiece::Bishop => 'b',
        }
    }

    /// Parses a promotion letter (either case).
    pub fn from_letter(c: char) -> Option<PromotionPiece> {
        match c.to_ascii_lowercase() {
            'q' => Some(PromotionPiece::Queen),
            'r' => Some(PromotionPiece::Rook),
            'n' => Some(PromotionPiece::Knight),
            'b' => Some(PromotionPiece::Bishop),
            _ => None,
        }
    }
}

impl fmt::Display for PromotionPiece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// ---------------------------------------------------------------------------
// MoveCode
// ---------------------------------------------------------------------------

/// A move as sent to `Session.Move`: source square, destination square,
/// and an optional promotion letter (`e2e4`, `e7e8q`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveCode {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PromotionPiece>,
}

impl MoveCode {
    /// Creates a move without a promotion letter.
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    /// Returns the same move with the given promotion letter.
    #[must_use]
    pub fn with_promotion(mut self, piece: PromotionPiece) -> Self {
        self.promotion = Some(piece);
        self
    }
}

impl fmt::Display for MoveCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(piece) = self.promotion {
            write!(f, "{piece}")?;
        }
        Ok(())
    }
}

impl FromStr for MoveCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidMove(s.to_string());
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(invalid());
        }
        let from: Square = s[0..2].parse().map_err(|_| invalid())?;
        let to: Square = s[2..4].parse().map_err(|_| invalid())?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(c) => Some(PromotionPiece::from_letter(c).ok_or_else(invalid)?),
        };
        Ok(MoveCode {
            from,
            to,
            promotion,
        })
    }
}

impl Serialize for MoveCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MoveCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// GameUpdate
// ---------------------------------------------------------------------------

/// The authoritative game snapshot pushed in `Session.Update`.
///
/// A new update replaces the previous one wholesale; fields are never
/// merged. Optional fields are `None` when the server omitted them, sent
/// `null`, or sent an empty placeholder (`""`, `["", ""]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireUpdate", into = "WireUpdate")]
pub struct GameUpdate {
    /// Full position.
    pub fen: String,
    /// Move history.
    pub pgn: String,
    /// Side to move.
    pub turn: Color,
    /// Source and destination of the last move.
    pub last_move: Option<(Square, Square)>,
    /// Whether the last move captured a piece.
    pub is_capture: bool,
    /// Whether the game has ended.
    pub is_game_over: bool,
    /// Square of the king in check, if any.
    pub checked_square: Option<Square>,
    /// Name of the recognised opening.
    pub opening: Option<String>,
    /// Human-readable status line computed by the server.
    pub status: String,
}

/// The literal JSON shape of an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUpdate {
    fen: String,
    #[serde(default)]
    pgn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    turn: Option<Color>,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    last_move: Option<[String; 2]>,
    #[serde(default)]
    is_capture: bool,
    #[serde(default)]
    is_game_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checked_square: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    opening: Option<String>,
    #[serde(default)]
    status: String,
}

impl TryFrom<WireUpdate> for GameUpdate {
    type Error = ProtocolError;

    fn try_from(wire: WireUpdate) -> Result<Self, Self::Error> {
        // Older servers leave `turn` out; the FEN carries it anyway.
        let turn = match wire.turn {
            Some(turn) => turn,
            None => crate::board::active_color(&wire.fen).ok_or_else(|| {
                ProtocolError::InvalidFen(format!("no active color in {:?}", wire.fen))
            })?,
        };

        let last_move = match wire.last_move {
            Some([from, to]) if !from.is_empty() && !to.is_empty() => {
                Some((from.parse()?, to.parse()?))
            }
            _ => None,
        };

        let checked_square = match wire.checked_square {
            Some(square) if !square.is_empty() => Some(square.parse()?),
            _ => None,
        };

        Ok(GameUpdate {
            fen: wire.fen,
            pgn: wire.pgn,
            turn,
            last_move,
            is_capture: wire.is_capture,
            is_game_over: wire.is_game_over,
            checked_square,
            opening: wire.opening.filter(|o| !o.is_empty()),
            status: wire.status,
        })
    }
}

impl From<GameUpdate> for WireUpdate {
    fn from(update: GameUpdate) -> Self {
        WireUpdate {
            fen: update.fen,
            pgn: update.pgn,
            turn: Some(update.turn),
            last_move: update
                .last_move
                .map(|(from, to)| [from.to_string(), to.to_string()]),
            is_capture: update.is_capture,
            is_game_over: update.is_game_over,
            checked_square: update.checked_square.map(|s| s.to_string()),
            opening: update.opening,
            status: update.status,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    // =====================================================================
    // Color
    // =====================================================================

    #[test]
    fn test_color_serializes_as_fen_letter() {
        assert_eq!(serde_json::to_string(&Color::White).unwrap(), "\"w\"");
        assert_eq!(serde_json::to_string(&Color::Black).unwrap(), "\"b\"");
    }

    #[test]
    fn test_color_from_str_accepts_words_and_letters() {
        assert_eq!("w".parse::<Color>().unwrap(), Color::White);
        assert_eq!("Black".parse::<Color>().unwrap(), Color::Black);
        assert!("red".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_opponent() {
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(Color::Black.opponent(), Color::White);
    }

    // =====================================================================
    // Square
    // =====================================================================

    #[test]
    fn test_square_parse_corners() {
        let a1 = sq("a1");
        assert_eq!((a1.file(), a1.rank()), (0, 0));
        let h8 = sq("h8");
        assert_eq!((h8.file(), h8.rank()), (7, 7));
        assert_eq!(h8.rank_number(), 8);
        assert_eq!(h8.file_char(), 'h');
    }

    #[test]
    fn test_square_rejects_off_board_names() {
        for bad in ["", "e", "e9", "i1", "e0", "E4", "e44"] {
            assert!(bad.parse::<Square>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_square_display_matches_input() {
        assert_eq!(sq("e4").to_string(), "e4");
    }

    #[test]
    fn test_square_orders_by_file_then_rank() {
        assert!(sq("a8") < sq("b1"));
        assert!(sq("e2") < sq("e4"));
    }

    // =====================================================================
    // MoveCode
    // =====================================================================

    #[test]
    fn test_move_code_plain() {
        let mv: MoveCode = "e2e4".parse().unwrap();
        assert_eq!(mv.from, sq("e2"));
        assert_eq!(mv.to, sq("e4"));
        assert_eq!(mv.promotion, None);
        assert_eq!(mv.to_string(), "e2e4");
    }

    #[test]
    fn test_move_code_with_promotion_letter() {
        let mv: MoveCode = "e7e8q".parse().unwrap();
        assert_eq!(mv.promotion, Some(PromotionPiece::Queen));
        assert_eq!(mv.to_string(), "e7e8q");

        let appended = MoveCode::new(sq("b2"), sq("b1")).with_promotion(PromotionPiece::Knight);
        assert_eq!(appended.to_string(), "b2b1n");
    }

    #[test]
    fn test_move_code_rejects_garbage() {
        for bad in ["", "e2", "e2e", "e2e4k", "e2e4qq", "z2e4", "Nf3"] {
            assert!(bad.parse::<MoveCode>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_move_code_serializes_as_string() {
        let mv: MoveCode = "g7g8r".parse().unwrap();
        assert_eq!(serde_json::to_string(&mv).unwrap(), "\"g7g8r\"");
    }

    // =====================================================================
    // GameUpdate
    // =====================================================================

    #[test]
    fn test_update_full_shape() {
        let json = r#"{
            "fen": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            "pgn": "1. e4 *",
            "turn": "b",
            "move": ["e2", "e4"],
            "isCapture": false,
            "isGameOver": false,
            "opening": "King's Pawn",
            "status": "Black to move"
        }"#;
        let update: GameUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.turn, Color::Black);
        assert_eq!(update.last_move, Some((sq("e2"), sq("e4"))));
        assert_eq!(update.checked_square, None);
        assert_eq!(update.opening.as_deref(), Some("King's Pawn"));
        assert_eq!(update.status, "Black to move");
    }

    #[test]
    fn test_update_empty_placeholders_mean_none() {
        // The server sends a zeroed move pair before the first move.
        let json = r#"{
            "fen": "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "move": ["", ""],
            "checkedSquare": "",
            "opening": ""
        }"#;
        let update: GameUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.last_move, None);
        assert_eq!(update.checked_square, None);
        assert_eq!(update.opening, None);
        assert!(!update.is_capture);
        assert!(!update.is_game_over);
    }

    #[test]
    fn test_update_turn_falls_back_to_fen() {
        let json = r#"{"fen": "8/8/8/8/8/8/8/K6k b - - 0 40", "move": null}"#;
        let update: GameUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.turn, Color::Black);
    }

    #[test]
    fn test_update_bad_checked_square_is_rejected() {
        let json = r#"{"fen": "8/8/8/8/8/8/8/K6k w - - 0 1", "checkedSquare": "z9"}"#;
        let result: Result<GameUpdate, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_serializes_camel_case() {
        let update = GameUpdate {
            fen: "8/8/8/8/8/8/8/K6k w - - 0 1".into(),
            pgn: String::new(),
            turn: Color::White,
            last_move: Some((sq("a2"), sq("a1"))),
            is_capture: true,
            is_game_over: false,
            checked_square: Some(sq("h1")),
            opening: None,
            status: "White to move".into(),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["move"], serde_json::json!(["a2", "a1"]));
        assert_eq!(json["isCapture"], true);
        assert_eq!(json["checkedSquare"], "h1");
        assert!(json.get("opening").is_none());
    }
}
