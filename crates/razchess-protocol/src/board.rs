//! Piece placement read from a FEN string.
//!
//! The client never validates moves; it only needs to know which piece sits
//! on a square (for the promotion pre-check and for restoring the board after
//! a rejected move). Only the first two FEN fields are read.

use crate::{Color, ProtocolError, Square};

/// The standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// Reads a FEN piece letter. Uppercase is white.
    pub fn from_fen_char(c: char) -> Option<Piece> {
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece { kind, color })
    }

    pub fn is_pawn(&self) -> bool {
        self.kind == PieceKind::Pawn
    }
}

/// An 8x8 board of optional pieces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    // Indexed [rank][file], rank 0 is rank 1.
    squares: [[Option<Piece>; 8]; 8],
    active: Color,
}

impl Board {
    pub fn empty() -> Self {
        Self {
            squares: [[None; 8]; 8],
            active: Color::White,
        }
    }

    /// Parses the placement and active-color fields of a FEN.
    ///
    /// A missing active-color field defaults to white.
    pub fn from_fen(fen: &str) -> Result<Board, ProtocolError> {
        let mut fields = fen.split_whitespace();
        let placement = fields
            .next()
            .ok_or_else(|| ProtocolError::InvalidFen("empty FEN string".into()))?;

        let mut board = Board::empty();
        let rows: Vec<&str> = placement.split('/').collect();
        if rows.len() != 8 {
            return Err(ProtocolError::InvalidFen(format!(
                "expected 8 rows, got {}",
                rows.len()
            )));
        }

        // FEN lists rank 8 first.
        for (row_idx, row) in rows.iter().enumerate() {
            let rank = 7 - row_idx as u8;
            let mut file = 0u8;

            for c in row.chars() {
                if file >= 8 {
                    return Err(ProtocolError::InvalidFen(format!(
                        "row {row_idx} has too many files"
                    )));
                }
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                } else if let Some(piece) = Piece::from_fen_char(c) {
                    board.squares[rank as usize][file as usize] = Some(piece);
                    file += 1;
                } else {
                    return Err(ProtocolError::InvalidFen(format!(
                        "invalid piece character {c:?}"
                    )));
                }
            }

            if file != 8 {
                return Err(ProtocolError::InvalidFen(format!(
                    "row {row_idx} has {file} files, expected 8"
                )));
            }
        }

        if let Some(field) = fields.next() {
            board.active = field
                .chars()
                .next()
                .and_then(Color::from_char)
                .ok_or_else(|| {
                    ProtocolError::InvalidFen(format!("invalid active color {field:?}"))
                })?;
        }

        Ok(board)
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.rank() as usize][square.file() as usize]
    }

    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[square.rank() as usize][square.file() as usize] = piece;
    }

    /// Side to move.
    pub fn active_color(&self) -> Color {
        self.active
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

/// Reads only the active-color field of a FEN.
pub fn active_color(fen: &str) -> Option<Color> {
    fen.split_whitespace()
        .nth(1)
        .and_then(|field| field.chars().next())
        .and_then(Color::from_char)
}
