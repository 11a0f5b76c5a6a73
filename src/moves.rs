//! Move representation and UCI long-algebraic encoding.

use crate::board::{PieceKind, Square};
use crate::error::MoveParseError;
use std::fmt;

/// Move flags. A small closed bit set rather than ad hoc fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MoveFlags(u8);

impl MoveFlags {
    pub const NONE: MoveFlags = MoveFlags(0);
    pub const CAPTURE: MoveFlags = MoveFlags(1 << 0);
    pub const EN_PASSANT: MoveFlags = MoveFlags(1 << 1);
    pub const CASTLE_KINGSIDE: MoveFlags = MoveFlags(1 << 2);
    pub const CASTLE_QUEENSIDE: MoveFlags = MoveFlags(1 << 3);

    pub fn contains(self, other: MoveFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for MoveFlags {
    type Output = MoveFlags;
    fn bitor(self, rhs: MoveFlags) -> MoveFlags {
        MoveFlags(self.0 | rhs.0)
    }
}

/// A move as produced by the generator. Flags are derived from the position,
/// so two moves with the same squares and promotion in the same position are
/// always equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
    pub flags: MoveFlags,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
            flags: MoveFlags::NONE,
        }
    }

    pub fn with_promotion(mut self, kind: PieceKind) -> Self {
        self.promotion = Some(kind);
        self
    }

    pub fn with_flags(mut self, flags: MoveFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    pub fn is_capture(&self) -> bool {
        self.flags.contains(MoveFlags::CAPTURE)
    }

    pub fn is_en_passant(&self) -> bool {
        self.flags.contains(MoveFlags::EN_PASSANT)
    }

    pub fn is_castle(&self) -> bool {
        self.flags.contains(MoveFlags::CASTLE_KINGSIDE)
            || self.flags.contains(MoveFlags::CASTLE_QUEENSIDE)
    }

    /// UCI notation (e.g. "e2e4" or "e7e8q")
    pub fn to_uci(&self) -> String {
        let mut uci = format!("{}{}", self.from, self.to);
        if let Some(promo) = self.promotion {
            uci.push(promo.letter());
        }
        uci
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

/// The squares and promotion piece of a UCI move string, before it is
/// matched against a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UciMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl UciMove {
    pub fn parse(uci: &str) -> Result<UciMove, MoveParseError> {
        let uci = uci.trim();
        if uci.len() < 4 || !uci.is_ascii() {
            return Err(MoveParseError::TooShort(uci.to_string()));
        }
        let from = uci[0..2]
            .parse()
            .map_err(|_| MoveParseError::InvalidSquare(uci.to_string()))?;
        let to = uci[2..4]
            .parse()
            .map_err(|_| MoveParseError::InvalidSquare(uci.to_string()))?;

        let promotion = match uci[4..].chars().next() {
            None => None,
            Some(c @ ('q' | 'r' | 'b' | 'n')) => PieceKind::from_letter(c),
            Some(c) => return Err(MoveParseError::InvalidPromotion(c)),
        };
        if uci.len() > 5 {
            return Err(MoveParseError::TooShort(uci.to_string()));
        }

        Ok(UciMove {
            from,
            to,
            promotion,
        })
    }
}
