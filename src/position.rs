//! Game state: the board plus everything the rules need beyond piece
//! placement (turn, castling rights, en-passant target, clocks, history).

use crate::board::{Board, Color, Piece, PieceKind, Square};
use crate::error::{MoveParseError, PositionError};
use crate::moves::{Move, MoveFlags, UciMove};
use std::fmt;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

/// Castling rights, 4 LSB: white kingside, white queenside, black ks, black qs
/// (bit 3 = K, bit 2 = Q, bit 1 = k, bit 0 = q).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    fn mask(color: Color, side: CastleSide) -> u8 {
        match (color, side) {
            (Color::White, CastleSide::KingSide) => 0b1000,
            (Color::White, CastleSide::QueenSide) => 0b0100,
            (Color::Black, CastleSide::KingSide) => 0b0010,
            (Color::Black, CastleSide::QueenSide) => 0b0001,
        }
    }

    pub fn has(self, color: Color, side: CastleSide) -> bool {
        self.0 & Self::mask(color, side) != 0
    }

    pub fn has_any(self, color: Color) -> bool {
        self.has(color, CastleSide::KingSide) || self.has(color, CastleSide::QueenSide)
    }

    pub fn remove(&mut self, color: Color, side: CastleSide) {
        self.0 &= !Self::mask(color, side);
    }

    pub fn remove_all(&mut self, color: Color) {
        self.remove(color, CastleSide::KingSide);
        self.remove(color, CastleSide::QueenSide);
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    fn to_fen(self) -> String {
        let mut s = String::new();
        for (c, color, side) in [
            ('K', Color::White, CastleSide::KingSide),
            ('Q', Color::White, CastleSide::QueenSide),
            ('k', Color::Black, CastleSide::KingSide),
            ('q', Color::Black, CastleSide::QueenSide),
        ] {
            if self.has(color, side) {
                s.push(c);
            }
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }

    fn from_fen(field: &str) -> Result<CastlingRights, PositionError> {
        let mut rights = CastlingRights::NONE;
        for ch in field.chars() {
            match ch {
                'K' => rights.0 |= 0b1000,
                'Q' => rights.0 |= 0b0100,
                'k' => rights.0 |= 0b0010,
                'q' => rights.0 |= 0b0001,
                '-' => {}
                _ => return Err(PositionError::InvalidFen("invalid castle char")),
            }
        }
        Ok(rights)
    }
}

/// Home squares of the rooks and the king, by side.
pub(crate) fn rook_home(color: Color, side: CastleSide) -> Square {
    let rank = color.back_rank();
    let file = match side {
        CastleSide::KingSide => 7,
        CastleSide::QueenSide => 0,
    };
    Square::at(file, rank)
}

pub(crate) fn king_home(color: Color) -> Square {
    Square::at(4, color.back_rank())
}

/// Rook (from, to) for a castling move of `color`.
pub(crate) fn castle_rook_squares(color: Color, side: CastleSide) -> (Square, Square) {
    let rank = color.back_rank();
    let to_file = match side {
        CastleSide::KingSide => 5,
        CastleSide::QueenSide => 3,
    };
    (
        rook_home(color, side),
        Square::at(to_file, rank),
    )
}

/// Move the pieces of `mv` on `board` (rook for castling, captured pawn for
/// en passant, promotion). Returns the captured piece, if any. No legality
/// checks: used both for the real move and for self-check simulation.
pub(crate) fn place_move(board: &mut Board, mv: &Move) -> Option<Piece> {
    let Some(mover) = board.take(mv.from) else {
        return None;
    };
    let captured = if mv.is_en_passant() {
        // The captured pawn sits beside the mover, on the destination file
        Square::new(mv.to.file(), mv.from.rank()).and_then(|sq| board.take(sq))
    } else {
        board.take(mv.to)
    };
    let placed = match mv.promotion {
        Some(kind) => Piece::new(kind, mover.color),
        None => mover,
    };
    board.set(mv.to, Some(placed));

    let castle = if mv.flags.contains(MoveFlags::CASTLE_KINGSIDE) {
        Some(CastleSide::KingSide)
    } else if mv.flags.contains(MoveFlags::CASTLE_QUEENSIDE) {
        Some(CastleSide::QueenSide)
    } else {
        None
    };
    if let Some(side) = castle {
        let (rook_from, rook_to) = castle_rook_squares(mover.color, side);
        let rook = board.take(rook_from);
        board.set(rook_to, rook);
    }
    captured
}

/// Outcome of applying one move to a [`GameState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub mover: Piece,
    pub captured: Option<Piece>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    side: Color,
    castling: CastlingRights,
    ep: Option<Square>,
    halfmove: u16,
    fullmove: u16,
    // Hash of every position reached, including the current one
    history: Vec<u64>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Standard starting position with a fresh history.
    pub fn new() -> Self {
        let mut state = Self {
            board: Board::standard(),
            side: Color::White,
            castling: CastlingRights::ALL,
            ep: None,
            halfmove: 0,
            fullmove: 1,
            history: Vec::with_capacity(256),
        };
        state.history.push(crate::zobrist::hash_position(&state));
        state
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let mut parts = fen.split_whitespace();
        let piece_part = parts.next().ok_or(PositionError::InvalidFen("missing pieces"))?;
        let side_part = parts.next().ok_or(PositionError::InvalidFen("missing side"))?;
        // Trailing fields are optional, as in most GUIs
        let castle_part = parts.next().unwrap_or("-");
        let ep_part = parts.next().unwrap_or("-");
        let halfmove_part = parts.next().unwrap_or("0");
        let fullmove_part = parts.next().unwrap_or("1");

        let board = Board::from_placement(piece_part)?;
        let side = match side_part {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(PositionError::InvalidFen("invalid side char")),
        };
        let mut castling = CastlingRights::from_fen(castle_part)?;
        // Rights without the pieces at home are meaningless; drop them
        for color in [Color::White, Color::Black] {
            if board.get(king_home(color)) != Some(Piece::new(PieceKind::King, color)) {
                castling.remove_all(color);
            }
            for side in [CastleSide::KingSide, CastleSide::QueenSide] {
                if board.get(rook_home(color, side)) != Some(Piece::new(PieceKind::Rook, color)) {
                    castling.remove(color, side);
                }
            }
        }

        let ep = match ep_part {
            "-" => None,
            s => {
                let sq: Square = s.parse()?;
                let expected_rank = if side == Color::White { 5 } else { 2 };
                if sq.rank() != expected_rank {
                    return Err(PositionError::InvalidFen("invalid ep rank"));
                }
                Some(sq)
            }
        };

        let halfmove = halfmove_part
            .parse()
            .map_err(|_| PositionError::InvalidFen("invalid halfmove"))?;
        let fullmove: u16 = fullmove_part
            .parse()
            .map_err(|_| PositionError::InvalidFen("invalid fullmove"))?;

        let mut state = Self {
            board,
            side,
            castling,
            ep,
            halfmove,
            fullmove: fullmove.max(1),
            history: Vec::with_capacity(256),
        };
        state.validate()?;
        state.history.push(crate::zobrist::hash_position(&state));
        Ok(state)
    }

    fn validate(&self) -> Result<(), PositionError> {
        for color in [Color::White, Color::Black] {
            let count = self.board.king_count(color);
            if count != 1 {
                return Err(PositionError::KingCount { color, count });
            }
        }
        if crate::movegen::is_in_check(self, self.side.opponent()) {
            return Err(PositionError::OpponentInCheck);
        }
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let ep = self
            .ep
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());
        let side = match self.side {
            Color::White => 'w',
            Color::Black => 'b',
        };
        format!(
            "{} {} {} {} {} {}",
            self.board.placement(),
            side,
            self.castling.to_fen(),
            ep,
            self.halfmove,
            self.fullmove
        )
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.ep
    }

    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove
    }

    pub fn fullmove_number(&self) -> u16 {
        self.fullmove
    }

    pub fn history(&self) -> &[u64] {
        &self.history
    }

    /// Hash of the current position.
    pub fn hash(&self) -> u64 {
        self.history
            .last()
            .copied()
            .unwrap_or_else(|| crate::zobrist::hash_position(self))
    }

    /// How many times the current position has occurred, this one included.
    pub fn repetition_count(&self) -> usize {
        let current = self.hash();
        self.history.iter().filter(|&&h| h == current).count()
    }

    /// The king of `color`. A missing king is a broken invariant, not an
    /// expected condition.
    pub fn king_square(&self, color: Color) -> Square {
        match self.board.king_square(color) {
            Some(sq) => sq,
            None => panic!("board invariant violated: {} has no king\n{}", color, self.board),
        }
    }

    /// Resolve `mv` against the legal moves and play it.
    pub fn play(&mut self, mv: Move) -> Result<Move, MoveParseError> {
        let legal = crate::movegen::resolve_move(self, mv.from, mv.to, mv.promotion)
            .ok_or_else(|| MoveParseError::NotLegal(mv.to_uci()))?;
        self.apply(&legal);
        Ok(legal)
    }

    pub fn play_uci(&mut self, uci: &str) -> Result<Move, MoveParseError> {
        let parsed = UciMove::parse(uci)?;
        let legal = crate::movegen::resolve_move(self, parsed.from, parsed.to, parsed.promotion)
            .ok_or_else(|| MoveParseError::NotLegal(uci.to_string()))?;
        self.apply(&legal);
        Ok(legal)
    }

    /// Apply a move produced by the generator for this position. Updates
    /// castling rights, en-passant target, clocks and history, and flips the
    /// side to move.
    pub(crate) fn apply(&mut self, mv: &Move) -> Applied {
        let us = self.side;
        let mover = match self.board.get(mv.from) {
            Some(p) => p,
            None => panic!("apply called with {} but {} is empty", mv, mv.from),
        };
        let captured = place_move(&mut self.board, mv);

        // Aggiorna castling rights: re o torre mossi, torre catturata in casa
        if mover.kind == PieceKind::King {
            self.castling.remove_all(us);
        }
        for color in [Color::White, Color::Black] {
            for side in [CastleSide::KingSide, CastleSide::QueenSide] {
                let home = rook_home(color, side);
                let rook_left = mover.kind == PieceKind::Rook && color == us && mv.from == home;
                let rook_taken = captured.map(|p| p.kind) == Some(PieceKind::Rook) && mv.to == home;
                if rook_left || rook_taken {
                    self.castling.remove(color, side);
                }
            }
        }

        self.ep = if mover.kind == PieceKind::Pawn && mv.from.rank().abs_diff(mv.to.rank()) == 2 {
            Square::new(mv.from.file(), (mv.from.rank() + mv.to.rank()) / 2)
        } else {
            None
        };

        if mover.kind == PieceKind::Pawn || captured.is_some() {
            self.halfmove = 0;
        } else {
            self.halfmove = self.halfmove.saturating_add(1);
        }
        if us == Color::Black {
            self.fullmove = self.fullmove.saturating_add(1);
        }
        self.side = us.opponent();

        for color in [Color::White, Color::Black] {
            let count = self.board.king_count(color);
            assert!(
                count == 1,
                "board invariant violated after {}: {} has {} kings",
                mv,
                color,
                count
            );
        }

        let hash = crate::zobrist::hash_position(self);
        self.history.push(hash);

        Applied { mover, captured }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)?;
        write!(f, "{}", self.to_fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_fen_round_trip() {
        let state = GameState::new();
        assert_eq!(state.to_fen(), START_FEN);
        assert_eq!(GameState::from_fen(START_FEN).unwrap(), state);
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn fen_requires_one_king_each() {
        let err = GameState::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").unwrap_err();
        assert_eq!(
            err,
            PositionError::KingCount {
                color: Color::Black,
                count: 0
            }
        );
        assert!(GameState::from_fen("k3k3/8/8/8/8/8/8/4K3 w - - 0 1").is_err());
    }

    #[test]
    fn fen_rejects_side_not_to_move_in_check() {
        // Black king attacked by the rook while white is to move
        let err = GameState::from_fen("4k3/8/8/8/8/8/8/4RK2 w - - 0 1").unwrap_err();
        assert_eq!(err, PositionError::OpponentInCheck);
    }

    #[test]
    fn fen_drops_rights_without_rook() {
        let state = GameState::from_fen("4k3/8/8/8/8/8/8/4K2R w KQ - 0 1").unwrap();
        assert!(state.castling().has(Color::White, CastleSide::KingSide));
        assert!(!state.castling().has(Color::White, CastleSide::QueenSide));
    }

    #[test]
    fn double_push_sets_en_passant_for_one_ply() {
        let mut state = GameState::new();
        state.play_uci("e2e4").unwrap();
        assert_eq!(state.en_passant(), Some("e3".parse().unwrap()));
        assert_eq!(state.halfmove_clock(), 0);
        state.play_uci("g8f6").unwrap();
        assert_eq!(state.en_passant(), None);
        assert_eq!(state.halfmove_clock(), 1);
        assert_eq!(state.fullmove_number(), 2);
    }

    #[test]
    fn castling_moves_the_rook() {
        let mut state =
            GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mv = state.play_uci("e1g1").unwrap();
        assert!(mv.flags.contains(MoveFlags::CASTLE_KINGSIDE));
        let f1: Square = "f1".parse().unwrap();
        let h1: Square = "h1".parse().unwrap();
        assert_eq!(
            state.board().get(f1),
            Some(Piece::new(PieceKind::Rook, Color::White))
        );
        assert_eq!(state.board().get(h1), None);
        assert!(!state.castling().has_any(Color::White));
        assert!(state.castling().has_any(Color::Black));

        state.play_uci("e8c8").unwrap();
        let d8: Square = "d8".parse().unwrap();
        assert_eq!(
            state.board().get(d8),
            Some(Piece::new(PieceKind::Rook, Color::Black))
        );
        assert_eq!(state.castling(), CastlingRights::NONE);
    }

    #[test]
    fn capturing_a_home_rook_removes_the_right() {
        let mut state = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2B w KQkq - 0 1").unwrap();
        // Bishop on h1 is not a rook, so white never had kingside rights
        assert!(!state.castling().has(Color::White, CastleSide::KingSide));
        state.play_uci("h1a8").unwrap();
        assert!(!state.castling().has(Color::Black, CastleSide::QueenSide));
        assert!(state.castling().has(Color::Black, CastleSide::KingSide));
    }

    #[test]
    fn en_passant_removes_the_captured_pawn() {
        let mut state = GameState::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let mv = state.play_uci("e5d6").unwrap();
        assert!(mv.is_en_passant());
        assert_eq!(state.board().get("d5".parse().unwrap()), None);
        assert_eq!(
            state.board().get("d6".parse().unwrap()),
            Some(Piece::new(PieceKind::Pawn, Color::White))
        );
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let mut state = GameState::from_fen("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        state.play_uci("b7b8").unwrap();
        assert_eq!(
            state.board().get("b8".parse().unwrap()),
            Some(Piece::new(PieceKind::Queen, Color::White))
        );
    }

    #[test]
    fn repetition_counts_current_position() {
        let mut state = GameState::new();
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            state.play_uci(uci).unwrap();
        }
        assert_eq!(state.repetition_count(), 2);
    }

    #[test]
    fn illegal_move_is_refused_without_mutation() {
        let mut state = GameState::new();
        let before = state.clone();
        assert!(matches!(state.play_uci("e2e5"), Err(MoveParseError::NotLegal(_))));
        assert_eq!(state, before);
    }
}
