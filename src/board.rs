// Mapping di quadrati: A1=0, B1=1, ..., H8=63
// Lo stesso mapping vale per Square, bitboard e zobrist

use crate::error::PositionError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank index of this side's back rank.
    pub fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Promotion choices, strongest first.
    pub const PROMOTIONS: [PieceKind; 4] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
    ];

    pub fn from_index(i: usize) -> PieceKind {
        Self::ALL[i % 6]
    }

    /// Lowercase letter used by FEN and UCI (`p n b r q k`).
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn from_letter(c: char) -> Option<PieceKind> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    pub fn is_slider(self) -> bool {
        matches!(self, PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// FEN character: uppercase for white, lowercase for black.
    pub fn to_char(self) -> char {
        let c = self.kind.letter();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn from_char(c: char) -> Option<Piece> {
        let kind = PieceKind::from_letter(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece { kind, color })
    }

    // Indice nel piece_bb array: white = kind; black = 6 + kind
    fn index(self) -> usize {
        (self.color as usize) * 6 + (self.kind as usize)
    }
}

/// A board coordinate, file and rank in `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    /// File and rank known to be on the board.
    pub(crate) const fn at(file: u8, rank: u8) -> Square {
        Square(rank * 8 + file)
    }

    pub fn from_index(index: usize) -> Option<Square> {
        if index < 64 {
            Some(Square(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn file(self) -> u8 {
        self.0 % 8
    }

    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    pub fn bit(self) -> u64 {
        1u64 << self.0
    }

    /// Square shifted by (df, dr), or None when it leaves the board.
    pub fn offset(self, df: i8, dr: i8) -> Option<Square> {
        let f = self.file() as i8 + df;
        let r = self.rank() as i8 + dr;
        if (0..8).contains(&f) && (0..8).contains(&r) {
            Some(Square((r * 8 + f) as u8))
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0u8..64).map(Square)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file_char = (b'a' + self.file()) as char;
        let rank_char = (b'1' + self.rank()) as char;
        write!(f, "{}{}", file_char, rank_char)
    }
}

impl FromStr for Square {
    type Err = PositionError;

    /// Parse algebraic notation ("e2" -> index 12, "a1" -> 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(PositionError::InvalidSquare(s.to_string()));
        }
        let (file, rank) = (bytes[0], bytes[1]);
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(PositionError::InvalidSquare(s.to_string()));
        }
        Ok(Square((rank - b'1') * 8 + (file - b'a')))
    }
}

/// Dumb 8x8 grid. No rule knowledge lives here: callers place and remove
/// pieces, the move generator decides what is legal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Board {
    // 12 bitboard: 0-5 = white p,n,b,r,q,k; 6-11 = black p,n,b,r,q,k
    piece_bb: [u64; 12],
    white_occ: u64,
    black_occ: u64,
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    pub fn empty() -> Self {
        Self {
            piece_bb: [0; 12],
            white_occ: 0,
            black_occ: 0,
        }
    }

    /// Standard initial arrangement.
    pub fn standard() -> Self {
        let mut board = Board::empty();
        const BACK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (file, &kind) in BACK.iter().enumerate() {
            let file = file as u8;
            for (color, back, pawns) in [(Color::White, 0, 1), (Color::Black, 7, 6)] {
                board.set(Square(back * 8 + file), Some(Piece::new(kind, color)));
                board.set(
                    Square(pawns * 8 + file),
                    Some(Piece::new(PieceKind::Pawn, color)),
                );
            }
        }
        board
    }

    pub fn get(&self, sq: Square) -> Option<Piece> {
        let mask = sq.bit();
        if (self.white_occ | self.black_occ) & mask == 0 {
            return None;
        }
        let base = if self.white_occ & mask != 0 { 0 } else { 6 };
        let color = if base == 0 { Color::White } else { Color::Black };
        (0..6)
            .find(|&k| self.piece_bb[base + k] & mask != 0)
            .map(|k| Piece::new(PieceKind::from_index(k), color))
    }

    /// Place `piece` on `sq`, replacing whatever stood there; `None` clears it.
    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        let mask = sq.bit();
        for bb in self.piece_bb.iter_mut() {
            *bb &= !mask;
        }
        self.white_occ &= !mask;
        self.black_occ &= !mask;
        if let Some(p) = piece {
            self.piece_bb[p.index()] |= mask;
            match p.color {
                Color::White => self.white_occ |= mask,
                Color::Black => self.black_occ |= mask,
            }
        }
    }

    /// Remove and return the piece on `sq`.
    pub fn take(&mut self, sq: Square) -> Option<Piece> {
        let piece = self.get(sq);
        if piece.is_some() {
            self.set(sq, None);
        }
        piece
    }

    pub fn clear(&mut self) {
        *self = Board::empty();
    }

    pub fn pieces(&self, kind: PieceKind, color: Color) -> u64 {
        self.piece_bb[Piece::new(kind, color).index()]
    }

    pub fn occupied_by(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_occ,
            Color::Black => self.black_occ,
        }
    }

    pub fn occupied(&self) -> u64 {
        self.white_occ | self.black_occ
    }

    pub fn is_occupied(&self, sq: Square) -> bool {
        self.occupied() & sq.bit() != 0
    }

    /// Every occupied square with its piece, a1 first.
    pub fn iter(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        crate::utils::iter_bits(self.occupied())
            .filter_map(move |i| Square::from_index(i).and_then(|sq| Some((sq, self.get(sq)?))))
    }

    pub fn king_count(&self, color: Color) -> u32 {
        crate::utils::count_bits(self.pieces(PieceKind::King, color))
    }

    /// The king's square, or None when the side has no king on the board.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        let kings = self.pieces(PieceKind::King, color);
        if kings == 0 {
            None
        } else {
            Square::from_index(kings.trailing_zeros() as usize)
        }
    }

    /// FEN piece placement field, rank 8 first.
    pub fn placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.get(Square(rank * 8 + file)) {
                    Some(p) => {
                        if empty > 0 {
                            out.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        out.push(p.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }

    /// Parse a FEN piece placement field (rank 8 .. rank 1).
    pub fn from_placement(field: &str) -> Result<Board, PositionError> {
        let mut board = Board::empty();
        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != 8 {
            return Err(PositionError::InvalidFen("expected 8 ranks"));
        }
        for (i, rank_part) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for ch in rank_part.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(PositionError::InvalidFen("bad empty-square count"));
                    }
                    file += skip as u8;
                } else {
                    let piece = Piece::from_char(ch)
                        .ok_or(PositionError::InvalidFen("invalid piece char"))?;
                    let sq = Square::new(file, rank)
                        .ok_or(PositionError::InvalidFen("rank overflows 8 files"))?;
                    board.set(sq, Some(piece));
                    file += 1;
                }
                if file > 8 {
                    return Err(PositionError::InvalidFen("rank overflows 8 files"));
                }
            }
            if file != 8 {
                return Err(PositionError::InvalidFen("rank does not cover 8 files"));
            }
        }
        Ok(board)
    }
}

// Simple display (diagram)
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            for file in 0..8u8 {
                match self.get(Square(rank * 8 + file)) {
                    Some(p) => write!(f, "{} ", p.to_char())?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.placement())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn square_notation_round_trip() {
        assert_eq!(sq("a1").index(), 0);
        assert_eq!(sq("e2").index(), 12);
        assert_eq!(sq("h8").index(), 63);
        assert_eq!(sq("e2").to_string(), "e2");
        assert!("i1".parse::<Square>().is_err());
        assert!("e9".parse::<Square>().is_err());
        assert!("e".parse::<Square>().is_err());
    }

    #[test]
    fn offset_stays_on_board() {
        assert_eq!(sq("a1").offset(-1, 0), None);
        assert_eq!(sq("h8").offset(0, 1), None);
        assert_eq!(sq("e4").offset(1, 1), Some(sq("f5")));
    }

    #[test]
    fn set_replaces_and_clears() {
        let mut board = Board::empty();
        let wn = Piece::new(PieceKind::Knight, Color::White);
        let bq = Piece::new(PieceKind::Queen, Color::Black);
        board.set(sq("d4"), Some(wn));
        assert_eq!(board.get(sq("d4")), Some(wn));
        board.set(sq("d4"), Some(bq));
        assert_eq!(board.get(sq("d4")), Some(bq));
        assert_eq!(board.pieces(PieceKind::Knight, Color::White), 0);
        assert_eq!(board.occupied_by(Color::White), 0);
        board.set(sq("d4"), None);
        assert_eq!(board.get(sq("d4")), None);
        assert_eq!(board.occupied(), 0);
    }

    #[test]
    fn clone_is_independent() {
        let board = Board::standard();
        let mut copy = board.clone();
        copy.take(sq("e2"));
        assert!(board.is_occupied(sq("e2")));
        assert!(!copy.is_occupied(sq("e2")));
    }

    #[test]
    fn standard_placement_matches_fen() {
        let board = Board::standard();
        assert_eq!(board.placement(), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR");
        assert_eq!(Board::from_placement(&board.placement()).unwrap(), board);
        assert_eq!(board.king_square(Color::White), Some(sq("e1")));
        assert_eq!(board.king_square(Color::Black), Some(sq("e8")));
        assert_eq!(board.iter().count(), 32);
    }

    #[test]
    fn placement_rejects_malformed_ranks() {
        assert!(Board::from_placement("8/8/8/8/8/8/8").is_err());
        assert!(Board::from_placement("9/8/8/8/8/8/8/8").is_err());
        assert!(Board::from_placement("ppppppppp/8/8/8/8/8/8/8").is_err());
        assert!(Board::from_placement("7x/8/8/8/8/8/8/8").is_err());
        assert!(Board::from_placement("7/8/8/8/8/8/8/8").is_err());
    }
}
