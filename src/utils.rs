// Bitboard masks, iterators and attack tables shared by the board and the move generator

use std::sync::OnceLock;

// File masks (A is column 0, H column 7)
pub const FILE_A: u64 = 0x0101010101010101;
pub const FILE_H: u64 = 0x8080808080808080;

pub const NOT_FILE_A: u64 = !FILE_A;
pub const NOT_FILE_H: u64 = !FILE_H;

/// Light squares (b1, a2, ...). Used for same-coloured-bishop detection.
pub const LIGHT_SQUARES: u64 = 0x55AA55AA55AA55AA;

// Direction deltas as (file, rank) steps
pub const ORTHOGONAL: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
pub const DIAGONAL: [(i8, i8); 4] = [(1, 1), (-1, -1), (-1, 1), (1, -1)];

#[inline]
pub fn pop_lsb(bb: &mut u64) -> Option<usize> {
    if *bb == 0 {
        return None;
    }
    let lsb = bb.trailing_zeros() as usize;
    *bb &= *bb - 1;
    Some(lsb)
}

#[inline]
pub fn count_bits(bb: u64) -> u32 {
    bb.count_ones()
}

pub struct BitIter {
    bb: u64,
}

impl Iterator for BitIter {
    type Item = usize;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        pop_lsb(&mut self.bb)
    }
}

#[inline]
pub fn iter_bits(bb: u64) -> BitIter {
    BitIter { bb }
}

static KNIGHT_ATTACKS: OnceLock<[u64; 64]> = OnceLock::new();
static KING_ATTACKS: OnceLock<[u64; 64]> = OnceLock::new();

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

fn build_leaper_table(offsets: &[(i8, i8); 8]) -> [u64; 64] {
    let mut attacks = [0u64; 64];
    for (sq, slot) in attacks.iter_mut().enumerate() {
        let file = (sq % 8) as i8;
        let rank = (sq / 8) as i8;
        let mut mask = 0u64;
        for (df, dr) in offsets {
            let f = file + df;
            let r = rank + dr;
            if (0..8).contains(&f) && (0..8).contains(&r) {
                mask |= 1u64 << (r as usize * 8 + f as usize);
            }
        }
        *slot = mask;
    }
    attacks
}

#[inline]
pub fn knight_attacks(sq: usize) -> u64 {
    KNIGHT_ATTACKS.get_or_init(|| build_leaper_table(&KNIGHT_OFFSETS))[sq]
}

#[inline]
pub fn king_attacks(sq: usize) -> u64 {
    KING_ATTACKS.get_or_init(|| build_leaper_table(&KING_OFFSETS))[sq]
}

/// Squares from which a pawn of the side moving "up" (`white == true`) or
/// "down" attacks `sq`.
#[inline]
pub fn pawn_attackers_mask(sq: usize, white: bool) -> u64 {
    let target = 1u64 << sq;
    if white {
        // a white pawn on s attacks s+7 (not from file A) and s+9 (not from file H)
        ((target & NOT_FILE_H) >> 7) | ((target & NOT_FILE_A) >> 9)
    } else {
        ((target & NOT_FILE_A) << 7) | ((target & NOT_FILE_H) << 9)
    }
}
