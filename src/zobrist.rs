// Zobrist hashing with precomputed tables, used for repetition detection
use crate::board::{Color, PieceKind, Square};
use crate::position::GameState;
use std::sync::OnceLock;

struct ZobristKeys {
    piece: [[u64; 64]; 12],
    side: u64,
    castling: [u64; 16],
    ep_file: [u64; 8],
}

static KEYS: OnceLock<ZobristKeys> = OnceLock::new();

fn split_mix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

fn keys() -> &'static ZobristKeys {
    KEYS.get_or_init(|| {
        let mut piece = [[0u64; 64]; 12];
        for (i, row) in piece.iter_mut().enumerate() {
            for (j, key) in row.iter_mut().enumerate() {
                *key = split_mix64((i as u64).wrapping_mul(0xad3) + (j as u64).wrapping_mul(0x47a1));
            }
        }
        let mut castling = [0u64; 16];
        for (i, key) in castling.iter_mut().enumerate() {
            *key = split_mix64((i as u64).wrapping_mul(0x1234_abcd));
        }
        let mut ep_file = [0u64; 8];
        for (i, key) in ep_file.iter_mut().enumerate() {
            *key = split_mix64((i as u64 + 1).wrapping_mul(0x3333_5555));
        }
        ZobristKeys {
            piece,
            side: split_mix64(0xdeadbeefdeadbeef),
            castling,
            ep_file,
        }
    })
}

/// Full hash of a position. The en-passant file only counts when a pawn of
/// the side to move could actually capture onto the target square, so that
/// positions differing only by a dead en-passant square repeat.
pub fn hash_position(state: &GameState) -> u64 {
    let keys = keys();
    let board = state.board();
    let mut h = 0u64;
    for (sq, piece) in board.iter() {
        let idx = (piece.color as usize) * 6 + piece.kind as usize;
        h ^= keys.piece[idx][sq.index()];
    }
    if state.side_to_move() == Color::Black {
        h ^= keys.side;
    }
    h ^= keys.castling[state.castling().bits() as usize];
    if let Some(ep) = state.en_passant() {
        if ep_capture_available(state, ep) {
            h ^= keys.ep_file[ep.file() as usize];
        }
    }
    h
}

fn ep_capture_available(state: &GameState, ep: Square) -> bool {
    let us = state.side_to_move();
    let pawns = state.board().pieces(PieceKind::Pawn, us);
    let attackers = crate::utils::pawn_attackers_mask(ep.index(), us == Color::White);
    pawns & attackers != 0
}
