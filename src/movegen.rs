//! Move generation, legality filtering and terminal-state classification.
//!
//! Generation is per square, because the UI asks "where can this piece go".
//! Pseudo-legal moves follow piece geometry only; legal moves are the
//! pseudo-legal ones that do not leave the mover's king attacked, checked by
//! playing each move on a cloned board. Attack detection looks at the board
//! directly and never goes through legality filtering, so the castling
//! safety test cannot recurse.

use crate::board::{Board, Color, Piece, PieceKind, Square};
use crate::game::{DrawReason, GameOutcome};
use crate::moves::{Move, MoveFlags};
use crate::position::{
    castle_rook_squares, king_home, place_move, rook_home, CastleSide, GameState,
};
use crate::utils::{
    count_bits, iter_bits, king_attacks, knight_attacks, pawn_attackers_mask, DIAGONAL,
    LIGHT_SQUARES, ORTHOGONAL,
};

/// Geometry-only moves for the piece on `from` (empty when the square is
/// empty). En passant is offered only to the side to move, since the target
/// square expires after one ply.
pub fn pseudo_legal_moves(state: &GameState, from: Square) -> Vec<Move> {
    let mut out = Vec::with_capacity(32);
    let Some(piece) = state.board().get(from) else {
        return out;
    };
    match piece.kind {
        PieceKind::Pawn => generate_pawn_pseudos(state, from, piece.color, &mut out),
        PieceKind::Knight => {
            generate_leaper_pseudos(state.board(), from, piece.color, knight_attacks(from.index()), &mut out)
        }
        PieceKind::Bishop => generate_slider_pseudos(state.board(), from, piece.color, &DIAGONAL, &mut out),
        PieceKind::Rook => generate_slider_pseudos(state.board(), from, piece.color, &ORTHOGONAL, &mut out),
        PieceKind::Queen => {
            generate_slider_pseudos(state.board(), from, piece.color, &DIAGONAL, &mut out);
            generate_slider_pseudos(state.board(), from, piece.color, &ORTHOGONAL, &mut out);
        }
        PieceKind::King => {
            generate_leaper_pseudos(state.board(), from, piece.color, king_attacks(from.index()), &mut out);
            generate_castling_moves(state, from, piece.color, &mut out);
        }
    }
    out
}

fn push_pawn_move(from: Square, to: Square, side: Color, flags: MoveFlags, out: &mut Vec<Move>) {
    let promo_rank = side.opponent().back_rank();
    if to.rank() == promo_rank {
        for kind in PieceKind::PROMOTIONS {
            out.push(Move::new(from, to).with_promotion(kind).with_flags(flags));
        }
    } else {
        out.push(Move::new(from, to).with_flags(flags));
    }
}

fn generate_pawn_pseudos(state: &GameState, from: Square, side: Color, out: &mut Vec<Move>) {
    let board = state.board();
    let (forward, start_rank) = match side {
        Color::White => (1i8, 1u8),
        Color::Black => (-1i8, 6u8),
    };

    // Single and double pushes
    if let Some(one) = from.offset(0, forward) {
        if !board.is_occupied(one) {
            push_pawn_move(from, one, side, MoveFlags::NONE, out);
            if from.rank() == start_rank {
                if let Some(two) = one.offset(0, forward) {
                    if !board.is_occupied(two) {
                        out.push(Move::new(from, two));
                    }
                }
            }
        }
    }

    // Captures, en passant included
    for df in [-1i8, 1] {
        let Some(to) = from.offset(df, forward) else {
            continue;
        };
        match board.get(to) {
            Some(target) if target.color != side => {
                push_pawn_move(from, to, side, MoveFlags::CAPTURE, out);
            }
            Some(_) => {}
            None => {
                if state.en_passant() == Some(to) && state.side_to_move() == side {
                    let victim_sq = Square::new(to.file(), from.rank());
                    let victim = victim_sq.and_then(|sq| board.get(sq));
                    if victim == Some(Piece::new(PieceKind::Pawn, side.opponent())) {
                        out.push(
                            Move::new(from, to)
                                .with_flags(MoveFlags::CAPTURE | MoveFlags::EN_PASSANT),
                        );
                    }
                }
            }
        }
    }
}

fn generate_leaper_pseudos(board: &Board, from: Square, side: Color, attacks: u64, out: &mut Vec<Move>) {
    let targets = attacks & !board.occupied_by(side);
    let enemy = board.occupied_by(side.opponent());
    for to in iter_bits(targets).filter_map(Square::from_index) {
        let flags = if enemy & to.bit() != 0 {
            MoveFlags::CAPTURE
        } else {
            MoveFlags::NONE
        };
        out.push(Move::new(from, to).with_flags(flags));
    }
}

fn generate_slider_pseudos(
    board: &Board,
    from: Square,
    side: Color,
    directions: &[(i8, i8); 4],
    out: &mut Vec<Move>,
) {
    for &(df, dr) in directions {
        let mut cur = from;
        while let Some(to) = cur.offset(df, dr) {
            match board.get(to) {
                None => out.push(Move::new(from, to)),
                Some(p) => {
                    if p.color != side {
                        out.push(Move::new(from, to).with_flags(MoveFlags::CAPTURE));
                    }
                    // Stop sliding when we hit any piece
                    break;
                }
            }
            cur = to;
        }
    }
}

fn generate_castling_moves(state: &GameState, king_from: Square, side: Color, out: &mut Vec<Move>) {
    let rights = state.castling();
    if !rights.has_any(side) || king_from != king_home(side) {
        return;
    }
    let board = state.board();
    let enemy = side.opponent();
    let rank = side.back_rank();

    // (wing, squares that must be empty, squares the king crosses, king target file, flag)
    let wings: [(CastleSide, &[u8], [u8; 3], u8, MoveFlags); 2] = [
        (CastleSide::KingSide, &[5, 6], [4, 5, 6], 6, MoveFlags::CASTLE_KINGSIDE),
        (CastleSide::QueenSide, &[1, 2, 3], [4, 3, 2], 2, MoveFlags::CASTLE_QUEENSIDE),
    ];

    for (wing, between, king_path, king_to_file, flag) in wings {
        if !rights.has(side, wing) {
            continue;
        }
        if board.get(rook_home(side, wing)) != Some(Piece::new(PieceKind::Rook, side)) {
            continue;
        }
        let clear = between
            .iter()
            .all(|&file| !board.is_occupied(Square::at(file, rank)));
        if !clear {
            continue;
        }
        // King may not castle out of, through or into check
        let safe = king_path
            .iter()
            .all(|&file| !attacked_on(board, Square::at(file, rank), enemy));
        if safe {
            out.push(Move::new(king_from, Square::at(king_to_file, rank)).with_flags(flag));
        }
    }
}

/// Is `sq` attacked by any piece of `by`? Geometry only: pins and checks on
/// the attacker do not matter.
pub fn is_square_attacked(state: &GameState, sq: Square, by: Color) -> bool {
    attacked_on(state.board(), sq, by)
}

pub(crate) fn attacked_on(board: &Board, sq: Square, by: Color) -> bool {
    let i = sq.index();
    if pawn_attackers_mask(i, by == Color::White) & board.pieces(PieceKind::Pawn, by) != 0 {
        return true;
    }
    if knight_attacks(i) & board.pieces(PieceKind::Knight, by) != 0 {
        return true;
    }
    if king_attacks(i) & board.pieces(PieceKind::King, by) != 0 {
        return true;
    }
    let queens = board.pieces(PieceKind::Queen, by);
    let diagonal_attackers = board.pieces(PieceKind::Bishop, by) | queens;
    if diagonal_attackers != 0 && ray_hits(board, sq, &DIAGONAL, diagonal_attackers) {
        return true;
    }
    let orthogonal_attackers = board.pieces(PieceKind::Rook, by) | queens;
    orthogonal_attackers != 0 && ray_hits(board, sq, &ORTHOGONAL, orthogonal_attackers)
}

fn ray_hits(board: &Board, sq: Square, directions: &[(i8, i8); 4], attackers: u64) -> bool {
    let occ = board.occupied();
    for &(df, dr) in directions {
        let mut cur = sq;
        while let Some(next) = cur.offset(df, dr) {
            if occ & next.bit() != 0 {
                if attackers & next.bit() != 0 {
                    return true;
                }
                break;
            }
            cur = next;
        }
    }
    false
}

/// Would playing `mv` leave the mover's own king attacked?
fn leaves_king_attacked(state: &GameState, mv: &Move, side: Color) -> bool {
    let mut board = state.board().clone();
    place_move(&mut board, mv);
    match board.king_square(side) {
        Some(king) => attacked_on(&board, king, side.opponent()),
        None => true,
    }
}

/// Legal moves for the piece on `from`.
pub fn legal_moves(state: &GameState, from: Square) -> Vec<Move> {
    let Some(piece) = state.board().get(from) else {
        return Vec::new();
    };
    let mut moves = pseudo_legal_moves(state, from);
    moves.retain(|mv| !leaves_king_attacked(state, mv, piece.color));
    moves
}

/// Legal moves for the side to move.
pub fn all_legal_moves(state: &GameState) -> Vec<Move> {
    let side = state.side_to_move();
    let own = state.board().occupied_by(side);
    iter_bits(own)
        .filter_map(Square::from_index)
        .flat_map(|sq| legal_moves(state, sq))
        .collect()
}

pub fn is_in_check(state: &GameState, color: Color) -> bool {
    attacked_on(state.board(), state.king_square(color), color.opponent())
}

pub fn has_any_legal_move(state: &GameState, color: Color) -> bool {
    let own = state.board().occupied_by(color);
    iter_bits(own).filter_map(Square::from_index).any(|from| {
        pseudo_legal_moves(state, from)
            .iter()
            .any(|mv| !leaves_king_attacked(state, mv, color))
    })
}

/// Neither side can ever deliver mate: bare kings, a single minor piece,
/// or only bishops that all stand on one square colour.
pub fn is_insufficient_material(board: &Board) -> bool {
    let mut heavy = 0u64;
    let mut knights = 0u64;
    let mut bishops = 0u64;
    for color in [Color::White, Color::Black] {
        heavy |= board.pieces(PieceKind::Pawn, color)
            | board.pieces(PieceKind::Rook, color)
            | board.pieces(PieceKind::Queen, color);
        knights |= board.pieces(PieceKind::Knight, color);
        bishops |= board.pieces(PieceKind::Bishop, color);
    }
    if heavy != 0 {
        return false;
    }
    if count_bits(knights) + count_bits(bishops) <= 1 {
        return true;
    }
    knights == 0 && (bishops & LIGHT_SQUARES == 0 || bishops & !LIGHT_SQUARES == 0)
}

/// Outcome of the position for the side to move. Mate and stalemate take
/// precedence over the draw rules.
pub fn classify_outcome(state: &GameState) -> GameOutcome {
    let us = state.side_to_move();
    if !has_any_legal_move(state, us) {
        return if is_in_check(state, us) {
            GameOutcome::Checkmate { winner: us.opponent() }
        } else {
            GameOutcome::Stalemate
        };
    }
    if state.halfmove_clock() >= 100 {
        return GameOutcome::Draw(DrawReason::FiftyMove);
    }
    if state.repetition_count() >= 3 {
        return GameOutcome::Draw(DrawReason::Repetition);
    }
    if is_insufficient_material(state.board()) {
        return GameOutcome::Draw(DrawReason::InsufficientMaterial);
    }
    GameOutcome::Ongoing
}

/// Find the generated legal move for the side to move matching the given
/// squares. A pawn reaching the last rank without a promotion piece
/// promotes to a queen.
pub fn resolve_move(
    state: &GameState,
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
) -> Option<Move> {
    let piece = state.board().get(from)?;
    if piece.color != state.side_to_move() {
        return None;
    }
    let wanted = match promotion {
        None if piece.kind == PieceKind::Pawn && to.rank() == piece.color.opponent().back_rank() => {
            Some(PieceKind::Queen)
        }
        other => other,
    };
    legal_moves(state, from)
        .into_iter()
        .find(|m| m.to == to && m.promotion == wanted)
}

/// Count leaf nodes of the legal move tree to `depth`.
pub fn perft(state: &GameState, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = all_legal_moves(state);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0u64;
    for mv in moves {
        let mut next = state.clone();
        next.apply(&mv);
        nodes += perft(&next, depth - 1);
    }
    nodes
}

/// Rook (from, to) moved by a castling move, for animating the second piece.
pub fn castling_rook_move(mv: &Move, side: Color) -> Option<(Square, Square)> {
    if mv.flags.contains(MoveFlags::CASTLE_KINGSIDE) {
        Some(castle_rook_squares(side, CastleSide::KingSide))
    } else if mv.flags.contains(MoveFlags::CASTLE_QUEENSIDE) {
        Some(castle_rook_squares(side, CastleSide::QueenSide))
    } else {
        None
    }
}
