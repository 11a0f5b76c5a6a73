use scacchiera::board::{Color, PieceKind, Square};
use scacchiera::game::{DrawReason, GameController, GameOutcome, Phase};
use scacchiera::movegen::{
    all_legal_moves, classify_outcome, has_any_legal_move, is_in_check, is_insufficient_material,
    is_square_attacked, legal_moves, pseudo_legal_moves,
};
use scacchiera::moves::Move;
use scacchiera::position::{CastleSide, GameState};

fn sq(s: &str) -> Square {
    s.parse().unwrap()
}

fn mv(uci: &str) -> Move {
    Move::new(sq(&uci[0..2]), sq(&uci[2..4]))
}

fn play_all(state: &mut GameState, moves: &[&str]) {
    for m in moves {
        state.play_uci(m).unwrap_or_else(|e| panic!("{m}: {e}"));
    }
}

#[test]
fn twenty_moves_from_the_start() {
    let state = GameState::new();
    assert_eq!(all_legal_moves(&state).len(), 20);
    assert_eq!(legal_moves(&state, sq("g1")).len(), 2);
    assert!(legal_moves(&state, sq("e1")).is_empty());
    assert!(legal_moves(&state, sq("e4")).is_empty());
}

#[test]
fn queen_on_h5_is_not_a_check() {
    let mut state = GameState::new();
    play_all(&mut state, &["e2e4", "e7e5", "d1h5"]);
    assert!(!is_in_check(&state, Color::Black));
    assert!(is_square_attacked(&state, sq("f7"), Color::White));
    // no false positive: black keeps ordinary development moves
    let moves = all_legal_moves(&state);
    assert!(moves.iter().any(|m| m.to_uci() == "b8c6"));
    assert!(moves.iter().any(|m| m.to_uci() == "g8f6"));
    // f7 pawn is pinned against e8 along the h5-e8 diagonal
    assert!(legal_moves(&state, sq("f7")).is_empty());
    assert_eq!(classify_outcome(&state), GameOutcome::Ongoing);
}

#[test]
fn en_passant_only_on_the_next_ply() {
    let mut state = GameState::from_fen("4k3/8/8/8/3p4/8/4P2P/4K3 w - - 0 1").unwrap();
    state.play_uci("e2e4").unwrap();
    assert_eq!(state.en_passant(), Some(sq("e3")));
    let ep: Vec<Move> = legal_moves(&state, sq("d4"))
        .into_iter()
        .filter(|m| m.is_en_passant())
        .collect();
    assert_eq!(ep.len(), 1);
    assert_eq!(ep[0].to, sq("e3"));

    // black declines, white makes a waiting move: the chance is gone
    state.play_uci("e8d8").unwrap();
    state.play_uci("h2h3").unwrap();
    assert_eq!(state.en_passant(), None);
    assert!(legal_moves(&state, sq("d4")).iter().all(|m| !m.is_en_passant()));
    assert!(state.play_uci("d4e3").is_err());
}

#[test]
fn en_passant_removes_the_passed_pawn() {
    let mut state = GameState::from_fen("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1").unwrap();
    state.play_uci("e2e4").unwrap();
    state.play_uci("d4e3").unwrap();
    assert_eq!(state.board().get(sq("e4")), None);
    assert_eq!(state.board().get(sq("e3")).map(|p| p.kind), Some(PieceKind::Pawn));
}

#[test]
fn castling_needs_empty_and_safe_squares() {
    let open = GameState::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
    assert!(legal_moves(&open, sq("e1")).iter().any(|m| m.to_uci() == "e1g1"));

    let blocked = GameState::from_fen("4k3/8/8/8/8/8/8/4KB1R w K - 0 1").unwrap();
    assert!(!legal_moves(&blocked, sq("e1")).iter().any(|m| m.is_castle()));

    // f1 is covered by the bishop on c4
    let through_attack = GameState::from_fen("4k3/8/8/8/2b5/8/8/4K2R w K - 0 1").unwrap();
    assert!(!legal_moves(&through_attack, sq("e1")).iter().any(|m| m.is_castle()));
    assert!(!pseudo_legal_moves(&through_attack, sq("e1")).iter().any(|m| m.is_castle()));

    let in_check = GameState::from_fen("4k3/8/8/8/8/8/8/r3K2R w K - 0 1").unwrap();
    assert!(!legal_moves(&in_check, sq("e1")).iter().any(|m| m.is_castle()));
}

#[test]
fn moved_rook_loses_castling_for_good() {
    let mut state = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    play_all(&mut state, &["h1h2", "a8a7", "h2h1", "a7a8"]);
    // same placement as the start, but rights are gone
    assert!(!state.castling().has(Color::White, CastleSide::KingSide));
    assert!(state.castling().has(Color::White, CastleSide::QueenSide));
    assert!(!state.castling().has(Color::Black, CastleSide::QueenSide));
    assert!(state.castling().has(Color::Black, CastleSide::KingSide));
    assert!(!legal_moves(&state, sq("e1")).iter().any(|m| m.to_uci() == "e1g1"));
    assert!(legal_moves(&state, sq("e1")).iter().any(|m| m.to_uci() == "e1c1"));
}

#[test]
fn captured_rook_loses_castling() {
    let mut state = GameState::from_fen("r3k2r/8/8/8/8/8/6b1/R3K2R b KQkq - 0 1").unwrap();
    state.play_uci("g2h1").unwrap();
    assert!(!state.castling().has(Color::White, CastleSide::KingSide));
    assert!(state.castling().has(Color::White, CastleSide::QueenSide));
}

#[test]
fn fools_mate_is_mate_only_after_the_queen_move() {
    let mut game = GameController::new();
    for m in ["f2f3", "e7e5", "g2g4"] {
        let change = game.apply(mv(m)).unwrap();
        assert_eq!(change.outcome, GameOutcome::Ongoing);
        game.animation_finished();
    }
    let change = game.apply(mv("d8h4")).unwrap();
    assert!(change.check);
    assert_eq!(change.outcome, GameOutcome::Checkmate { winner: Color::Black });
    assert_eq!(game.phase(), Phase::Terminal);
    assert!(!has_any_legal_move(game.state(), Color::White));
}

#[test]
fn stalemate() {
    let state = GameState::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(!is_in_check(&state, Color::Black));
    assert_eq!(classify_outcome(&state), GameOutcome::Stalemate);
}

#[test]
fn fifty_move_boundary() {
    let at_99 = GameState::from_fen("8/8/8/8/8/8/1R6/k6K w - - 99 80").unwrap();
    assert_eq!(classify_outcome(&at_99), GameOutcome::Ongoing);

    let mut state = at_99.clone();
    state.play_uci("b2b3").unwrap();
    assert_eq!(state.halfmove_clock(), 100);
    assert_eq!(classify_outcome(&state), GameOutcome::Draw(DrawReason::FiftyMove));

    // a capture or pawn move resets the clock
    let mut reset = GameState::from_fen("8/8/8/8/8/8/1R4P1/k6K w - - 99 80").unwrap();
    reset.play_uci("g2g3").unwrap();
    assert_eq!(reset.halfmove_clock(), 0);
    assert_eq!(classify_outcome(&reset), GameOutcome::Ongoing);
}

#[test]
fn mate_beats_the_fifty_move_rule() {
    let mut state = GameState::from_fen("7k/8/6K1/8/8/8/8/R7 w - - 99 80").unwrap();
    state.play_uci("a1a8").unwrap();
    assert_eq!(classify_outcome(&state), GameOutcome::Checkmate { winner: Color::White });
}

#[test]
fn insufficient_material() {
    let cases = [
        ("4k3/8/8/8/8/8/8/4K3 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/4KB2 w - - 0 1", true),
        ("4k3/8/8/8/8/8/8/4KN2 w - - 0 1", true),
        // bishops on the same colour
        ("4kb2/8/8/8/8/8/8/2B1K3 w - - 0 1", true),
        // bishops on opposite colours
        ("4k1b1/8/8/8/8/8/8/2B1K3 w - - 0 1", false),
        ("4k3/8/8/8/8/8/8/3NKN2 w - - 0 1", false),
        ("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1", false),
        ("4k3/8/8/8/8/8/8/4K2R w - - 0 1", false),
    ];
    for (fen, expected) in cases {
        let state = GameState::from_fen(fen).unwrap();
        assert_eq!(is_insufficient_material(state.board()), expected, "{fen}");
    }

    let mut state = GameState::from_fen("4k3/8/8/8/8/8/3r4/4KB2 w - - 0 1").unwrap();
    state.play_uci("e1d2").unwrap();
    assert_eq!(
        classify_outcome(&state),
        GameOutcome::Draw(DrawReason::InsufficientMaterial)
    );
}

#[test]
fn threefold_repetition() {
    let mut game = GameController::new();
    let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
    for m in shuffle {
        game.apply(mv(m)).unwrap();
    }
    assert_eq!(game.outcome(), GameOutcome::Ongoing);
    for (i, m) in shuffle.iter().enumerate() {
        let change = game.apply(mv(m)).unwrap();
        if i < 3 {
            assert_eq!(change.outcome, GameOutcome::Ongoing);
        } else {
            assert_eq!(change.outcome, GameOutcome::Draw(DrawReason::Repetition));
        }
    }
    assert_eq!(game.state().repetition_count(), 3);
    assert!(game.apply(mv("e2e4")).is_err());
}
