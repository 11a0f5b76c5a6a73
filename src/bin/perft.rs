use clap::Parser;
use scacchiera::movegen::{all_legal_moves, perft};
use scacchiera::position::{GameState, START_FEN};
use shakmaty::fen::Fen;
use shakmaty::{Chess, Position};
use std::process::ExitCode;

/// Count move-tree leaves, optionally checking every root move against
/// shakmaty.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = String::from(START_FEN))]
    fen: String,

    #[arg(short, long, default_value_t = 4)]
    depth: u8,

    /// Per root move counts
    #[arg(long)]
    divide: bool,

    /// Compare with shakmaty
    #[arg(long)]
    compare: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let state = match GameState::from_fen(&args.fen) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("bad FEN {:?}: {e}", args.fen);
            return ExitCode::FAILURE;
        }
    };
    println!("Running perft on FEN: '{}' at depth {}", args.fen, args.depth);

    if args.divide && args.depth > 0 {
        for mv in all_legal_moves(&state) {
            let mut child = state.clone();
            if child.play(mv).is_ok() {
                println!("{mv}: {}", perft(&child, args.depth - 1));
            }
        }
    }

    let start = std::time::Instant::now();
    let nodes = perft(&state, args.depth);
    let duration = start.elapsed();
    println!(
        "perft({}) = {} nodes ({} ms, {:.2} Mnps)",
        args.depth,
        nodes,
        duration.as_millis(),
        nodes as f64 / (duration.as_micros().max(1) as f64)
    );

    if args.compare {
        let pos: Chess = match args.fen.parse::<Fen>().map(|f| f.into_position(shakmaty::CastlingMode::Standard)) {
            Ok(Ok(pos)) => pos,
            _ => {
                eprintln!("shakmaty rejected the FEN");
                return ExitCode::FAILURE;
            }
        };
        let expected = perft_shakmaty(&pos, args.depth);
        println!("shakmaty perft({}) = {}", args.depth, expected);
        if expected != nodes {
            eprintln!("MISMATCH: {} vs {}", nodes, expected);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn perft_shakmaty(pos: &Chess, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut nodes = 0;
    for m in pos.legal_moves() {
        let mut new_pos = pos.clone();
        new_pos.play_unchecked(&m);
        nodes += perft_shakmaty(&new_pos, depth - 1);
    }
    nodes
}
