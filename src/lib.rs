//! scacchiera: chess rules, game session and engine scheduling for a
//! desktop chess GUI.

pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod movegen;
pub mod moves;
pub mod position;
pub mod time;
pub mod utils;
pub mod zobrist;

pub use board::{Board, Color, Piece, PieceKind, Square};
pub use config::EngineConfig;
pub use engine::{EngineBackend, EnginePoll, EngineScheduler, RequestStatus};
pub use error::{EngineError, Rejected};
pub use game::{DrawReason, GameController, GameEvent, GameMode, GameOutcome, Phase, StateChange};
pub use moves::{Move, MoveFlags};
pub use position::GameState;
