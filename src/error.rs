//! Error types for scacchiera
//!
//! Expected conditions (illegal input, engine misbehaviour, bad config) are
//! values of these enums and never escape as panics across the controller.

use crate::board::{Color, Square};
use crate::game::GameOutcome;
use crate::moves::Move;
use std::time::Duration;
use thiserror::Error;

/// Problems building a position from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("invalid square notation: {0:?}")]
    InvalidSquare(String),

    #[error("invalid FEN: {0}")]
    InvalidFen(&'static str),

    /// Every side needs exactly one king
    #[error("{color} has {count} kings, expected exactly one")]
    KingCount { color: Color, count: u32 },

    #[error("side not to move is in check")]
    OpponentInCheck,
}

/// Problems decoding a UCI long-algebraic move string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("UCI move too short: {0:?}")]
    TooShort(String),

    #[error("invalid square in move {0:?}")]
    InvalidSquare(String),

    #[error("invalid promotion piece {0:?}")]
    InvalidPromotion(char),

    #[error("move {0} not found in legal moves")]
    NotLegal(String),
}

/// Why the session controller refused a move. Recoverable: the UI clears
/// its selection and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    #[error("game is over: {0}")]
    GameOver(GameOutcome),

    #[error("no piece on {0}")]
    EmptySquare(Square),

    #[error("it is {side_to_move}'s turn")]
    WrongTurn { side_to_move: Color },

    #[error("illegal move {0}")]
    IllegalMove(Move),
}

/// Failures talking to the external move-search process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No candidate executable could be started and handshaken. Fatal for
    /// engine mode only.
    #[error("could not start engine: {0}")]
    Spawn(String),

    #[error("engine handshake timed out after {0:?}")]
    Handshake(Duration),

    #[error("engine I/O error: {0}")]
    Io(String),

    /// The process closed its output or exited
    #[error("engine terminated unexpectedly")]
    Terminated,

    #[error("malformed engine reply: {0:?}")]
    Malformed(String),

    #[error("engine proposed illegal move {0}")]
    IllegalMove(String),

    #[error("engine reported no move in a position with legal moves")]
    NoMove,
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

/// Invalid engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}
