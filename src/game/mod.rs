//! Game session: outcomes, the session controller and its notifications.

pub mod controller;

pub use controller::{GameController, GameEvent, GameMode, Phase, StateChange, TickEvent};

use crate::board::Color;
use std::fmt;

/// Why a game ended in a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawReason {
    InsufficientMaterial,
    FiftyMove,
    Repetition,
}

impl fmt::Display for DrawReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DrawReason::InsufficientMaterial => "insufficient material",
            DrawReason::FiftyMove => "fifty-move rule",
            DrawReason::Repetition => "threefold repetition",
        };
        f.write_str(s)
    }
}

/// State of a game. Anything other than `Ongoing` is terminal and sticky:
/// the controller refuses further moves until it is restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameOutcome {
    #[default]
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    Draw(DrawReason),
    Resigned { loser: Color },
    /// The engine did not answer within its time budget
    TimeoutForfeit { loser: Color },
    /// The engine process failed and no retries were left
    EngineForfeit { loser: Color },
}

impl GameOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameOutcome::Ongoing)
    }

    /// Colour that won, `None` for draws and unfinished games.
    pub fn winner(&self) -> Option<Color> {
        match *self {
            GameOutcome::Checkmate { winner } => Some(winner),
            GameOutcome::Resigned { loser }
            | GameOutcome::TimeoutForfeit { loser }
            | GameOutcome::EngineForfeit { loser } => Some(loser.opponent()),
            GameOutcome::Ongoing | GameOutcome::Stalemate | GameOutcome::Draw(_) => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, GameOutcome::Stalemate | GameOutcome::Draw(_))
    }

    /// PGN-style result tag ("1-0", "0-1", "1/2-1/2", "*")
    pub fn result_tag(&self) -> &'static str {
        match self.winner() {
            Some(Color::White) => "1-0",
            Some(Color::Black) => "0-1",
            None if self.is_draw() => "1/2-1/2",
            None => "*",
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Ongoing => write!(f, "ongoing"),
            GameOutcome::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            GameOutcome::Stalemate => write!(f, "stalemate"),
            GameOutcome::Draw(reason) => write!(f, "draw by {reason}"),
            GameOutcome::Resigned { loser } => write!(f, "{loser} resigned"),
            GameOutcome::TimeoutForfeit { loser } => write!(f, "{loser} forfeits on time"),
            GameOutcome::EngineForfeit { loser } => write!(f, "{loser} forfeits, engine failure"),
        }
    }
}
