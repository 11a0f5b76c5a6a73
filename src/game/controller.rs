//! Game session controller
//!
//! Owns the [`GameState`], validates and applies moves, freezes the game
//! once an outcome is reached and notifies observers. In engine mode the
//! caller's loop calls [`GameController::tick`] once per frame; the
//! controller then drives the [`EngineScheduler`] without ever blocking.

use super::GameOutcome;
use crate::board::{Color, Piece, Square};
use crate::config::EngineConfig;
use crate::engine::{EnginePoll, EngineScheduler, RequestStatus, UciProcess};
use crate::error::{EngineError, Rejected};
use crate::movegen::{self, castling_rook_move};
use crate::moves::Move;
use crate::position::GameState;
use log::{debug, info, warn};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingInput,
    /// A move was applied and the UI is still animating it
    MoveInProgress,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    HumanVsHuman,
    HumanVsEngine { human: Color },
}

impl GameMode {
    pub fn engine_color(&self) -> Option<Color> {
        match *self {
            GameMode::HumanVsHuman => None,
            GameMode::HumanVsEngine { human } => Some(human.opponent()),
        }
    }
}

/// Everything the UI needs to animate one applied move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub previous_fen: String,
    pub fen: String,
    pub mv: Move,
    pub mover: Piece,
    pub captured: Option<Piece>,
    /// Rook squares when the move was a castle
    pub rook_move: Option<(Square, Square)>,
    /// Side to move is now in check
    pub check: bool,
    pub outcome: GameOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Moved(StateChange),
    /// Terminal outcome set without a move (resignation, forfeit)
    Ended(GameOutcome),
    Restarted,
}

/// What one [`GameController::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    /// Nothing to do: human's turn, animating, game over, or no engine
    Idle,
    Requested { generation: u64 },
    Thinking,
    Moved(StateChange),
    /// The engine failed; a new request goes out on the next tick
    EngineRetry(EngineError),
    Ended(GameOutcome),
}

type Observer = Box<dyn FnMut(&GameEvent)>;

pub struct GameController {
    state: GameState,
    phase: Phase,
    outcome: GameOutcome,
    mode: GameMode,
    moves: Vec<Move>,
    engine: Option<EngineScheduler>,
    think_budget: Duration,
    error_retries: u32,
    retries_left: u32,
    observers: Vec<Observer>,
}

impl Default for GameController {
    fn default() -> Self {
        Self::new()
    }
}

impl GameController {
    /// Human vs human from the standard position
    pub fn new() -> Self {
        Self {
            state: GameState::new(),
            phase: Phase::AwaitingInput,
            outcome: GameOutcome::Ongoing,
            mode: GameMode::HumanVsHuman,
            moves: Vec::new(),
            engine: None,
            think_budget: Duration::from_millis(EngineConfig::default().think_time_ms),
            error_retries: 0,
            retries_left: 0,
            observers: Vec::new(),
        }
    }

    pub fn with_engine(human: Color, engine: EngineScheduler, config: &EngineConfig) -> Self {
        Self {
            mode: GameMode::HumanVsEngine { human },
            engine: Some(engine),
            think_budget: config.think_budget(),
            error_retries: config.engine_error_retries,
            retries_left: config.engine_error_retries,
            ..Self::new()
        }
    }

    /// Spawn the first available UCI engine from `config`. On error the
    /// caller can still fall back to [`GameController::new`].
    pub fn with_uci_engine(human: Color, config: &EngineConfig) -> Result<Self, EngineError> {
        let process = UciProcess::spawn_first_available(config)?;
        let scheduler = EngineScheduler::with_time_manager(Box::new(process), config.time_manager());
        Ok(Self::with_engine(human, scheduler, config))
    }

    /// Continue from an arbitrary position. The outcome is classified right
    /// away, so a finished position starts out terminal.
    pub fn from_position(state: GameState) -> Self {
        let outcome = movegen::classify_outcome(&state);
        let phase = if outcome.is_terminal() {
            Phase::Terminal
        } else {
            Phase::AwaitingInput
        };
        Self {
            state,
            phase,
            outcome,
            ..Self::new()
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> GameOutcome {
        self.outcome
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Moves applied since the last (re)start
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn engine(&self) -> Option<&EngineScheduler> {
        self.engine.as_ref()
    }

    pub fn is_engine_turn(&self) -> bool {
        self.mode.engine_color() == Some(self.state.side_to_move())
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Legal moves from `from`, for highlights. Empty once the game is over.
    pub fn legal_moves(&self, from: Square) -> Vec<Move> {
        if self.phase == Phase::Terminal {
            return Vec::new();
        }
        movegen::legal_moves(&self.state, from)
    }

    /// Distinct destination squares from `from` (promotions collapse)
    pub fn targets(&self, from: Square) -> Vec<Square> {
        let mut targets: Vec<Square> = self.legal_moves(from).into_iter().map(|m| m.to).collect();
        targets.dedup();
        targets
    }

    /// Apply a move given by its squares and optional promotion. Flags on
    /// `mv` are ignored; the generated legal move is what gets played.
    pub fn apply(&mut self, mv: Move) -> Result<StateChange, Rejected> {
        if self.phase == Phase::Terminal {
            return Err(Rejected::GameOver(self.outcome));
        }
        let piece = self
            .state
            .board()
            .get(mv.from)
            .ok_or(Rejected::EmptySquare(mv.from))?;
        let side_to_move = self.state.side_to_move();
        if piece.color != side_to_move {
            return Err(Rejected::WrongTurn { side_to_move });
        }
        let legal = movegen::resolve_move(&self.state, mv.from, mv.to, mv.promotion)
            .ok_or(Rejected::IllegalMove(mv))?;

        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }

        let previous_fen = self.state.to_fen();
        let applied = self.state.apply(&legal);
        self.moves.push(legal);
        self.outcome = movegen::classify_outcome(&self.state);
        self.phase = if self.outcome.is_terminal() {
            Phase::Terminal
        } else {
            Phase::MoveInProgress
        };

        let change = StateChange {
            previous_fen,
            fen: self.state.to_fen(),
            mv: legal,
            mover: applied.mover,
            captured: applied.captured,
            rook_move: castling_rook_move(&legal, applied.mover.color),
            check: movegen::is_in_check(&self.state, self.state.side_to_move()),
            outcome: self.outcome,
        };
        info!("{} played {}", applied.mover.color, legal);
        if self.outcome.is_terminal() {
            info!("game over: {}", self.outcome);
        }
        self.emit(GameEvent::Moved(change.clone()));
        Ok(change)
    }

    /// Like [`apply`](Self::apply), but refuses moves while it is the
    /// engine's turn. This is the entry point for UI input.
    pub fn apply_human(&mut self, mv: Move) -> Result<StateChange, Rejected> {
        if self.phase != Phase::Terminal && self.is_engine_turn() {
            debug!("human move {mv} refused, engine to move");
            return Err(Rejected::WrongTurn {
                side_to_move: self.state.side_to_move(),
            });
        }
        self.apply(mv)
    }

    /// The UI finished animating the last move
    pub fn animation_finished(&mut self) {
        if self.phase == Phase::MoveInProgress {
            self.phase = Phase::AwaitingInput;
        }
    }

    /// Back to the standard position from any phase. An engine request in
    /// flight is abandoned and its late answer ignored.
    pub fn restart(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
        self.state = GameState::new();
        self.phase = Phase::AwaitingInput;
        self.outcome = GameOutcome::Ongoing;
        self.moves.clear();
        self.retries_left = self.error_retries;
        info!("game restarted");
        self.emit(GameEvent::Restarted);
    }

    pub fn resign(&mut self, color: Color) -> Result<GameOutcome, Rejected> {
        let outcome = GameOutcome::Resigned { loser: color };
        self.force_outcome(outcome)?;
        Ok(outcome)
    }

    /// The side to move resigns
    pub fn resign_current(&mut self) -> Result<GameOutcome, Rejected> {
        self.resign(self.state.side_to_move())
    }

    /// End the game with `outcome`, bypassing move legality. An already
    /// finished game keeps its first outcome.
    pub fn force_outcome(&mut self, outcome: GameOutcome) -> Result<(), Rejected> {
        if self.phase == Phase::Terminal {
            return Err(Rejected::GameOver(self.outcome));
        }
        if !outcome.is_terminal() {
            warn!("force_outcome called with a non-terminal outcome, ignored");
            return Ok(());
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
        self.outcome = outcome;
        self.phase = Phase::Terminal;
        info!("game over: {outcome}");
        self.emit(GameEvent::Ended(outcome));
        Ok(())
    }

    /// Drive the engine for one frame. Requests a move when it is the
    /// engine's turn and no animation is running, then polls for it.
    pub fn tick(&mut self) -> TickEvent {
        if self.phase == Phase::Terminal || !self.is_engine_turn() {
            return TickEvent::Idle;
        }
        let animating = self.phase == Phase::MoveInProgress;
        let Some(engine) = self.engine.as_mut() else {
            return TickEvent::Idle;
        };

        if !engine.is_in_flight() {
            return match engine.request_move(&self.state, self.think_budget, animating) {
                Ok(RequestStatus::Submitted { generation }) => TickEvent::Requested { generation },
                Ok(RequestStatus::AlreadyInFlight | RequestStatus::Animating) => TickEvent::Idle,
                Err(err) => self.engine_failed(err),
            };
        }

        match engine.poll() {
            EnginePoll::Idle => TickEvent::Idle,
            EnginePoll::Pending => TickEvent::Thinking,
            EnginePoll::Ready(mv) => match self.apply(mv) {
                Ok(change) => {
                    self.retries_left = self.error_retries;
                    TickEvent::Moved(change)
                }
                Err(rejected) => {
                    warn!("engine move {mv} rejected by controller: {rejected}");
                    self.engine_failed(EngineError::IllegalMove(mv.to_uci()))
                }
            },
            EnginePoll::TimedOut => self.engine_forfeit(GameOutcome::TimeoutForfeit {
                loser: self.state.side_to_move(),
            }),
            EnginePoll::EngineError(err) => self.engine_failed(err),
        }
    }

    fn engine_failed(&mut self, err: EngineError) -> TickEvent {
        if self.retries_left > 0 {
            self.retries_left -= 1;
            warn!("engine error ({err}), retrying; {} retries left", self.retries_left);
            return TickEvent::EngineRetry(err);
        }
        warn!("engine error ({err}) with no retries left");
        self.engine_forfeit(GameOutcome::EngineForfeit {
            loser: self.state.side_to_move(),
        })
    }

    fn engine_forfeit(&mut self, outcome: GameOutcome) -> TickEvent {
        match self.force_outcome(outcome) {
            Ok(()) => TickEvent::Ended(outcome),
            Err(_) => TickEvent::Idle,
        }
    }

    fn emit(&mut self, event: GameEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}
