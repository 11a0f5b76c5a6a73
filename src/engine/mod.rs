//! Engine move scheduler
//!
//! Single-flight coordination with an external move-search process. The
//! caller's loop asks for a move with [`EngineScheduler::request_move`] and
//! then calls [`EngineScheduler::poll`] once per tick; nothing here blocks.
//! Each request carries a generation number so replies that arrive after a
//! cancel (restart, resignation) are recognised and dropped.

pub mod process;
pub mod protocol;

pub use process::UciProcess;

use crate::error::EngineError;
use crate::movegen::resolve_move;
use crate::moves::{Move, UciMove};
use crate::position::GameState;
use crate::time::TimeManager;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// A search order handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchJob {
    pub generation: u64,
    pub fen: String,
    pub movetime: Duration,
}

/// What the backend got back for one job: the raw best-move text, or the
/// reason there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub generation: u64,
    pub result: Result<String, EngineError>,
}

/// Transport to a move-search process. Implemented by [`UciProcess`] and by
/// test doubles that answer on demand.
pub trait EngineBackend {
    /// Send a job. Must not block on the search itself.
    fn submit(&mut self, job: &SearchJob) -> Result<(), EngineError>;

    /// Next reply that has arrived, if any. Never blocks.
    fn try_recv(&mut self) -> Option<EngineReply>;

    /// Ask the backend to abandon `generation`. A reply may still show up
    /// later; the scheduler discards it.
    fn cancel(&mut self, _generation: u64) {}

    fn name(&self) -> &str {
        "engine"
    }
}

/// The request currently owned by the scheduler.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub position: GameState,
    pub budget: Duration,
    pub generation: u64,
    pub started: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Submitted { generation: u64 },
    /// A request is already outstanding; nothing was sent
    AlreadyInFlight,
    /// Caller is animating; nothing was sent
    Animating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePoll {
    /// Nothing in flight
    Idle,
    Pending,
    /// A legal move for the requested position
    Ready(Move),
    TimedOut,
    EngineError(EngineError),
}

pub struct EngineScheduler {
    backend: Box<dyn EngineBackend>,
    request: Option<EngineRequest>,
    generation: u64,
    time: TimeManager,
}

impl EngineScheduler {
    pub fn new(backend: Box<dyn EngineBackend>) -> Self {
        Self::with_time_manager(backend, TimeManager::default())
    }

    pub fn with_time_manager(backend: Box<dyn EngineBackend>, time: TimeManager) -> Self {
        Self {
            backend,
            request: None,
            generation: 0,
            time,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.request.is_some()
    }

    /// Generation of the most recent request (0 before the first one).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_request(&self) -> Option<&EngineRequest> {
        self.request.as_ref()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Start a search for `state`. A second call while one is outstanding,
    /// or any call while `animating`, does nothing. Only a failure to reach
    /// the backend is an error, and it leaves the scheduler idle.
    pub fn request_move(
        &mut self,
        state: &GameState,
        budget: Duration,
        animating: bool,
    ) -> Result<RequestStatus, EngineError> {
        if self.request.is_some() {
            debug!("engine request ignored: generation {} still in flight", self.generation);
            return Ok(RequestStatus::AlreadyInFlight);
        }
        if animating {
            debug!("engine request ignored: animation in progress");
            return Ok(RequestStatus::Animating);
        }

        self.generation += 1;
        let job = SearchJob {
            generation: self.generation,
            fen: state.to_fen(),
            movetime: self.time.engine_movetime(budget),
        };
        self.backend.submit(&job)?;
        info!(
            "engine request {} submitted ({} ms budget, movetime {} ms)",
            job.generation,
            budget.as_millis(),
            job.movetime.as_millis()
        );
        self.request = Some(EngineRequest {
            position: state.clone(),
            budget,
            generation: job.generation,
            started: Instant::now(),
        });
        Ok(RequestStatus::Submitted {
            generation: job.generation,
        })
    }

    /// Non-blocking check on the outstanding request. Any result other than
    /// `Pending` clears the in-flight state.
    pub fn poll(&mut self) -> EnginePoll {
        let Some(generation) = self.request.as_ref().map(|r| r.generation) else {
            self.drain_stale();
            return EnginePoll::Idle;
        };

        while let Some(reply) = self.backend.try_recv() {
            if reply.generation != generation {
                debug!(
                    "discarding stale engine reply for generation {} (current {})",
                    reply.generation, generation
                );
                continue;
            }
            let Some(request) = self.request.take() else {
                break;
            };
            return match reply.result {
                Ok(text) => match validate_reply(&request.position, &text) {
                    Ok(mv) => {
                        info!(
                            "engine move {} after {} ms",
                            mv,
                            request.started.elapsed().as_millis()
                        );
                        EnginePoll::Ready(mv)
                    }
                    Err(err) => {
                        warn!("rejecting engine reply {text:?}: {err}");
                        EnginePoll::EngineError(err)
                    }
                },
                Err(err) => {
                    warn!("engine failed on request {generation}: {err}");
                    EnginePoll::EngineError(err)
                }
            };
        }

        let timed_out = self
            .request
            .as_ref()
            .is_some_and(|r| r.started.elapsed() >= r.budget);
        if timed_out {
            warn!("engine request {generation} timed out");
            self.request = None;
            self.backend.cancel(generation);
            return EnginePoll::TimedOut;
        }
        EnginePoll::Pending
    }

    /// Abandon the outstanding request, if any. Its reply will be ignored.
    pub fn cancel(&mut self) {
        if let Some(request) = self.request.take() {
            debug!("cancelling engine request {}", request.generation);
            self.backend.cancel(request.generation);
        }
    }

    fn drain_stale(&mut self) {
        while let Some(reply) = self.backend.try_recv() {
            debug!("discarding engine reply for generation {} with nothing in flight", reply.generation);
        }
    }
}

/// The engine is never trusted: its answer must decode and be one of the
/// legal moves of the position it was asked about.
fn validate_reply(position: &GameState, text: &str) -> Result<Move, EngineError> {
    let text = text.trim();
    if text.is_empty() || text == "(none)" || text == "0000" {
        return Err(EngineError::NoMove);
    }
    let parsed = UciMove::parse(text).map_err(|_| EngineError::Malformed(text.to_string()))?;
    resolve_move(position, parsed.from, parsed.to, parsed.promotion)
        .ok_or_else(|| EngineError::IllegalMove(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Script {
        submitted: Vec<SearchJob>,
        cancelled: Vec<u64>,
        replies: VecDeque<EngineReply>,
        fail_submit: bool,
    }

    struct Scripted(Rc<RefCell<Script>>);

    impl EngineBackend for Scripted {
        fn submit(&mut self, job: &SearchJob) -> Result<(), EngineError> {
            let mut s = self.0.borrow_mut();
            if s.fail_submit {
                return Err(EngineError::Terminated);
            }
            s.submitted.push(job.clone());
            Ok(())
        }

        fn try_recv(&mut self) -> Option<EngineReply> {
            self.0.borrow_mut().replies.pop_front()
        }

        fn cancel(&mut self, generation: u64) {
            self.0.borrow_mut().cancelled.push(generation);
        }
    }

    fn scheduler() -> (EngineScheduler, Rc<RefCell<Script>>) {
        let script = Rc::new(RefCell::new(Script::default()));
        let sched = EngineScheduler::new(Box::new(Scripted(script.clone())));
        (sched, script)
    }

    fn reply(generation: u64, text: &str) -> EngineReply {
        EngineReply {
            generation,
            result: Ok(text.to_string()),
        }
    }

    #[test]
    fn idle_without_request() {
        let (mut sched, _) = scheduler();
        assert_eq!(sched.poll(), EnginePoll::Idle);
        assert!(!sched.is_in_flight());
    }

    #[test]
    fn second_request_is_noop() {
        let (mut sched, script) = scheduler();
        let state = GameState::new();
        let first = sched.request_move(&state, Duration::from_secs(5), false).unwrap();
        assert_eq!(first, RequestStatus::Submitted { generation: 1 });
        let second = sched.request_move(&state, Duration::from_secs(5), false).unwrap();
        assert_eq!(second, RequestStatus::AlreadyInFlight);
        assert_eq!(script.borrow().submitted.len(), 1);
    }

    #[test]
    fn animation_blocks_request() {
        let (mut sched, script) = scheduler();
        let status = sched.request_move(&GameState::new(), Duration::from_secs(1), true).unwrap();
        assert_eq!(status, RequestStatus::Animating);
        assert!(!sched.is_in_flight());
        assert!(script.borrow().submitted.is_empty());
    }

    #[test]
    fn ready_move_is_validated() {
        let (mut sched, script) = scheduler();
        sched.request_move(&GameState::new(), Duration::from_secs(5), false).unwrap();
        assert_eq!(sched.poll(), EnginePoll::Pending);
        script.borrow_mut().replies.push_back(reply(1, "g1f3"));
        match sched.poll() {
            EnginePoll::Ready(mv) => assert_eq!(mv.to_uci(), "g1f3"),
            other => panic!("expected ready, got {other:?}"),
        }
        assert!(!sched.is_in_flight());
    }

    #[test]
    fn illegal_and_malformed_replies_are_errors() {
        let (mut sched, script) = scheduler();
        let state = GameState::new();

        sched.request_move(&state, Duration::from_secs(5), false).unwrap();
        script.borrow_mut().replies.push_back(reply(1, "e2e5"));
        assert_eq!(sched.poll(), EnginePoll::EngineError(EngineError::IllegalMove("e2e5".into())));
        assert!(!sched.is_in_flight());

        sched.request_move(&state, Duration::from_secs(5), false).unwrap();
        script.borrow_mut().replies.push_back(reply(2, "banana"));
        assert_eq!(sched.poll(), EnginePoll::EngineError(EngineError::Malformed("banana".into())));

        sched.request_move(&state, Duration::from_secs(5), false).unwrap();
        script.borrow_mut().replies.push_back(reply(3, "(none)"));
        assert_eq!(sched.poll(), EnginePoll::EngineError(EngineError::NoMove));
    }

    #[test]
    fn timeout_clears_in_flight_and_cancels() {
        let (mut sched, script) = scheduler();
        sched.request_move(&GameState::new(), Duration::ZERO, false).unwrap();
        assert_eq!(sched.poll(), EnginePoll::TimedOut);
        assert!(!sched.is_in_flight());
        assert_eq!(script.borrow().cancelled, vec![1]);
    }

    #[test]
    fn stale_reply_after_cancel_is_dropped() {
        let (mut sched, script) = scheduler();
        let state = GameState::new();
        sched.request_move(&state, Duration::from_secs(5), false).unwrap();
        sched.cancel();
        assert!(!sched.is_in_flight());

        sched.request_move(&state, Duration::from_secs(5), false).unwrap();
        script.borrow_mut().replies.push_back(reply(1, "e2e4"));
        assert_eq!(sched.poll(), EnginePoll::Pending);
        script.borrow_mut().replies.push_back(reply(2, "d2d4"));
        assert_eq!(sched.poll(), EnginePoll::Ready(resolve_move(
            &state,
            "d2".parse().unwrap(),
            "d4".parse().unwrap(),
            None
        ).unwrap()));
    }

    #[test]
    fn submit_failure_leaves_scheduler_idle() {
        let (mut sched, script) = scheduler();
        script.borrow_mut().fail_submit = true;
        let err = sched.request_move(&GameState::new(), Duration::from_secs(1), false);
        assert_eq!(err, Err(EngineError::Terminated));
        assert!(!sched.is_in_flight());
    }

    #[test]
    fn underpromotion_from_engine_is_kept() {
        let state = GameState::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        let mv = validate_reply(&state, "e7e8n").unwrap();
        assert_eq!(mv.promotion, Some(crate::board::PieceKind::Knight));
    }
}
