//! External UCI engine process
//!
//! Commands are written on the caller's thread (short writes to a pipe).
//! A reader thread forwards every stdout line into a channel, which the
//! scheduler drains with `try_recv` on each tick. `bestmove` lines are
//! matched to jobs in submission order, so after a `stop` the abandoned
//! job's answer is still attributed to its own generation.

use super::protocol::{parse_engine_line, EngineLine, GuiCommand};
use super::{EngineBackend, EngineReply, SearchJob};
use crate::config::EngineConfig;
use crate::error::EngineError;
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

enum ReaderEvent {
    Line(String),
    Closed,
}

pub struct UciProcess {
    path: PathBuf,
    name: String,
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<ReaderEvent>,
    reader: Option<JoinHandle<()>>,
    // generations submitted and not yet answered, oldest first
    pending: VecDeque<u64>,
    alive: bool,
}

impl UciProcess {
    /// Start `path`, complete the `uci`/`isready` handshake and apply the
    /// configured options.
    pub fn spawn(path: &Path, config: &EngineConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {e}", path.display())))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Spawn(format!("{}: no stdio pipes", path.display())));
        };

        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("uci-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(ReaderEvent::Line(line)).is_err() {
                        return;
                    }
                }
                let _ = tx.send(ReaderEvent::Closed);
            });
        let reader = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Spawn(format!("reader thread: {e}")));
            }
        };

        let mut process = UciProcess {
            path: path.to_path_buf(),
            name: path.display().to_string(),
            child,
            stdin,
            lines: rx,
            reader: Some(reader),
            pending: VecDeque::new(),
            alive: true,
        };
        process.handshake(config)?;
        info!("engine {} ready ({})", process.name, process.path.display());
        Ok(process)
    }

    /// Try each configured path in order and keep the first engine that
    /// completes the handshake.
    pub fn spawn_first_available(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut failures = Vec::new();
        for path in &config.engine_paths {
            match Self::spawn(path, config) {
                Ok(process) => return Ok(process),
                Err(e) => {
                    debug!("engine candidate {} unusable: {e}", path.display());
                    failures.push(match e {
                        EngineError::Spawn(msg) => msg,
                        other => format!("{}: {other}", path.display()),
                    });
                }
            }
        }
        warn!("no usable engine found, engine mode unavailable");
        Err(EngineError::Spawn(failures.join("; ")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handshake(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        let timeout = config.handshake_duration();
        let deadline = Instant::now() + timeout;

        self.send(&GuiCommand::Uci)?;
        loop {
            match self.next_line_before(deadline, timeout)? {
                EngineLine::Id { key, value } if key == "name" => self.name = value,
                EngineLine::UciOk => break,
                _ => {}
            }
        }

        if let Some(level) = config.skill_level {
            self.send(&GuiCommand::SetOption {
                name: "Skill Level".to_string(),
                value: Some(level.to_string()),
            })?;
        }
        self.send(&GuiCommand::UciNewGame)?;
        self.send(&GuiCommand::IsReady)?;
        while self.next_line_before(deadline, timeout)? != EngineLine::ReadyOk {}
        Ok(())
    }

    fn next_line_before(&mut self, deadline: Instant, timeout: Duration) -> Result<EngineLine, EngineError> {
        let left = deadline.saturating_duration_since(Instant::now());
        match self.lines.recv_timeout(left) {
            Ok(ReaderEvent::Line(line)) => {
                trace!("engine> {line}");
                Ok(parse_engine_line(&line))
            }
            Ok(ReaderEvent::Closed) | Err(RecvTimeoutError::Disconnected) => {
                self.alive = false;
                Err(EngineError::Terminated)
            }
            Err(RecvTimeoutError::Timeout) => Err(EngineError::Handshake(timeout)),
        }
    }

    fn send(&mut self, cmd: &GuiCommand) -> Result<(), EngineError> {
        if !self.alive {
            return Err(EngineError::Terminated);
        }
        trace!("engine< {cmd}");
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl EngineBackend for UciProcess {
    fn submit(&mut self, job: &SearchJob) -> Result<(), EngineError> {
        self.send(&GuiCommand::Position {
            fen: job.fen.clone(),
            moves: Vec::new(),
        })?;
        self.send(&GuiCommand::Go {
            movetime: job.movetime,
        })?;
        self.pending.push_back(job.generation);
        Ok(())
    }

    fn try_recv(&mut self) -> Option<EngineReply> {
        loop {
            match self.lines.try_recv() {
                Ok(ReaderEvent::Line(line)) => match parse_engine_line(&line) {
                    EngineLine::BestMove { mv, .. } => {
                        let Some(generation) = self.pending.pop_front() else {
                            debug!("unsolicited bestmove {mv} ignored");
                            continue;
                        };
                        return Some(EngineReply {
                            generation,
                            result: Ok(mv),
                        });
                    }
                    EngineLine::Info(info) => {
                        if let (Some(depth), Some(cp)) = (info.depth, info.score_cp) {
                            trace!("{}: depth {depth} score cp {cp}", self.name);
                        }
                    }
                    other => trace!("{}: {other:?}", self.name),
                },
                Err(TryRecvError::Empty) => return None,
                Ok(ReaderEvent::Closed) | Err(TryRecvError::Disconnected) => {
                    if self.alive {
                        warn!("engine {} terminated", self.name);
                        self.alive = false;
                    }
                    let generation = self.pending.pop_front()?;
                    return Some(EngineReply {
                        generation,
                        result: Err(EngineError::Terminated),
                    });
                }
            }
        }
    }

    fn cancel(&mut self, generation: u64) {
        if self.pending.contains(&generation) {
            if let Err(e) = self.send(&GuiCommand::Stop) {
                debug!("could not stop engine search {generation}: {e}");
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for UciProcess {
    fn drop(&mut self) {
        let _ = self.send(&GuiCommand::Quit);
        let deadline = Instant::now() + Duration::from_millis(250);
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(5)),
                _ => {
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        debug!("engine {} shut down", self.name);
    }
}
