//! UCI wire format, seen from the GUI side
//!
//! Commands we send to the engine are rendered by [`GuiCommand`]; lines the
//! engine prints are tokenised by [`parse_engine_line`]. Only what the
//! scheduler needs is modelled, everything else comes back as `Unknown`.

use std::fmt;
use std::time::Duration;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum GuiCommand {
    Uci,
    IsReady,
    UciNewGame,
    SetOption { name: String, value: Option<String> },
    Position { fen: String, moves: Vec<String> },
    Go { movetime: Duration },
    Stop,
    Quit,
}

impl fmt::Display for GuiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuiCommand::Uci => write!(f, "uci"),
            GuiCommand::IsReady => write!(f, "isready"),
            GuiCommand::UciNewGame => write!(f, "ucinewgame"),
            GuiCommand::SetOption { name, value: Some(v) } => {
                write!(f, "setoption name {name} value {v}")
            }
            GuiCommand::SetOption { name, value: None } => write!(f, "setoption name {name}"),
            GuiCommand::Position { fen, moves } => {
                write!(f, "position fen {fen}")?;
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }
                Ok(())
            }
            GuiCommand::Go { movetime } => write!(f, "go movetime {}", movetime.as_millis().max(1)),
            GuiCommand::Stop => write!(f, "stop"),
            GuiCommand::Quit => write!(f, "quit"),
        }
    }
}

/// Search progress from an `info` line. Fields the engine omitted are `None`.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SearchInfo {
    pub depth: Option<u32>,
    pub score_cp: Option<i32>,
    pub mate_in: Option<i32>,
    pub nodes: Option<u64>,
    pub time_ms: Option<u64>,
    pub pv: Vec<String>,
    pub string: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum EngineLine {
    Id { key: String, value: String },
    UciOk,
    ReadyOk,
    /// `bestmove (none)` keeps the `(none)` text; the scheduler decides
    BestMove { mv: String, ponder: Option<String> },
    Info(SearchInfo),
    Option(String),
    Unknown(String),
}

/// Parse one line printed by the engine
pub fn parse_engine_line(line: &str) -> EngineLine {
    let trimmed = line.trim();
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        return EngineLine::Unknown(String::new());
    };

    match head {
        "uciok" => EngineLine::UciOk,
        "readyok" => EngineLine::ReadyOk,
        "id" => {
            let key = parts.get(1).copied().unwrap_or_default().to_string();
            let value = parts.get(2..).map(|v| v.join(" ")).unwrap_or_default();
            EngineLine::Id { key, value }
        }
        "option" => EngineLine::Option(parts[1..].join(" ")),
        "bestmove" => match parts.get(1) {
            Some(mv) => {
                let ponder = match parts.get(2) {
                    Some(&"ponder") => parts.get(3).map(|p| p.to_string()),
                    _ => None,
                };
                EngineLine::BestMove {
                    mv: mv.to_string(),
                    ponder,
                }
            }
            None => EngineLine::Unknown(trimmed.to_string()),
        },
        "info" => EngineLine::Info(parse_info(&parts[1..])),
        _ => EngineLine::Unknown(trimmed.to_string()),
    }
}

fn parse_info(parts: &[&str]) -> SearchInfo {
    let mut info = SearchInfo::default();
    let mut i = 0usize;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                info.depth = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "nodes" => {
                info.nodes = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "time" => {
                info.time_ms = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "score" => {
                let value = parts.get(i + 2).and_then(|v| v.parse().ok());
                match parts.get(i + 1) {
                    Some(&"cp") => info.score_cp = value,
                    Some(&"mate") => info.mate_in = value,
                    _ => {}
                }
                i += 3;
            }
            "pv" => {
                info.pv = parts[i + 1..].iter().map(|m| m.to_string()).collect();
                break;
            }
            "string" => {
                info.string = Some(parts[i + 1..].join(" "));
                break;
            }
            _ => {
                i += 1;
            }
        }
    }
    info
}
