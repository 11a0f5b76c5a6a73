//! Engine configuration
//!
//! Loaded from JSON (every field optional), adjusted with builder setters,
//! and overridden from the environment: `SCACCHIERA_ENGINE` puts an engine
//! path in front of the candidate list.

use crate::error::ConfigError;
use crate::time::TimeManager;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENGINE_ENV_VAR: &str = "SCACCHIERA_ENGINE";

/// Engine executables tried in order when nothing else is configured
pub const DEFAULT_ENGINE_PATHS: [&str; 3] = [
    "/opt/homebrew/bin/stockfish",
    "/usr/local/bin/stockfish",
    "stockfish",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub engine_paths: Vec<PathBuf>,
    /// Wall-clock budget per engine move; past it the engine forfeits
    pub think_time_ms: u64,
    pub move_overhead_ms: u64,
    pub min_movetime_ms: u64,
    pub handshake_timeout_ms: u64,
    /// Engine errors tolerated in one game before the engine side forfeits
    pub engine_error_retries: u32,
    /// UCI `Skill Level` (0-20), left at the engine default when unset
    pub skill_level: Option<u8>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_paths: DEFAULT_ENGINE_PATHS.iter().map(PathBuf::from).collect(),
            think_time_ms: 1000,
            move_overhead_ms: 100,
            min_movetime_ms: 10,
            handshake_timeout_ms: 5000,
            engine_error_retries: 1,
            skill_level: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Apply `SCACCHIERA_ENGINE` from the process environment
    pub fn with_env_overrides(self) -> Self {
        let value = std::env::var_os(ENGINE_ENV_VAR);
        self.with_engine_override(value.as_deref().map(Path::new))
    }

    fn with_engine_override(mut self, path: Option<&Path>) -> Self {
        if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
            self.engine_paths.retain(|p| p.as_path() != path);
            self.engine_paths.insert(0, path.to_path_buf());
        }
        self
    }

    pub fn engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_paths = vec![path.into()];
        self
    }

    pub fn think_time(mut self, time: Duration) -> Self {
        self.think_time_ms = time.as_millis() as u64;
        self
    }

    pub fn handshake_timeout(mut self, time: Duration) -> Self {
        self.handshake_timeout_ms = time.as_millis() as u64;
        self
    }

    pub fn engine_error_retries(mut self, retries: u32) -> Self {
        self.engine_error_retries = retries;
        self
    }

    pub fn skill_level(mut self, level: u8) -> Self {
        self.skill_level = Some(level);
        self
    }

    pub fn think_budget(&self) -> Duration {
        Duration::from_millis(self.think_time_ms)
    }

    pub fn handshake_duration(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn time_manager(&self) -> TimeManager {
        TimeManager::new(
            Duration::from_millis(self.move_overhead_ms),
            Duration::from_millis(self.min_movetime_ms),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine_paths.is_empty() {
            return Err(ConfigError::Invalid {
                field: "engine_paths",
                reason: "at least one engine path is required".to_string(),
            });
        }
        if self.think_time_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "think_time_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.handshake_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "handshake_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if let Some(level) = self.skill_level.filter(|l| *l > 20) {
            return Err(ConfigError::Invalid {
                field: "skill_level",
                reason: format!("{level} is outside 0..=20"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.engine_paths.len(), 3);
        assert_eq!(cfg.engine_paths[2], PathBuf::from("stockfish"));
        assert_eq!(cfg.think_budget(), Duration::from_millis(1000));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json() {
        let cfg = EngineConfig::from_json_str(r#"{ "think_time_ms": 2500, "skill_level": 8 }"#).unwrap();
        assert_eq!(cfg.think_time_ms, 2500);
        assert_eq!(cfg.skill_level, Some(8));
        assert_eq!(cfg.handshake_timeout_ms, 5000);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "think_time_ms": 0 }"#),
            Err(ConfigError::Invalid { field: "think_time_ms", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "skill_level": 42 }"#),
            Err(ConfigError::Invalid { field: "skill_level", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "engine_paths": [] }"#),
            Err(ConfigError::Invalid { field: "engine_paths", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "thinktime": 1 }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn override_goes_first() {
        let cfg = EngineConfig::default()
            .with_engine_override(Some(Path::new("/usr/local/bin/stockfish")));
        assert_eq!(cfg.engine_paths[0], PathBuf::from("/usr/local/bin/stockfish"));
        assert_eq!(cfg.engine_paths.len(), 3);

        let cfg = EngineConfig::default().with_engine_override(Some(Path::new("")));
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn builder() {
        let cfg = EngineConfig::new()
            .engine_path("/tmp/fake-engine")
            .think_time(Duration::from_millis(300))
            .engine_error_retries(0);
        assert_eq!(cfg.engine_paths, vec![PathBuf::from("/tmp/fake-engine")]);
        assert_eq!(cfg.think_time_ms, 300);
        assert_eq!(cfg.time_manager().move_overhead, Duration::from_millis(100));
    }
}
