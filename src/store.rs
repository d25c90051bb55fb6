//! Session history persistence.

use anyhow::{Context, Result};
use log::{info, warn};
use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
};

use crate::session::GameSession;

pub trait SessionRepository {
    /// Stored sessions in stored order. Never fails: anything unreadable
    /// is treated as an empty history.
    fn load_all(&self) -> Vec<GameSession>;

    fn save_all(&self, sessions: &[GameSession]) -> Result<()>;
}

/// History as one JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionRepository for JsonFileStore {
    fn load_all(&self) -> Vec<GameSession> {
        let txt = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("failed to read {}: {e}; starting empty", self.path.display());
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<GameSession>>(&txt) {
            Ok(sessions) => {
                info!("loaded {} sessions from {}", sessions.len(), self.path.display());
                sessions
            }
            Err(e) => {
                warn!("failed to parse {}: {e}; starting empty", self.path.display());
                Vec::new()
            }
        }
    }

    fn save_all(&self, sessions: &[GameSession]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let txt = serde_json::to_string_pretty(sessions)?;
        fs::write(&tmp, txt).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::cell::RefCell;

    /// In-process repository for recorder tests.
    #[derive(Default)]
    pub struct MemoryStore {
        pub sessions: RefCell<Vec<GameSession>>,
    }

    impl SessionRepository for MemoryStore {
        fn load_all(&self) -> Vec<GameSession> {
            self.sessions.borrow().clone()
        }

        fn save_all(&self, sessions: &[GameSession]) -> Result<()> {
            *self.sessions.borrow_mut() = sessions.to_vec();
            Ok(())
        }
    }
}
