use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;

use crate::config::Config;
use crate::db::{RosterStore, SqliteStore};
use crate::roster::Roster;
use crate::session::SessionManager;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved,
    Failed(String),
    NoWorkspace,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub store: Option<Box<dyn RosterStore>>,
    pub roster: Roster,
    pub sessions: SessionManager,
    pub last_save: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let sessions = SessionManager::new(config.rng(), config.question_end_delay);
        Self {
            config,
            workspace: None,
            store: None,
            roster: Roster::default(),
            sessions,
            last_save: Instant::now(),
        }
    }

    /// Open (or create) a workspace and load its roster. Sessions start Idle.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let store = SqliteStore::open(path)?;
        let roster = store.load()?.unwrap_or_default();
        log::info!(
            "workspace opened: {} ({} classes, {} students)",
            store.path().to_string_lossy(),
            roster.classes.len(),
            roster.students.len()
        );
        self.roster = roster;
        self.store = Some(Box::new(store));
        self.workspace = Some(path.to_path_buf());
        self.sessions.reset();
        self.sessions.select_class(None);
        self.last_save = Instant::now();
        Ok(())
    }

    /// Drop the connection so the database file can be replaced.
    pub fn close_workspace(&mut self) {
        self.store = None;
    }

    /// Best-effort save; the in-memory roster is kept either way.
    pub fn persist(&mut self) -> SaveOutcome {
        let Some(store) = self.store.as_ref() else {
            return SaveOutcome::NoWorkspace;
        };
        self.last_save = Instant::now();
        match store.save(&self.roster) {
            Ok(()) => SaveOutcome::Saved,
            Err(e) => {
                log::warn!("save failed: {:#}", e);
                SaveOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    /// Periodic background save, driven by the dispatch loop.
    pub fn autosave_due(&self, now: Instant) -> bool {
        self.store.is_some() && now.duration_since(self.last_save) >= self.config.autosave_interval
    }

    pub fn next_autosave(&self) -> Option<Instant> {
        self.store
            .as_ref()
            .map(|_| self.last_save + self.config.autosave_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    struct FailingStore;

    impl RosterStore for FailingStore {
        fn load(&self) -> anyhow::Result<Option<Roster>> {
            Ok(None)
        }

        fn save(&self, _roster: &Roster) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn failed_save_keeps_in_memory_state() {
        let mut state = AppState::new(Config {
            seed: Some(1),
            ..Config::default()
        });
        state.store = Some(Box::new(FailingStore));
        let class = state.roster.create_class("K", None).expect("class");
        match state.persist() {
            SaveOutcome::Failed(msg) => assert!(msg.contains("disk full")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(state.roster.class(&class.id).is_some());
    }

    #[test]
    fn no_workspace_means_no_autosave() {
        let state = AppState::new(Config::default());
        assert_eq!(state.next_autosave(), None);
        assert!(!state.autosave_due(Instant::now()));
    }
}
