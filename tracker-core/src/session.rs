//! TrackerSession - the high-level API tying the engine, the clock, and
//! persistence together.
//!
//! The session is what a frontend talks to: it forwards turn operations to
//! the encounter, owns the spawned clock while the encounter is running,
//! and performs the optional auto-save after each turn advance. Auto-save
//! failures surface as errors but never disturb engine state.

use crate::clock::{Clock, Tick};
use crate::encounter::{Encounter, EncounterEvent};
use crate::persist::{
    self, auto_save_file_name, EncounterDocument, PartyDocument, PersistError,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// Configuration for a tracker session.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Encounter name.
    pub encounter_name: String,

    /// Whether to write an export after every turn advance.
    pub auto_save: bool,

    /// Directory auto-saves are written into.
    pub save_dir: PathBuf,
}

impl TrackerConfig {
    /// Create a config with auto-save disabled.
    pub fn new(encounter_name: impl Into<String>) -> Self {
        Self {
            encounter_name: encounter_name.into(),
            auto_save: false,
            save_dir: PathBuf::from("."),
        }
    }

    /// Enable or disable auto-save.
    pub fn with_auto_save(mut self, enabled: bool) -> Self {
        self.auto_save = enabled;
        self
    }

    /// Set the auto-save directory.
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }
}

/// A running tracker session.
pub struct TrackerSession {
    encounter: Encounter,
    config: TrackerConfig,
    clock: Option<Clock>,
    ticks: Option<mpsc::Receiver<Tick>>,
}

impl TrackerSession {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            encounter: Encounter::new(config.encounter_name.clone()),
            config,
            clock: None,
            ticks: None,
        }
    }

    /// Get a reference to the encounter.
    pub fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// Get a mutable reference to the encounter.
    ///
    /// Roster edits and direct state changes go through here.
    pub fn encounter_mut(&mut self) -> &mut Encounter {
        &mut self.encounter
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EncounterEvent> {
        self.encounter.subscribe()
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Start or stop the encounter clock, spawning or cancelling the tick
    /// task to match. Must be called from within a tokio runtime.
    pub fn toggle_clock(&mut self) {
        self.encounter.toggle_clock();
        if self.encounter.is_running {
            if self.clock.is_none() {
                let (clock, ticks) = Clock::spawn();
                self.clock = Some(clock);
                self.ticks = Some(ticks);
            }
        } else if let Some(clock) = self.clock.take() {
            clock.stop();
            self.ticks = None;
        }
    }

    /// Wait for the next clock tick and apply it to the encounter.
    /// Returns false when the clock is stopped.
    pub async fn run_clock_once(&mut self) -> bool {
        let Some(ticks) = self.ticks.as_mut() else {
            return false;
        };
        match ticks.recv().await {
            Some(_) => {
                self.encounter.tick();
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Turn cycle
    // ------------------------------------------------------------------

    /// Advance the turn, auto-saving afterwards when enabled. Returns the
    /// path written, if any.
    pub async fn advance_turn(&mut self) -> Result<Option<PathBuf>, SessionError> {
        self.encounter.advance_turn();

        if !self.config.auto_save || self.encounter.roster.is_empty() {
            return Ok(None);
        }

        let file_name = auto_save_file_name(
            &self.encounter.name,
            self.encounter.round,
            self.encounter.active_index + 1,
        );
        let path = self.config.save_dir.join(file_name);
        EncounterDocument::from_encounter(&self.encounter)
            .save_json(&path)
            .await?;
        debug!(path = %path.display(), "auto-saved");
        Ok(Some(path))
    }

    /// Step back to the previous turn.
    pub fn reverse_turn(&mut self) {
        self.encounter.reverse_turn();
    }

    // ------------------------------------------------------------------
    // Import / export
    // ------------------------------------------------------------------

    /// Export the full encounter to a file.
    pub async fn export(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        EncounterDocument::from_encounter(&self.encounter)
            .save_json(path)
            .await?;
        Ok(())
    }

    /// Export the player characters to a party-only file.
    pub async fn export_party(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        PartyDocument::from_encounter(&self.encounter)
            .save_json(path)
            .await?;
        Ok(())
    }

    /// Replace the current encounter with one loaded from a file.
    ///
    /// On any error the current encounter is left untouched. The clock
    /// stops: a freshly imported encounter never starts running on its
    /// own, whatever the document's flag said at export time.
    pub async fn import(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let document = persist::load_document(path).await?;
        let mut encounter = document.into_encounter();
        encounter.is_running = false;
        if let Some(clock) = self.clock.take() {
            clock.stop();
            self.ticks = None;
        }
        self.encounter = encounter;
        Ok(())
    }
}
