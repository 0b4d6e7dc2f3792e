//! Encounter aggregate and the turn/round engine.
//!
//! The [`Encounter`] owns the roster, the round/turn position, the elapsed
//! timers, the notes and event log, and a stack of per-round roster
//! snapshots used to rewind across round boundaries. The presentation
//! layer subscribes to [`EncounterEvent`]s instead of being threaded
//! through the mutation paths.

use crate::combatant::Combatant;
use crate::roster::Roster;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// A timestamped entry in the encounter log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Seconds of encounter time when the entry was recorded.
    pub timestamp: u64,
    pub message: String,
}

/// Signals emitted by the engine for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterEvent {
    /// The active combatant changed; carries the new round number and the
    /// 1-based position of the newly active combatant.
    TurnAdvanced { round: u32, turn: usize },
    /// The order wrapped forward and a new round began.
    RoundAdvanced { round: u32 },
    /// A backward step crossed a round boundary.
    RoundRewound { round: u32 },
    /// The encounter clock was started or stopped.
    ClockToggled { running: bool },
}

/// The tracked state of one encounter.
#[derive(Debug)]
pub struct Encounter {
    pub name: String,
    pub roster: Roster,
    pub round: u32,
    pub active_index: usize,
    pub encounter_time: u64,
    pub turn_time: u64,
    pub is_running: bool,
    pub notes: String,
    pub log: Vec<LogEntry>,
    /// One roster snapshot per completed round, pushed as the order wraps
    /// forward and popped when rewinding across the boundary.
    pub round_snapshots: Vec<Roster>,
    events: broadcast::Sender<EncounterEvent>,
}

impl Encounter {
    pub fn new(name: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            name: name.into(),
            roster: Roster::new(),
            round: 1,
            active_index: 0,
            encounter_time: 0,
            turn_time: 0,
            is_running: false,
            notes: String::new(),
            log: Vec::new(),
            round_snapshots: Vec::new(),
            events,
        }
    }

    /// Subscribe to engine events. Receivers that fall behind see
    /// `Lagged` and can resynchronize from the encounter state itself.
    pub fn subscribe(&self) -> broadcast::Receiver<EncounterEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EncounterEvent) {
        let _ = self.events.send(event);
    }

    /// The combatant whose turn it is, if any.
    pub fn active_combatant(&self) -> Option<&Combatant> {
        self.roster.get_index(self.active_index)
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Start or stop the encounter clock.
    pub fn toggle_clock(&mut self) {
        self.is_running = !self.is_running;
        debug!(running = self.is_running, "encounter clock toggled");
        self.emit(EncounterEvent::ClockToggled {
            running: self.is_running,
        });
    }

    /// Apply one elapsed second. Ticks delivered after the clock was
    /// stopped are ignored, so a tick already in flight at stop time never
    /// counts.
    pub fn tick(&mut self) {
        if !self.is_running {
            return;
        }
        self.encounter_time += 1;
        self.turn_time += 1;
    }

    // ------------------------------------------------------------------
    // Turn cycle
    // ------------------------------------------------------------------

    /// Advance to the next combatant in the order.
    ///
    /// The outgoing combatant banks its turn count (capped at the current
    /// round) and turn time; the incoming combatant gets a fresh action
    /// economy and one step of condition/token decay. Wrapping back to the
    /// top of the order starts a new round: the pre-transition roster is
    /// snapshotted, reactions clear encounter-wide, and every combatant's
    /// round counter advances.
    pub fn advance_turn(&mut self) {
        if self.roster.is_empty() {
            return;
        }

        let next = (self.active_index + 1) % self.roster.len();
        let wrapped = next == 0;
        if wrapped {
            self.round_snapshots.push(self.roster.clone());
        }

        let turn_time = self.turn_time;
        let round = self.round;
        if let Some(current) = self.roster.get_index_mut(self.active_index) {
            current.end_turn(round, turn_time);
        }
        if let Some(incoming) = self.roster.get_index_mut(next) {
            incoming.begin_turn();
        }

        self.turn_time = 0;
        self.active_index = next;

        if wrapped {
            self.round += 1;
            for combatant in self.roster.iter_mut() {
                combatant.reaction = false;
                combatant.round_count += 1;
            }
            debug!(round = self.round, "round advanced");
            self.emit(EncounterEvent::RoundAdvanced { round: self.round });
        }

        debug!(
            round = self.round,
            active_index = self.active_index,
            "turn advanced"
        );
        self.emit(EncounterEvent::TurnAdvanced {
            round: self.round,
            turn: self.active_index + 1,
        });
    }

    /// Step back to the previous combatant in the order.
    ///
    /// Crossing a round boundary backward restores the roster snapshot
    /// taken when that round began, giving exact recovery of condition and
    /// action state without computing decay inverses. At the very start of
    /// the encounter (round 1, first combatant) this is a complete no-op.
    pub fn reverse_turn(&mut self) {
        if self.roster.is_empty() {
            return;
        }
        if self.round == 1 && self.active_index == 0 {
            return;
        }

        self.turn_time = 0;
        let len = self.roster.len();
        let prev = (self.active_index + len - 1) % len;
        self.active_index = prev;

        if prev == len - 1 && self.round > 1 {
            // Imported encounters can sit mid-fight with no snapshots;
            // the round still rewinds.
            if let Some(snapshot) = self.round_snapshots.pop() {
                self.roster = snapshot;
            }
            self.round -= 1;
            debug!(round = self.round, "round rewound");
            self.emit(EncounterEvent::RoundRewound { round: self.round });
        }
    }

    // ------------------------------------------------------------------
    // Log
    // ------------------------------------------------------------------

    /// Append a timestamped message to the encounter log. Entries are
    /// never removed within a session.
    pub fn log_event(&mut self, message: impl Into<String>) {
        self.log.push(LogEntry {
            timestamp: self.encounter_time,
            message: message.into(),
        });
    }
}
