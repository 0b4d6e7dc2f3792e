//! Encounter engine for a tabletop-game combat tracker.
//!
//! This crate provides:
//! - An initiative-ordered combatant roster with a derived sort order
//! - A turn/round engine with per-turn effect decay and snapshot rewind
//! - JSON import/export with a legacy-format upgrade path
//! - A cancelable 1 Hz encounter clock and optional auto-save
//!
//! The presentation layer is an external collaborator: it mutates state
//! through [`TrackerSession`] / [`Encounter`] and subscribes to
//! [`EncounterEvent`]s to know when to re-render.
//!
//! # Quick Start
//!
//! ```
//! use tracker_core::{Combatant, CombatantKind, TrackerConfig, TrackerSession};
//!
//! let mut session = TrackerSession::new(TrackerConfig::new("Goblin Ambush"));
//!
//! let rook = Combatant::new("Rook", CombatantKind::Pc).with_initiative(17);
//! session.encounter_mut().roster.add(rook);
//!
//! session.encounter_mut().advance_turn();
//! assert_eq!(session.encounter().round, 2);
//! ```

pub mod clock;
pub mod combatant;
pub mod encounter;
pub mod persist;
pub mod roster;
pub mod session;

// Primary public API
pub use clock::{Clock, Tick};
pub use combatant::{
    Combatant, CombatantId, CombatantKind, CombatantState, Condition, ConditionDuration,
    DeathSaves, Token,
};
pub use encounter::{Encounter, EncounterEvent, LogEntry};
pub use persist::{
    auto_save_file_name, import_document, EncounterDocument, ImportedDocument, PartyDocument,
    PersistError,
};
pub use roster::Roster;
pub use session::{SessionError, TrackerConfig, TrackerSession};
