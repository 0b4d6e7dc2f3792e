//! Encounter serialization: export/import documents and the upgrade path.
//!
//! Two document shapes are recognized on import: the full encounter export
//! (current `combatants` key or the legacy `characters` key, with missing
//! per-combatant fields defaulting so older exports still load) and the
//! party-only roster, which is expanded into a fresh encounter of
//! PC-defaulted combatants. Import never mutates existing state; it either
//! produces a whole new [`Encounter`] or fails.

use crate::combatant::{Combatant, CombatantKind};
use crate::encounter::{Encounter, LogEntry};
use crate::roster::Roster;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::info;

/// Errors from serialization and file operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("combatant list is not a sequence")]
    NotASequence,

    #[error("unrecognized document shape")]
    UnrecognizedShape,
}

fn default_encounter_name() -> String {
    "New Encounter".to_string()
}

fn default_party_name() -> String {
    "Imported Party".to_string()
}

fn default_round() -> u32 {
    1
}

// ============================================================================
// Full Encounter Document
// ============================================================================

/// The full-fidelity exported encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterDocument {
    #[serde(default = "default_encounter_name")]
    pub encounter_name: String,
    /// Older exports used the `characters` key.
    #[serde(alias = "characters")]
    pub combatants: Vec<Combatant>,
    #[serde(default = "default_round")]
    pub round: u32,
    #[serde(default)]
    pub encounter_time: u64,
    #[serde(default)]
    pub turn_time: u64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    #[serde(default)]
    pub active_combatant_index: usize,
    #[serde(default)]
    pub is_running: bool,
}

impl EncounterDocument {
    /// Capture the exported view of an encounter.
    pub fn from_encounter(encounter: &Encounter) -> Self {
        Self {
            encounter_name: encounter.name.clone(),
            combatants: encounter.roster.as_slice().to_vec(),
            round: encounter.round,
            encounter_time: encounter.encounter_time,
            turn_time: encounter.turn_time,
            notes: encounter.notes.clone(),
            log: encounter.log.clone(),
            active_combatant_index: encounter.active_index,
            is_running: encounter.is_running,
        }
    }

    /// Hydrate an encounter, preserving the document's combatant order.
    pub fn into_encounter(self) -> Encounter {
        let mut encounter = Encounter::new(self.encounter_name);
        encounter.roster = Roster::from_combatants(self.combatants);
        encounter.round = self.round.max(1);
        encounter.encounter_time = self.encounter_time;
        encounter.turn_time = self.turn_time;
        encounter.notes = self.notes;
        encounter.log = self.log;
        encounter.active_index = self.active_combatant_index;
        encounter.is_running = self.is_running;
        encounter
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content).await?;
        info!(path = %path.as_ref().display(), "encounter exported");
        Ok(())
    }
}

// ============================================================================
// Party-Only Document
// ============================================================================

/// A roster-only export carrying the player characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyDocument {
    #[serde(default = "default_party_name")]
    pub encounter_name: String,
    pub characters: Vec<PartyMember>,
}

/// One entry in a party-only document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMember {
    pub character_name: String,
    pub character_type: CombatantKind,
    pub character_max_movement: Option<u32>,
    #[serde(rename = "characterAC")]
    pub character_ac: Option<u32>,
    #[serde(rename = "characterMaxHP")]
    pub character_max_hp: Option<u32>,
}

impl PartyMember {
    fn from_combatant(combatant: &Combatant) -> Self {
        Self {
            character_name: combatant.name.clone(),
            character_type: combatant.kind,
            character_max_movement: Some(combatant.max_movement),
            character_ac: Some(combatant.ac),
            character_max_hp: Some(combatant.max_hp),
        }
    }

    /// Expand into a freshly-defaulted combatant: seeded HP/AC/movement,
    /// initiative pending, clean action economy and effect lists.
    fn into_combatant(self) -> Combatant {
        let max_movement = self.character_max_movement.unwrap_or(30);
        let max_hp = self.character_max_hp.unwrap_or(10);
        let mut combatant = Combatant::new(self.character_name, self.character_type);
        combatant.initiative = None;
        combatant.max_movement = max_movement;
        combatant.current_movement = max_movement;
        combatant.ac = self.character_ac.unwrap_or(10);
        combatant.max_hp = max_hp;
        combatant.current_hp = max_hp;
        combatant
    }
}

impl PartyDocument {
    /// Capture the player characters of an encounter.
    pub fn from_encounter(encounter: &Encounter) -> Self {
        Self {
            encounter_name: encounter.name.clone(),
            characters: encounter
                .roster
                .iter()
                .filter(|c| c.kind == CombatantKind::Pc)
                .map(PartyMember::from_combatant)
                .collect(),
        }
    }

    /// Expand into a fresh encounter with defaulted round/time/log state.
    pub fn into_encounter(self) -> Encounter {
        let mut encounter = Encounter::new(self.encounter_name);
        let combatants = self
            .characters
            .into_iter()
            .map(PartyMember::into_combatant)
            .collect();
        encounter.roster = Roster::from_combatants(combatants);
        encounter
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content).await?;
        info!(path = %path.as_ref().display(), "party exported");
        Ok(())
    }
}

// ============================================================================
// Import
// ============================================================================

/// A successfully parsed upload, in whichever shape it arrived.
#[derive(Debug, Clone)]
pub enum ImportedDocument {
    Encounter(EncounterDocument),
    Party(PartyDocument),
}

impl ImportedDocument {
    pub fn into_encounter(self) -> Encounter {
        match self {
            ImportedDocument::Encounter(doc) => doc.into_encounter(),
            ImportedDocument::Party(doc) => doc.into_encounter(),
        }
    }
}

/// Parse an uploaded document, accepting either a full encounter export or
/// a party-only roster. A `characters` list whose entries all carry
/// `characterName`/`characterType` keys is treated as a party; anything
/// else with a combatant list is treated as a full document.
pub fn import_document(json: &str) -> Result<ImportedDocument, PersistError> {
    let value: Value = serde_json::from_str(json)?;

    if let Some(list) = value.get("characters") {
        let entries = list.as_array().ok_or(PersistError::NotASequence)?;
        let is_party = entries
            .iter()
            .all(|e| e.get("characterName").is_some() && e.get("characterType").is_some());
        let doc = if is_party {
            ImportedDocument::Party(serde_json::from_value(value)?)
        } else {
            ImportedDocument::Encounter(serde_json::from_value(value)?)
        };
        return Ok(doc);
    }

    if let Some(list) = value.get("combatants") {
        if !list.is_array() {
            return Err(PersistError::NotASequence);
        }
        return Ok(ImportedDocument::Encounter(serde_json::from_value(value)?));
    }

    Err(PersistError::UnrecognizedShape)
}

/// Read and parse a document from a file.
pub async fn load_document(path: impl AsRef<Path>) -> Result<ImportedDocument, PersistError> {
    let content = fs::read_to_string(&path).await?;
    let doc = import_document(&content)?;
    info!(path = %path.as_ref().display(), "encounter imported");
    Ok(doc)
}

// ============================================================================
// Auto-save naming
// ============================================================================

/// Auto-save file name: `<name>.r<round>.t<turn>.json`, with whitespace
/// runs in the encounter name collapsed to single underscores.
pub fn auto_save_file_name(encounter_name: &str, round: u32, turn: usize) -> String {
    let mut sanitized = String::with_capacity(encounter_name.len());
    let mut in_whitespace = false;
    for c in encounter_name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                sanitized.push('_');
            }
            in_whitespace = true;
        } else {
            sanitized.push(c);
            in_whitespace = false;
        }
    }
    format!("{sanitized}.r{round}.t{turn}.json")
}
