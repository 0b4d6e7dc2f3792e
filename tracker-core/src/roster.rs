//! The combatant store: an ordered roster with a derived sort order.

use crate::combatant::{Combatant, CombatantId};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Ordered collection of combatants.
///
/// The order is re-derived after every add/remove/update: descending
/// initiative, ties keeping their prior relative order. Combatants whose
/// initiative has not been entered yet sort after all combatants with one.
///
/// The store performs no field validation; edits go through the
/// [`Combatant`](crate::combatant::Combatant) helpers before being handed
/// to [`update`](Roster::update).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    combatants: Vec<Combatant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster preserving the given order. Used when hydrating from
    /// an imported document or a round snapshot; the derived sort kicks in
    /// again at the next mutation.
    pub fn from_combatants(combatants: Vec<Combatant>) -> Self {
        Self { combatants }
    }

    /// Append a combatant and re-derive the sort order. Returns the id.
    pub fn add(&mut self, combatant: Combatant) -> CombatantId {
        let id = combatant.id;
        self.combatants.push(combatant);
        self.resort();
        id
    }

    /// Remove the combatant with the given id, if present.
    pub fn remove(&mut self, id: CombatantId) {
        self.combatants.retain(|c| c.id != id);
        self.resort();
    }

    /// Replace the entry matching `combatant.id` wholesale. Returns false
    /// when no entry matches.
    pub fn update(&mut self, combatant: Combatant) -> bool {
        let Some(slot) = self.combatants.iter_mut().find(|c| c.id == combatant.id) else {
            return false;
        };
        *slot = combatant;
        self.resort();
        true
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn get_index(&self, index: usize) -> Option<&Combatant> {
        self.combatants.get(index)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut Combatant> {
        self.combatants.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Combatant> {
        self.combatants.iter_mut()
    }

    pub fn as_slice(&self) -> &[Combatant] {
        &self.combatants
    }

    fn resort(&mut self) {
        self.combatants
            .sort_by_key(|c| (c.initiative.is_none(), Reverse(c.initiative.unwrap_or(0))));
    }
}
