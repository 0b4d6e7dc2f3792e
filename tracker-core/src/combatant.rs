//! Combatant data model and per-combatant combat rules.
//!
//! Contains the tracked record for one participant in the initiative order:
//! identity, classification, hit points, action economy, timed conditions and
//! tokens, death state, and legendary counters. Field-level validation lives
//! here in the `edit_*` helpers; the roster itself never validates.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================

/// Unique identifier for combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Classification of a combatant.
///
/// Mostly presentational. Environment suppresses state toggling and
/// Legendary enables the legendary action/resistance counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatantKind {
    #[serde(rename = "PC")]
    Pc,
    #[serde(rename = "NPC")]
    Npc,
    Enemy,
    Neutral,
    Environment,
    Legendary,
}

impl CombatantKind {
    pub fn name(&self) -> &'static str {
        match self {
            CombatantKind::Pc => "PC",
            CombatantKind::Npc => "NPC",
            CombatantKind::Enemy => "Enemy",
            CombatantKind::Neutral => "Neutral",
            CombatantKind::Environment => "Environment",
            CombatantKind::Legendary => "Legendary",
        }
    }
}

impl fmt::Display for CombatantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Life State
// ============================================================================

/// Life state of a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatantState {
    #[default]
    Alive,
    Ko,
    Stable,
    Dead,
}

impl CombatantState {
    pub fn label(&self) -> &'static str {
        match self {
            CombatantState::Alive => "Alive",
            CombatantState::Ko => "KO",
            CombatantState::Stable => "Stable",
            CombatantState::Dead => "Dead",
        }
    }
}

impl fmt::Display for CombatantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Conditions and Tokens
// ============================================================================

/// Remaining duration of a condition.
///
/// Serialized as a plain round count, or the sentinel `"P"` for permanent
/// conditions. Older exports stored already-decremented counts as strings;
/// those are accepted on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionDuration {
    /// Rounds remaining; decremented when the owner becomes active.
    Rounds(u32),
    /// Never decays.
    Permanent,
}

impl Serialize for ConditionDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConditionDuration::Rounds(rounds) => serializer.serialize_u32(*rounds),
            ConditionDuration::Permanent => serializer.serialize_str("P"),
        }
    }
}

impl<'de> Deserialize<'de> for ConditionDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(rounds) => Ok(ConditionDuration::Rounds(rounds)),
            Raw::Text(text) if text.eq_ignore_ascii_case("p") => Ok(ConditionDuration::Permanent),
            Raw::Text(text) => text
                .trim()
                .parse::<u32>()
                .map(ConditionDuration::Rounds)
                .map_err(|_| serde::de::Error::custom(format!("invalid duration {text:?}"))),
        }
    }
}

impl fmt::Display for ConditionDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionDuration::Rounds(rounds) => write!(f, "{rounds}"),
            ConditionDuration::Permanent => write!(f, "P"),
        }
    }
}

/// A named timed effect attached to a combatant, decaying once per full
/// round for its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub duration: ConditionDuration,
}

impl Condition {
    pub fn for_rounds(name: impl Into<String>, rounds: u32) -> Self {
        Self {
            name: name.into(),
            duration: ConditionDuration::Rounds(rounds),
        }
    }

    pub fn permanent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: ConditionDuration::Permanent,
        }
    }
}

/// A lighter-weight timed marker, decremented every time its owner becomes
/// active (finer granularity than conditions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub label: String,
    pub duration: u32,
}

impl Token {
    pub fn new(label: impl Into<String>, duration: u32) -> Self {
        Self {
            label: label.into(),
            duration,
        }
    }
}

// ============================================================================
// Death Saves
// ============================================================================

/// Death saving throw tallies tracked while a combatant is knocked out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSaves {
    pub successes: Vec<bool>,
    pub failures: Vec<bool>,
}

impl DeathSaves {
    pub fn clear(&mut self) {
        self.successes.clear();
        self.failures.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// One entry in the tracked initiative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    #[serde(default, deserialize_with = "wire::id_lenient")]
    pub id: CombatantId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CombatantKind,

    /// 0-99; `None` while initiative has not been entered yet.
    #[serde(default, deserialize_with = "wire::initiative_lenient")]
    pub initiative: Option<u8>,

    #[serde(default, deserialize_with = "wire::number_lenient")]
    pub current_hp: u32,
    #[serde(default, deserialize_with = "wire::number_lenient")]
    pub max_hp: u32,
    #[serde(default, deserialize_with = "wire::number_lenient")]
    pub temp_hp: u32,
    #[serde(default, deserialize_with = "wire::number_lenient")]
    pub ac: u32,

    // Action economy, reset every turn the combatant becomes active.
    #[serde(default)]
    pub action: bool,
    #[serde(default)]
    pub bonus_action: bool,
    #[serde(default)]
    pub reaction: bool,
    #[serde(default, deserialize_with = "wire::number_lenient")]
    pub current_movement: u32,
    #[serde(default, deserialize_with = "wire::number_lenient")]
    pub max_movement: u32,

    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub tokens: Vec<Token>,

    #[serde(default)]
    pub state: CombatantState,
    #[serde(default)]
    pub death_saves: DeathSaves,

    // Accumulated counters, never reset within an encounter.
    #[serde(default, deserialize_with = "wire::number_lenient")]
    pub turn_count: u32,
    #[serde(default, deserialize_with = "wire::number_lenient")]
    pub round_count: u32,
    #[serde(default, deserialize_with = "wire::seconds_lenient")]
    pub cumulative_turn_time: u64,

    // Only meaningful for Legendary combatants that are alive.
    #[serde(default)]
    pub legendary_actions: [bool; 3],
    #[serde(default)]
    pub legendary_resistances: [bool; 3],
}

impl Combatant {
    /// Create a combatant with the standard seeded defaults.
    pub fn new(name: impl Into<String>, kind: CombatantKind) -> Self {
        Self {
            id: CombatantId::new(),
            name: name.into(),
            kind,
            initiative: Some(10),
            current_hp: 10,
            max_hp: 10,
            temp_hp: 0,
            ac: 10,
            action: false,
            bonus_action: false,
            reaction: false,
            current_movement: 30,
            max_movement: 30,
            conditions: Vec::new(),
            tokens: Vec::new(),
            state: CombatantState::Alive,
            death_saves: DeathSaves::default(),
            turn_count: 0,
            round_count: 0,
            cumulative_turn_time: 0,
            legendary_actions: [false; 3],
            legendary_resistances: [false; 3],
        }
    }

    /// Set the initiative.
    pub fn with_initiative(mut self, initiative: u8) -> Self {
        self.initiative = Some(initiative.min(99));
        self
    }

    /// Set maximum hit points, filling current HP to the new maximum.
    pub fn with_hp(mut self, max_hp: u32) -> Self {
        self.max_hp = max_hp;
        self.current_hp = max_hp;
        self
    }

    /// Set the armor class.
    pub fn with_ac(mut self, ac: u32) -> Self {
        self.ac = ac.min(99);
        self
    }

    /// Set maximum movement, filling current movement to the new maximum.
    pub fn with_movement(mut self, max_movement: u32) -> Self {
        self.max_movement = max_movement;
        self.current_movement = max_movement;
        self
    }

    // ------------------------------------------------------------------
    // Edit helpers
    //
    // All range clamping and state coupling happens here, before the
    // record is handed to the roster.
    // ------------------------------------------------------------------

    /// Apply an initiative edit, clamped to 0-99. `None` marks initiative
    /// as not yet entered.
    pub fn edit_initiative(&mut self, value: Option<i64>) {
        self.initiative = value.map(|v| v.clamp(0, 99) as u8);
    }

    /// Apply an armor class edit, clamped to 0-99.
    pub fn edit_ac(&mut self, value: i64) {
        self.ac = value.clamp(0, 99) as u32;
    }

    /// Apply a current-HP edit.
    ///
    /// The value is clamped to `[0, max_hp]` and the life state is derived
    /// from it: dropping to zero knocks the combatant out (clearing death
    /// saves), while a positive value revives a KO/Dead combatant and a
    /// value above one revives a Stable one. Environment combatants keep
    /// their state regardless of HP.
    pub fn edit_current_hp(&mut self, value: i64) {
        self.current_hp = value.clamp(0, self.max_hp as i64) as u32;

        if self.kind == CombatantKind::Environment {
            return;
        }

        if value <= 0 && self.max_hp > 0 {
            self.state = CombatantState::Ko;
            self.death_saves.clear();
        } else if value > 0 {
            match self.state {
                CombatantState::Ko | CombatantState::Dead => {
                    self.state = CombatantState::Alive;
                }
                CombatantState::Stable if value > 1 => {
                    self.state = CombatantState::Alive;
                }
                _ => {}
            }
        }
    }

    /// Apply a max-HP edit, re-clamping current HP below the new maximum.
    pub fn edit_max_hp(&mut self, value: i64) {
        self.max_hp = value.max(0) as u32;
        self.current_hp = self.current_hp.min(self.max_hp);
    }

    /// Apply a life-state change, forcing the HP invariants that go with
    /// it. Environment combatants ignore state changes entirely.
    pub fn set_state(&mut self, state: CombatantState) {
        if self.kind == CombatantKind::Environment {
            return;
        }

        match state {
            CombatantState::Ko | CombatantState::Dead => {
                self.current_hp = 0;
                self.death_saves.clear();
            }
            CombatantState::Stable => {
                self.current_hp = 1;
            }
            CombatantState::Alive => {
                if self.current_hp == 0 {
                    self.current_hp = 1;
                }
            }
        }
        self.state = state;
    }

    // ------------------------------------------------------------------
    // Turn transitions
    // ------------------------------------------------------------------

    /// Reset for becoming the active combatant: fresh action economy and
    /// one step of condition/token decay. Reactions are not touched here;
    /// they reset encounter-wide at each round boundary.
    pub fn begin_turn(&mut self) {
        self.action = false;
        self.bonus_action = false;
        self.current_movement = self.max_movement;

        self.conditions.retain_mut(|condition| match condition.duration {
            ConditionDuration::Permanent => true,
            ConditionDuration::Rounds(rounds) => {
                let remaining = rounds.saturating_sub(1);
                condition.duration = ConditionDuration::Rounds(remaining);
                remaining > 0
            }
        });

        self.tokens.retain_mut(|token| {
            token.duration = token.duration.saturating_sub(1);
            token.duration > 0
        });
    }

    /// Account for the turn that just ended. The turn counter is capped at
    /// the current round so repeated forward/backward stepping cannot push
    /// counted turns past elapsed rounds.
    pub fn end_turn(&mut self, round: u32, turn_time: u64) {
        self.turn_count = (self.turn_count + 1).min(round);
        self.cumulative_turn_time += turn_time;
    }

    // ------------------------------------------------------------------
    // Conditions, tokens, legendary counters
    // ------------------------------------------------------------------

    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.iter().any(|c| c.name == name)
    }

    /// Whether the legendary counters apply to this combatant.
    pub fn legendary_active(&self) -> bool {
        self.kind == CombatantKind::Legendary && self.state == CombatantState::Alive
    }

    /// Toggle one legendary action slot. Returns false when the counters
    /// do not apply or the slot is out of range.
    pub fn toggle_legendary_action(&mut self, slot: usize) -> bool {
        if !self.legendary_active() || slot >= self.legendary_actions.len() {
            return false;
        }
        self.legendary_actions[slot] = !self.legendary_actions[slot];
        true
    }

    /// Toggle one legendary resistance slot. Returns false when the
    /// counters do not apply or the slot is out of range.
    pub fn toggle_legendary_resistance(&mut self, slot: usize) -> bool {
        if !self.legendary_active() || slot >= self.legendary_resistances.len() {
            return false;
        }
        self.legendary_resistances[slot] = !self.legendary_resistances[slot];
        true
    }
}

// ============================================================================
// Lenient wire decoding
// ============================================================================

/// Decoders tolerating the loose typing of older exports, where numeric
/// fields could arrive as strings, empty strings, or null, and ids could be
/// arbitrary numbers.
mod wire {
    use super::CombatantId;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }

    impl Raw {
        fn as_i64(&self) -> Option<i64> {
            match self {
                Raw::Num(n) if n.is_finite() => Some(*n as i64),
                Raw::Num(_) => None,
                Raw::Text(t) => t.trim().parse::<f64>().ok().map(|n| n as i64),
            }
        }
    }

    pub(super) fn number_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let value = Option::<Raw>::deserialize(d)?
            .and_then(|raw| raw.as_i64())
            .unwrap_or(0);
        Ok(value.clamp(0, u32::MAX as i64) as u32)
    }

    pub(super) fn seconds_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let value = Option::<Raw>::deserialize(d)?
            .and_then(|raw| raw.as_i64())
            .unwrap_or(0);
        Ok(value.max(0) as u64)
    }

    pub(super) fn initiative_lenient<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<u8>, D::Error> {
        let value = Option::<Raw>::deserialize(d)?.and_then(|raw| raw.as_i64());
        Ok(value.map(|v| v.clamp(0, 99) as u8))
    }

    /// Uuid ids pass through; legacy numeric ids (and anything else) are
    /// re-keyed with a fresh id, matching how older imports re-keyed
    /// records that lacked one.
    pub(super) fn id_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<CombatantId, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Uuid(uuid::Uuid),
            Other(serde_json::Value),
        }

        Ok(match Option::<RawId>::deserialize(d)? {
            Some(RawId::Uuid(uuid)) => CombatantId(uuid),
            _ => CombatantId::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ko_forces_zero_hp_and_clears_saves() {
        let mut combatant = Combatant::new("Grak", CombatantKind::Enemy).with_hp(20);
        combatant.death_saves.successes.push(true);
        combatant.death_saves.failures.push(true);

        combatant.set_state(CombatantState::Ko);

        assert_eq!(combatant.current_hp, 0);
        assert!(combatant.death_saves.is_empty());
        assert_eq!(combatant.state, CombatantState::Ko);
    }

    #[test]
    fn test_stable_forces_one_hp() {
        let mut combatant = Combatant::new("Grak", CombatantKind::Enemy).with_hp(20);
        combatant.set_state(CombatantState::Stable);
        assert_eq!(combatant.current_hp, 1);
    }

    #[test]
    fn test_alive_from_zero_hp_sets_one() {
        let mut combatant = Combatant::new("Grak", CombatantKind::Enemy).with_hp(20);
        combatant.set_state(CombatantState::Dead);
        assert_eq!(combatant.current_hp, 0);

        combatant.set_state(CombatantState::Alive);
        assert_eq!(combatant.current_hp, 1);
    }

    #[test]
    fn test_environment_ignores_state_changes() {
        let mut hazard = Combatant::new("Collapsing Ceiling", CombatantKind::Environment);
        hazard.set_state(CombatantState::Dead);
        assert_eq!(hazard.state, CombatantState::Alive);
        assert_eq!(hazard.current_hp, 10);
    }

    #[test]
    fn test_hp_edit_clamps_and_derives_state() {
        let mut combatant = Combatant::new("Mira", CombatantKind::Pc).with_hp(12);

        combatant.edit_current_hp(50);
        assert_eq!(combatant.current_hp, 12);

        combatant.edit_current_hp(-5);
        assert_eq!(combatant.current_hp, 0);
        assert_eq!(combatant.state, CombatantState::Ko);
        assert!(combatant.death_saves.is_empty());

        combatant.edit_current_hp(3);
        assert_eq!(combatant.state, CombatantState::Alive);
    }

    #[test]
    fn test_hp_edit_stable_revives_only_above_one() {
        let mut combatant = Combatant::new("Mira", CombatantKind::Pc).with_hp(12);
        combatant.set_state(CombatantState::Stable);

        combatant.edit_current_hp(1);
        assert_eq!(combatant.state, CombatantState::Stable);

        combatant.edit_current_hp(2);
        assert_eq!(combatant.state, CombatantState::Alive);
    }

    #[test]
    fn test_max_hp_edit_reclamps_current() {
        let mut combatant = Combatant::new("Mira", CombatantKind::Pc).with_hp(12);
        combatant.edit_max_hp(8);
        assert_eq!(combatant.max_hp, 8);
        assert_eq!(combatant.current_hp, 8);
    }

    #[test]
    fn test_initiative_edit_clamps_to_range() {
        let mut combatant = Combatant::new("Mira", CombatantKind::Pc);
        combatant.edit_initiative(Some(150));
        assert_eq!(combatant.initiative, Some(99));
        combatant.edit_initiative(Some(-3));
        assert_eq!(combatant.initiative, Some(0));
        combatant.edit_initiative(None);
        assert_eq!(combatant.initiative, None);
    }

    #[test]
    fn test_begin_turn_resets_economy_and_decays() {
        let mut combatant = Combatant::new("Mira", CombatantKind::Pc).with_movement(25);
        combatant.action = true;
        combatant.bonus_action = true;
        combatant.reaction = true;
        combatant.current_movement = 5;
        combatant.add_condition(Condition::for_rounds("Poisoned", 2));
        combatant.add_condition(Condition::for_rounds("Stunned", 1));
        combatant.add_condition(Condition::permanent("Cursed"));
        combatant.add_token(Token::new("Bless", 1));

        combatant.begin_turn();

        assert!(!combatant.action);
        assert!(!combatant.bonus_action);
        assert!(combatant.reaction, "reactions reset per round, not per turn");
        assert_eq!(combatant.current_movement, 25);
        assert_eq!(combatant.conditions.len(), 2);
        assert!(combatant.has_condition("Poisoned"));
        assert!(combatant.has_condition("Cursed"));
        assert!(!combatant.has_condition("Stunned"));
        assert!(combatant.tokens.is_empty());
    }

    #[test]
    fn test_end_turn_caps_turn_count_at_round() {
        let mut combatant = Combatant::new("Mira", CombatantKind::Pc);
        combatant.end_turn(1, 10);
        combatant.end_turn(1, 5);
        assert_eq!(combatant.turn_count, 1);
        assert_eq!(combatant.cumulative_turn_time, 15);

        combatant.end_turn(3, 0);
        assert_eq!(combatant.turn_count, 2);
    }

    #[test]
    fn test_legendary_counters_gated_on_kind_and_state() {
        let mut dragon = Combatant::new("Ancient Wyrm", CombatantKind::Legendary).with_hp(200);
        assert!(dragon.toggle_legendary_action(0));
        assert!(dragon.legendary_actions[0]);
        assert!(!dragon.toggle_legendary_action(3));

        dragon.set_state(CombatantState::Ko);
        assert!(!dragon.toggle_legendary_resistance(0));

        let mut goblin = Combatant::new("Goblin", CombatantKind::Enemy);
        assert!(!goblin.toggle_legendary_action(0));
    }

    #[test]
    fn test_condition_duration_wire_format() {
        let permanent: ConditionDuration = serde_json::from_str("\"P\"").unwrap();
        assert_eq!(permanent, ConditionDuration::Permanent);

        let rounds: ConditionDuration = serde_json::from_str("3").unwrap();
        assert_eq!(rounds, ConditionDuration::Rounds(3));

        // Older exports stored decremented durations as strings.
        let legacy: ConditionDuration = serde_json::from_str("\"2\"").unwrap();
        assert_eq!(legacy, ConditionDuration::Rounds(2));

        assert_eq!(
            serde_json::to_string(&ConditionDuration::Permanent).unwrap(),
            "\"P\""
        );
        assert_eq!(
            serde_json::to_string(&ConditionDuration::Rounds(4)).unwrap(),
            "4"
        );
    }

    #[test]
    fn test_lenient_combatant_decoding() {
        let json = r#"{
            "id": 1717171717.42,
            "name": "Old Import",
            "type": "NPC",
            "initiative": "",
            "currentHp": "7",
            "maxHp": 10
        }"#;

        let combatant: Combatant = serde_json::from_str(json).unwrap();
        assert_eq!(combatant.name, "Old Import");
        assert_eq!(combatant.kind, CombatantKind::Npc);
        assert_eq!(combatant.initiative, None);
        assert_eq!(combatant.current_hp, 7);
        assert_eq!(combatant.max_hp, 10);
        assert_eq!(combatant.state, CombatantState::Alive);
        assert!(combatant.death_saves.is_empty());
        assert!(combatant.conditions.is_empty());
        assert!(combatant.tokens.is_empty());
        assert_eq!(combatant.turn_count, 0);
    }
}
