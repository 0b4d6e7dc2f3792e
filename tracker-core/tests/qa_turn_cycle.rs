//! QA tests for the turn/round cycle: cycle closure, snapshot rewind,
//! condition decay, and the roster/HP invariants.

use proptest::prelude::*;
use tracker_core::{
    Combatant, CombatantKind, Condition, ConditionDuration, Encounter, Roster, Token,
};

fn encounter_of(initiatives: &[u8]) -> Encounter {
    let mut encounter = Encounter::new("QA Encounter");
    for (i, initiative) in initiatives.iter().enumerate() {
        encounter.roster.add(
            Combatant::new(format!("c{i}"), CombatantKind::Npc).with_initiative(*initiative),
        );
    }
    encounter
}

#[test]
fn reverse_after_advance_restores_index() {
    let mut encounter = encounter_of(&[20, 15, 10]);
    encounter.advance_turn();
    assert_eq!(encounter.active_index, 1);

    encounter.reverse_turn();
    assert_eq!(encounter.active_index, 0);
    assert_eq!(encounter.round, 1);
}

#[test]
fn reverse_across_round_boundary_restores_exact_roster() {
    let mut encounter = encounter_of(&[20, 15]);
    {
        let top = encounter.roster.get_index_mut(0).unwrap();
        top.add_condition(Condition::for_rounds("Restrained", 2));
        top.add_token(Token::new("Hex", 1));
        top.action = true;
    }

    // Walk to the last turn of round 1 and capture the state the wrap
    // will snapshot.
    encounter.advance_turn();
    let before_wrap: Vec<Combatant> = encounter.roster.as_slice().to_vec();
    let index_before_wrap = encounter.active_index;

    encounter.advance_turn();
    assert_eq!(encounter.round, 2);

    encounter.reverse_turn();
    assert_eq!(encounter.round, 1);
    assert_eq!(encounter.active_index, index_before_wrap);
    assert_eq!(encounter.roster.as_slice(), before_wrap.as_slice());
}

#[test]
fn condition_survives_three_owner_activations() {
    // Single combatant, so every advance activates the owner.
    let mut encounter = encounter_of(&[10]);
    encounter
        .roster
        .get_index_mut(0)
        .unwrap()
        .add_condition(Condition::for_rounds("Blinded", 3));

    encounter.advance_turn();
    encounter.advance_turn();
    let owner = encounter.roster.get_index(0).unwrap();
    assert!(owner.has_condition("Blinded"), "present through activation 2");
    assert_eq!(owner.conditions[0].duration, ConditionDuration::Rounds(1));

    encounter.advance_turn();
    let owner = encounter.roster.get_index(0).unwrap();
    assert!(
        !owner.has_condition("Blinded"),
        "absent once the third activation has consumed it"
    );
}

#[test]
fn permanent_condition_never_decays() {
    let mut encounter = encounter_of(&[10]);
    encounter
        .roster
        .get_index_mut(0)
        .unwrap()
        .add_condition(Condition::permanent("Cursed"));

    for _ in 0..10 {
        encounter.advance_turn();
    }
    assert!(encounter.roster.get_index(0).unwrap().has_condition("Cursed"));
}

#[test]
fn ties_keep_relative_order_through_updates() {
    let mut roster = Roster::new();
    let first = roster.add(Combatant::new("First", CombatantKind::Pc).with_initiative(12));
    roster.add(Combatant::new("Second", CombatantKind::Pc).with_initiative(12));
    roster.add(Combatant::new("Third", CombatantKind::Pc).with_initiative(12));

    let mut edited = roster.get(first).unwrap().clone();
    edited.name = "First (renamed)".to_string();
    assert!(roster.update(edited));

    let names: Vec<_> = roster.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["First (renamed)", "Second", "Third"]);
}

proptest! {
    #[test]
    fn full_cycles_return_to_start_and_bump_round(
        initiatives in proptest::collection::vec(0u8..100, 1..8),
        cycles in 1u32..4,
    ) {
        let mut encounter = encounter_of(&initiatives);
        let len = encounter.roster.len() as u32;

        for _ in 0..(len * cycles) {
            encounter.advance_turn();
        }

        prop_assert_eq!(encounter.active_index, 0);
        prop_assert_eq!(encounter.round, 1 + cycles);
    }

    #[test]
    fn hp_edit_sequences_preserve_the_clamp_invariant(
        max_hp in 1u32..200,
        edits in proptest::collection::vec(-100i64..400, 1..40),
    ) {
        let mut combatant = Combatant::new("Subject", CombatantKind::Pc).with_hp(max_hp);
        for edit in edits {
            combatant.edit_current_hp(edit);
            prop_assert!(combatant.current_hp <= combatant.max_hp);
        }
    }

    #[test]
    fn roster_order_is_non_increasing_after_every_add(
        initiatives in proptest::collection::vec(0u8..100, 1..12),
    ) {
        let mut roster = Roster::new();
        for (i, initiative) in initiatives.iter().enumerate() {
            roster.add(
                Combatant::new(format!("c{i}"), CombatantKind::Npc)
                    .with_initiative(*initiative),
            );
            let order: Vec<u8> = roster.iter().map(|c| c.initiative.unwrap()).collect();
            prop_assert!(order.windows(2).all(|pair| pair[0] >= pair[1]));
        }
    }
}
