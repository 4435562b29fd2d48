//! Trigger evaluation: each turn, the events that just happened (an entry
//! taken, a room entered, an item examined) are checked against the
//! catalogue's `TriggerDef` list, and matching triggers fire their action
//! batch. Catalogue `EventDef` tokens are matched against the turn's event
//! list directly; the ongoing/ambient half of condition-checking lives in
//! `action::eval_condition` rather than a separate method on the trigger
//! itself.

use anyhow::Result;
use hollowgate_data::{ActionDef, EventDef, TriggerDef};
use log::info;
use serde::{Deserialize, Serialize};

use crate::action::{eval_condition, execute_action};
use crate::world::World;

/// Runtime wrapper pairing a catalogue trigger with its one-shot "has this
/// already fired" bit, which the catalogue itself doesn't carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRuntime {
    pub def: TriggerDef,
    pub fired: bool,
}

impl From<TriggerDef> for TriggerRuntime {
    fn from(def: TriggerDef) -> Self {
        Self { def, fired: false }
    }
}

fn event_matches(trigger_event: &EventDef, events: &[EventDef]) -> bool {
    matches!(trigger_event, EventDef::Always) || events.iter().any(|e| e == trigger_event)
}

/// Check every still-live trigger against the events that occurred this
/// step, fire the ones whose event token matches and whose condition tree
/// holds, and return the names of the triggers that fired (for logging and
/// for the death-trigger re-check the turn loop performs after `jigs_up`).
pub fn check_triggers(world: &mut World, events: &[EventDef], current_turn: u64) -> Result<Vec<String>> {
    let to_fire: Vec<usize> = world
        .triggers
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.fired || !t.def.only_once)
        .filter(|(_, t)| event_matches(&t.def.event, events))
        .map(|(i, _)| i)
        .collect();

    let mut fired_names = Vec::new();
    for idx in to_fire {
        let condition = world.triggers[idx].def.conditions.clone();
        if !eval_condition(world, &condition) {
            continue;
        }
        let trigger = &mut world.triggers[idx];
        if trigger.def.only_once {
            trigger.fired = true;
        }
        let name = trigger.def.name.clone();
        let actions: Vec<ActionDef> = trigger.def.actions.clone();
        info!("trigger fired: {name}");
        for action in &actions {
            execute_action(world, action, current_turn)?;
        }
        fired_names.push(name);
    }
    Ok(fired_names)
}

/// Ambient triggers are authored as `Always` events gated by an
/// `Ambient { spinner, rooms }` condition; they're checked every step
/// regardless of what the player just did, matching spec §4.H's "ambient
/// flavor" daemon category.
pub fn check_ambient_triggers(world: &mut World, current_turn: u64) -> Result<Vec<String>> {
    check_triggers(world, &[EventDef::Always], current_turn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests_support::bare_world;
    use hollowgate_data::{ActionKind, ConditionDef, ConditionExpr};

    fn award_trigger(event: EventDef, only_once: bool) -> TriggerRuntime {
        TriggerRuntime::from(TriggerDef {
            name: "test-trigger".into(),
            note: None,
            only_once,
            event,
            conditions: ConditionExpr::default(),
            actions: vec![ActionDef { action: ActionKind::AwardPoints { amount: 1, reason: "t".into() }, priority: None }],
        })
    }

    #[test]
    fn matching_event_fires_trigger_once() {
        let mut world = bare_world();
        world.triggers.push(award_trigger(EventDef::TakeItem { item: "lantern".into() }, true));
        let fired = check_triggers(&mut world, &[EventDef::TakeItem { item: "lantern".into() }], 0).unwrap();
        assert_eq!(fired, vec!["test-trigger".to_string()]);
        assert_eq!(world.score, 1);

        let fired_again = check_triggers(&mut world, &[EventDef::TakeItem { item: "lantern".into() }], 1).unwrap();
        assert!(fired_again.is_empty());
        assert_eq!(world.score, 1);
    }

    #[test]
    fn non_matching_event_does_not_fire() {
        let mut world = bare_world();
        world.triggers.push(award_trigger(EventDef::TakeItem { item: "lantern".into() }, false));
        let fired = check_triggers(&mut world, &[EventDef::DropItem { item: "lantern".into() }], 0).unwrap();
        assert!(fired.is_empty());
        assert_eq!(world.score, 0);
    }

    #[test]
    fn gated_trigger_waits_for_condition() {
        let mut world = bare_world();
        let mut trigger = award_trigger(EventDef::EnterRoom { room: "cellar".into() }, false);
        trigger.def.conditions = ConditionExpr::Pred(ConditionDef::HasFlag { flag: "lamp-on".into() });
        world.triggers.push(trigger);

        let events = [EventDef::EnterRoom { room: "cellar".into() }];
        assert!(check_triggers(&mut world, &events, 0).unwrap().is_empty());
        world.set_flag_simple("lamp-on");
        assert_eq!(check_triggers(&mut world, &events, 1).unwrap(), vec!["test-trigger".to_string()]);
    }
}
