//! Named daemon handlers (spec §4.H): the concrete recurring effects the
//! catalogue can register besides a literal `scheduleIn`/`scheduleOn`
//! action batch — lantern fuel, candle/match burn-down, the reservoir,
//! the maintenance-room flood, the cyclops's sleep cycle, the thief's
//! wandering theft, the songbird, and the sword's villain-proximity glow.
//!
//! A daemon's scheduled name is `"<kind>:<target-id>"`; `run_named_daemon`
//! splits on the first `:` and dispatches on `<kind>`. Turn counters use
//! `World::advance_flag`'s `Sequence` bookkeeping (the same counter
//! discipline invariant I6 requires elsewhere) keyed by the target id, so
//! two lanterns burn down independently.

use anyhow::{Result, bail};

use crate::entity::Container;
use crate::flags::Flag;
use crate::world::World;

/// Turns a full lantern battery lasts before it needs changing.
const LANTERN_FUEL_TURNS: u8 = 100;
/// Turns remaining at which the player gets a low-fuel warning.
const LANTERN_WARNING_AT: u8 = 10;
const CANDLE_FUEL_TURNS: u8 = 40;
const MATCH_FUEL_TURNS: u8 = 2;

pub fn run_named_daemon(world: &mut World, raw_name: &str, messages: &mut Vec<String>) -> Result<()> {
    let (kind, target) = raw_name.split_once(':').unwrap_or((raw_name, ""));
    match kind {
        "lantern-fuel" => burn_down(world, target, LANTERN_FUEL_TURNS, messages, "the lantern"),
        "candle-burn" => burn_down(world, target, CANDLE_FUEL_TURNS, messages, "the candles"),
        "match-burn" => burn_down(world, target, MATCH_FUEL_TURNS, messages, "the match"),
        "reservoir-fill" => reservoir_fill(world, messages),
        "reservoir-drain" => reservoir_drain(world, messages),
        "maintenance-flood" => maintenance_flood(world, messages),
        "cyclops-cycle" => cyclops_cycle(world, target, messages),
        "thief-wander" => thief_wander(world, target, messages),
        "songbird" => songbird(world, messages),
        "sword-glow" => sword_glow(world, target, messages),
        other => bail!("unknown daemon kind '{other}'"),
    }
}

/// Shared logic for every flame-or-battery light source: advance the
/// target's fuel counter, warn near the end, and extinguish it once spent
/// (I-LANTERN, I-CANDLES, I-MATCH). A spent match or candle is consumed
/// outright; a spent lantern just goes dark, since its battery can be
/// swapped by catalogue-authored actions elsewhere.
fn burn_down(world: &mut World, target: &str, fuel_turns: u8, messages: &mut Vec<String>, label: &str) -> Result<()> {
    let Ok(obj) = world.object(target) else { return Ok(()) };
    if !obj.flags.has(Flag::Light) || !obj.flags.has(Flag::On) {
        world.remove_flag(&fuel_flag_name(target));
        return Ok(());
    }
    let flag_name = fuel_flag_name(target);
    world.advance_flag(&flag_name, fuel_turns);
    let Some(progress) = world.flag(&flag_name) else { return Ok(()) };
    let crate::world::WorldFlag::Sequence { step, end } = progress else { return Ok(()) };
    let remaining = end.saturating_sub(*step);
    if remaining == LANTERN_WARNING_AT {
        messages.push(format!("You'd better start looking for a new light source soon — {label} is getting dim."));
    }
    if remaining == 0 {
        world.remove_flag(&flag_name);
        let Ok(obj) = world.object_mut(target) else { return Ok(()) };
        obj.flags.unset(Flag::On);
        messages.push(format!("{label} has gone out.", label = capitalize(label)));
        if fuel_turns == MATCH_FUEL_TURNS || fuel_turns == CANDLE_FUEL_TURNS {
            let _ = world.move_object(target, Container::Limbo);
        }
    }
    Ok(())
}

fn fuel_flag_name(target: &str) -> String {
    format!("{target}-fuel")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// I-RFILL: the dam is raising the reservoir's water level.
fn reservoir_fill(world: &mut World, messages: &mut Vec<String>) -> Result<()> {
    if world.flag("reservoir-full").is_some() {
        return Ok(());
    }
    world.set_flag_simple("reservoir-full");
    world.remove_flag("reservoir-empty");
    messages.push("You hear the sound of rushing water nearby.".to_string());
    Ok(())
}

/// I-REMPTY: the dam is lowering the reservoir's water level.
fn reservoir_drain(world: &mut World, messages: &mut Vec<String>) -> Result<()> {
    if world.flag("reservoir-empty").is_some() {
        return Ok(());
    }
    world.set_flag_simple("reservoir-empty");
    world.remove_flag("reservoir-full");
    messages.push("The water level is receding, and the sound of rushing water fades.".to_string());
    Ok(())
}

/// I-MAINT-ROOM: the reservoir filling over the dam eventually floods the
/// low-lying maintenance room.
fn maintenance_flood(world: &mut World, messages: &mut Vec<String>) -> Result<()> {
    if world.flag("reservoir-full").is_none() || world.flag("maintenance-flooded").is_some() {
        return Ok(());
    }
    world.set_flag_simple("maintenance-flooded");
    messages.push("Water is pouring in from the direction of the reservoir!".to_string());
    Ok(())
}

/// Cyclops anger/sleep cycle: reuses the same strength-sign convention
/// combat uses for unconscious villains (negative = asleep) so the combat
/// daemon and `tick_awakening` keep working on a cyclops exactly as they
/// would on a knocked-out villain.
fn cyclops_cycle(world: &mut World, target: &str, messages: &mut Vec<String>) -> Result<()> {
    let Ok(obj) = world.object_mut(target) else { return Ok(()) };
    let strength = obj.strength.unwrap_or(0);
    if strength > 0 {
        obj.strength = Some(-strength);
        messages.push("The cyclops's eyelids grow heavy, and it slumps over, snoring.".to_string());
    } else if strength < 0 {
        obj.strength = Some(-strength);
        messages.push("The cyclops wakes with a roar!".to_string());
    }
    Ok(())
}

/// Thief wandering/theft: each tick, a 1-in-3 chance the thief pockets one
/// takeable item from its current room before moving on (actual movement
/// is handled by the NPC's own `Movement` component, not this daemon).
fn thief_wander(world: &mut World, target: &str, messages: &mut Vec<String>) -> Result<()> {
    let Ok(thief) = world.object(target) else { return Ok(()) };
    if thief.strength.unwrap_or(1) <= 0 {
        return Ok(());
    }
    let Container::Room(room) = thief.container.clone() else { return Ok(()) };
    if !world.rng.chance_percent(33.0) {
        return Ok(());
    }
    let loot: Vec<String> = world
        .objects
        .values()
        .filter(|o| o.container.is_room(&room) && o.flags.has(Flag::Take) && o.id != target)
        .map(|o| o.id.clone())
        .collect();
    let Some(item) = world.rng.choose(&loot).cloned() else { return Ok(()) };
    if world.move_object(&item, Container::Object(target.to_string())).is_ok() {
        messages.push("You glimpse a shadowy figure pocketing something nearby.".to_string());
    }
    Ok(())
}

/// One-shot ambient flavor: the songbird sings once, the first time its
/// daemon fires, and never again.
fn songbird(world: &mut World, messages: &mut Vec<String>) -> Result<()> {
    if world.flag("heard-songbird").is_some() {
        return Ok(());
    }
    world.set_flag_simple("heard-songbird");
    messages.push("A songbird trills somewhere in the branches above.".to_string());
    Ok(())
}

/// Sword-glow indicator: the named sword glows while a villain shares the
/// player's room, and the glow fades once none remain.
fn sword_glow(world: &mut World, target: &str, messages: &mut Vec<String>) -> Result<()> {
    let here = world.winner.here.clone();
    let villain_nearby = world.objects.values().any(|o| o.container.is_room(&here) && o.is_villain() && o.strength.unwrap_or(0) > 0);
    let was_glowing = world.flag("sword-glowing").is_some();
    if villain_nearby && !was_glowing {
        world.set_flag_simple("sword-glowing");
        let name = world.object(target).map(|o| o.name.clone()).unwrap_or_else(|_| "sword".to_string());
        messages.push(format!("Your {name} is glowing with a faint blue light!"));
    } else if !villain_nearby && was_glowing {
        world.remove_flag("sword-glowing");
        messages.push("Your sword's glow has vanished.".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Container, Object};
    use crate::flags::FlagSet;
    use crate::world::tests_support::bare_world;

    fn lantern(world: &mut World, on: bool) {
        let mut flags = FlagSet::new();
        flags.set(Flag::Light);
        if on {
            flags.set(Flag::On);
        }
        world.objects.insert(
            "lamp".into(),
            Object {
                id: "lamp".into(),
                name: "brass lantern".into(),
                desc: String::new(),
                text: None,
                container: Container::Winner,
                flags,
                container_state: None,
                strength: None,
                health: None,
                dialogue: Default::default(),
                npc_state: None,
                movement: None,
                wake_prob: None,
                synonyms: Vec::new(),
                adjectives: Vec::new(),
            },
        );
    }

    #[test]
    fn lantern_fuel_burns_out_after_its_full_duration() {
        let mut world = bare_world();
        lantern(&mut world, true);
        let mut messages = Vec::new();
        for _ in 0..LANTERN_FUEL_TURNS {
            run_named_daemon(&mut world, "lantern-fuel:lamp", &mut messages).unwrap();
        }
        assert!(!world.object("lamp").unwrap().flags.has(Flag::On));
        assert!(messages.iter().any(|m| m.contains("gone out")));
    }

    #[test]
    fn lantern_fuel_is_silent_while_switched_off() {
        let mut world = bare_world();
        lantern(&mut world, false);
        let mut messages = Vec::new();
        run_named_daemon(&mut world, "lantern-fuel:lamp", &mut messages).unwrap();
        assert!(world.flag("lamp-fuel").is_none());
        assert!(messages.is_empty());
    }

    #[test]
    fn songbird_sings_once() {
        let mut world = bare_world();
        let mut messages = Vec::new();
        run_named_daemon(&mut world, "songbird", &mut messages).unwrap();
        run_named_daemon(&mut world, "songbird", &mut messages).unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn cyclops_cycle_toggles_strength_sign() {
        let mut world = bare_world();
        world.objects.insert(
            "cyclops".into(),
            Object {
                id: "cyclops".into(),
                name: "cyclops".into(),
                desc: String::new(),
                text: None,
                container: Container::Room("start".into()),
                flags: FlagSet::from_iter([Flag::Actor]),
                container_state: None,
                strength: Some(10),
                health: None,
                dialogue: Default::default(),
                npc_state: None,
                movement: None,
                wake_prob: None,
                synonyms: Vec::new(),
                adjectives: Vec::new(),
            },
        );
        let mut messages = Vec::new();
        run_named_daemon(&mut world, "cyclops-cycle:cyclops", &mut messages).unwrap();
        assert_eq!(world.object("cyclops").unwrap().strength, Some(-10));
        run_named_daemon(&mut world, "cyclops-cycle:cyclops", &mut messages).unwrap();
        assert_eq!(world.object("cyclops").unwrap().strength, Some(10));
    }
}
