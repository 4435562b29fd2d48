//! Verb dispatcher (spec §4.F): resolves a parsed command's noun phrases
//! against accessible objects, runs the matching default verb handler, and
//! fires the catalogue `EventDef` the handler corresponds to so triggers can
//! react. One match arm per verb; each handler is a handful of lines since
//! the catalogue `ActionKind` tree does the heavy lifting that a per-verb
//! handler would otherwise need to hardcode.
//!
//! Layers 3–6 of spec §4.F ("direct-object hook", "indirect-object hook",
//! "room hook", "default handler") collapse into: run the built-in default
//! behavior for the verb, then let the resulting `EventDef` drive whatever
//! catalogue-authored reaction (trigger) wants to fire — there is no
//! separate per-object closure to consult first, since `ActionKind`/
//! `TriggerDef` already is the hook mechanism (see `action.rs`'s header).

use hollowgate_data::{EventDef, IngestMode, ItemAbility};

use crate::combat::{self, VillainProfile};
use crate::entity::{Container, ContainerState};
use crate::entity_search::{self, SearchScope};
use crate::error::GameError;
use crate::movement;
use crate::parser::{self, NounPhrase, ParsedCommand};
use crate::trigger;
use crate::world::World;

/// Directions recognized as bare verbs ("north", "n", ...) in addition to
/// "go north" / "walk north".
const DIRECTIONS: &[(&str, &str)] = &[
    ("north", "north"),
    ("n", "north"),
    ("south", "south"),
    ("s", "south"),
    ("east", "east"),
    ("e", "east"),
    ("west", "west"),
    ("w", "west"),
    ("northeast", "northeast"),
    ("ne", "northeast"),
    ("northwest", "northwest"),
    ("nw", "northwest"),
    ("southeast", "southeast"),
    ("se", "southeast"),
    ("southwest", "southwest"),
    ("sw", "southwest"),
    ("up", "up"),
    ("u", "up"),
    ("down", "down"),
    ("d", "down"),
    ("in", "in"),
    ("out", "out"),
];

fn canonical_direction(word: &str) -> Option<&'static str> {
    DIRECTIONS.iter().find(|(alias, _)| *alias == word).map(|(_, dir)| *dir)
}

#[derive(Debug, Default)]
pub struct StepOutcome {
    pub messages: Vec<String>,
    pub is_move: bool,
    pub quit: bool,
}

impl StepOutcome {
    fn say(mut self, line: impl Into<String>) -> Self {
        self.messages.push(line.into());
        self
    }
}

/// Handle one line of player input against `world`, returning the lines to
/// show and whether the command should advance the turn counter (spec
/// §4.K step 6; meta-verbs and failed parses don't).
pub fn dispatch(world: &mut World, input: &str, current_turn: u64) -> StepOutcome {
    let parsed = match parser::parse(input) {
        Ok(command) => command,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };

    match parsed {
        ParsedCommand::Quit => StepOutcome { messages: vec!["Goodbye.".into()], is_move: false, quit: true },
        ParsedCommand::Inventory => StepOutcome { messages: vec![describe_inventory(world)], is_move: true, quit: false },
        ParsedCommand::Look(_) => StepOutcome { messages: vec![describe_room(world)], is_move: true, quit: false },
        ParsedCommand::Help => StepOutcome::default().say("Try: look, take, drop, open, go <direction>, attack, inventory, quit."),
        ParsedCommand::Score => StepOutcome::default().say(format!("Your score is {} (in {} moves).", world.score, world.moves)),
        ParsedCommand::Diagnostics => StepOutcome::default().say(format!(
            "HP {}/{}, strength {}, deaths {}/{}.",
            world.winner.health.current_hp, world.winner.health.max_hp, world.winner.strength, world.deaths, world.max_deaths
        )),
        ParsedCommand::Undo => StepOutcome::default().say("Undo is handled by the session layer."),
        ParsedCommand::Again => StepOutcome::default().say("Again is handled by the session layer."),
        ParsedCommand::Save(_) | ParsedCommand::Restore(_) => {
            StepOutcome::default().say("Save/restore is handled by the session layer.")
        },
        ParsedCommand::Action { verb, direct, preposition, indirect } => {
            dispatch_action(world, &verb, direct, preposition, indirect, current_turn)
        },
    }
}

fn dispatch_action(
    world: &mut World,
    verb: &str,
    direct: Option<NounPhrase>,
    preposition: Option<String>,
    indirect: Option<NounPhrase>,
    _current_turn: u64,
) -> StepOutcome {
    if let Some(direction) = canonical_direction(verb).or_else(|| {
        if verb == "go" || verb == "walk" || verb == "run" {
            direct.as_ref().map(|np| np.search_text()).as_deref().and_then(canonical_direction)
        } else {
            None
        }
    }) {
        return do_move(world, direction);
    }

    let mut outcome = match verb {
        "look" | "l" | "x" | "examine" => do_examine(world, direct),
        "inventory" | "i" => StepOutcome::default().say(describe_inventory(world)),
        "take" | "get" => do_take(world, direct),
        "drop" => do_drop(world, direct),
        "put" => do_put(world, direct, preposition, indirect),
        "open" => do_open_close(world, direct, true),
        "close" => do_open_close(world, direct, false),
        "lock" => do_lock_unlock(world, direct, indirect, true),
        "unlock" => do_lock_unlock(world, direct, indirect, false),
        "attack" | "hit" | "kill" | "fight" => do_attack(world, direct, indirect),
        "give" => do_give(world, direct, indirect),
        "read" => do_read(world, direct),
        "turn" => do_turn(world, direct, preposition.as_deref()),
        "eat" => do_ingest(world, direct, IngestMode::Eat),
        "drink" => do_ingest(world, direct, IngestMode::Drink),
        "smell" | "sniff" | "inhale" => do_ingest(world, direct, IngestMode::Inhale),
        "wait" | "z" => StepOutcome { messages: vec!["Time passes.".into()], is_move: true, quit: false },
        "again" | "g" => StepOutcome::default().say("Nothing to repeat."),
        _ => StepOutcome::default().say(GameError::UnknownVerb(verb.to_string()).to_string()),
    };
    outcome.is_move = true;
    outcome
}

fn resolve(world: &World, noun: &Option<NounPhrase>, scope: SearchScope) -> Result<String, GameError> {
    let Some(noun) = noun else { return Err(GameError::NoMatch) };
    match noun {
        NounPhrase::All => Err(GameError::MultipleNotAllowed),
        NounPhrase::Described { .. } => {
            entity_search::find_item_match(world, &noun.search_text(), scope).map_err(|_| GameError::NoMatch)
        },
    }
}

fn describe_room(world: &World) -> String {
    let Ok(room) = world.current_room() else {
        return "You are nowhere.".to_string();
    };
    if !world.lit {
        return "It is pitch dark. You are likely to be eaten by a grue.".to_string();
    }
    let mut text = format!("{}\n{}", room.name, room.desc);
    let visible = crate::visibility::visible_in_room(world, &world.winner.here);
    for obj in visible {
        if world.object_room(&obj.id).as_deref() == Some(world.winner.here.as_str()) {
            text.push_str(&format!("\nThere is a {} here.", obj.name));
        }
    }
    text
}

fn describe_inventory(world: &World) -> String {
    let items = world.inventory();
    if items.is_empty() {
        return "You are carrying nothing.".to_string();
    }
    let names: Vec<String> = items.iter().map(|o| o.name.clone()).collect();
    format!("You are carrying:\n  {}", names.join("\n  "))
}

fn do_move(world: &mut World, direction: &str) -> StepOutcome {
    match movement::try_move(world, direction) {
        Ok(destination) => {
            let from_room = world.winner.here.clone();
            if movement::apply_move(world, &destination).is_err() {
                return StepOutcome::default().say("You can't go that way.");
            }
            let mut messages = vec![describe_room(world)];
            let turn = world.moves;
            let _ = trigger::check_triggers(
                world,
                &[EventDef::LeaveRoom { room: from_room }, EventDef::EnterRoom { room: destination }],
                turn,
            )
            .map(|fired| messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
            StepOutcome { messages, is_move: true, quit: false }
        },
        Err(err) => StepOutcome::default().say(err.to_string()),
    }
}

fn do_examine(world: &World, direct: Option<NounPhrase>) -> StepOutcome {
    match resolve(world, &direct, SearchScope::VisibleToPlayer) {
        Ok(id) => match world.object(&id) {
            Ok(obj) => StepOutcome::default().say(obj.text.clone().unwrap_or_else(|| obj.desc.clone())),
            Err(_) => StepOutcome::default().say(describe_room(world)),
        },
        Err(_) if direct.is_none() => StepOutcome::default().say(describe_room(world)),
        Err(err) => StepOutcome::default().say(err.to_string()),
    }
}

fn do_take(world: &mut World, direct: Option<NounPhrase>) -> StepOutcome {
    match resolve(world, &direct, SearchScope::TouchableInRoom) {
        Ok(id) => match world.move_object(&id, Container::Winner) {
            Ok(()) => {
                let name = world.object(&id).map(|o| o.name.clone()).unwrap_or(id.clone());
                let mut out = StepOutcome::default().say(format!("Taken: {name}."));
                let turn = world.moves;
                let _ = trigger::check_triggers(world, &[EventDef::TakeItem { item: id }], turn)
                    .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
                out
            },
            Err(_) => StepOutcome::default().say("You can't take that."),
        },
        Err(err) => StepOutcome::default().say(err.to_string()),
    }
}

fn do_drop(world: &mut World, direct: Option<NounPhrase>) -> StepOutcome {
    match resolve(world, &direct, SearchScope::Inventory) {
        Ok(id) => {
            let here = world.winner.here.clone();
            match world.move_object(&id, Container::Room(here)) {
                Ok(()) => {
                    let name = world.object(&id).map(|o| o.name.clone()).unwrap_or(id.clone());
                    let mut out = StepOutcome::default().say(format!("Dropped: {name}."));
                    let turn = world.moves;
                    let _ = trigger::check_triggers(world, &[EventDef::DropItem { item: id }], turn)
                        .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
                    out
                },
                Err(_) => StepOutcome::default().say("You can't drop that."),
            }
        },
        Err(err) => StepOutcome::default().say(err.to_string()),
    }
}

fn do_put(world: &mut World, direct: Option<NounPhrase>, preposition: Option<String>, indirect: Option<NounPhrase>) -> StepOutcome {
    if preposition.is_none() || indirect.is_none() {
        return StepOutcome::default().say("Put it where?");
    }
    let item = match resolve(world, &direct, SearchScope::Inventory) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    let container = match resolve(world, &indirect, SearchScope::NearbyVessels) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    let is_open = world.object(&container).ok().and_then(|o| o.container_state.as_ref()).map(|s| s.is_open()).unwrap_or(true);
    if !is_open {
        return StepOutcome::default().say(GameError::InClosedContainer(container).to_string());
    }
    match world.move_object(&item, Container::Object(container.clone())) {
        Ok(()) => {
            let mut out = StepOutcome::default().say("Done.");
            let turn = world.moves;
            let _ = trigger::check_triggers(world, &[EventDef::InsertItemInto { item, container }], turn)
                .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
            out
        },
        Err(_) => StepOutcome::default().say("You can't put that there."),
    }
}

fn do_open_close(world: &mut World, direct: Option<NounPhrase>, opening: bool) -> StepOutcome {
    let id = match resolve(world, &direct, SearchScope::TouchableToPlayer) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    let Ok(obj) = world.object_mut(&id) else {
        return StepOutcome::default().say("There's nothing like that here.");
    };
    let next = match obj.container_state.clone() {
        Some(ContainerState::Locked) | Some(ContainerState::TransparentLocked) if opening => {
            return StepOutcome::default().say("It's locked.");
        },
        Some(ContainerState::TransparentOpen) | Some(ContainerState::TransparentClosed) | Some(ContainerState::TransparentLocked) => {
            if opening { ContainerState::TransparentOpen } else { ContainerState::TransparentClosed }
        },
        Some(_) | None => {
            if opening { ContainerState::Open } else { ContainerState::Closed }
        },
    };
    obj.container_state = Some(next);
    let verb_event = if opening { EventDef::OpenItem { item: id.clone() } } else { EventDef::TouchItem { item: id.clone() } };
    let mut out = StepOutcome::default().say(if opening { "Opened." } else { "Closed." });
    let turn = world.moves;
    let _ = trigger::check_triggers(world, &[verb_event], turn)
        .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
    out
}

fn do_lock_unlock(world: &mut World, direct: Option<NounPhrase>, indirect: Option<NounPhrase>, locking: bool) -> StepOutcome {
    let target = match resolve(world, &direct, SearchScope::TouchableToPlayer) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    // Fine-grained "is this the right key" gating lives in catalogue-authored
    // triggers on UnlockItem; the dispatcher just needs some key in hand.
    if indirect.is_some() && entity_search::find_item_match(world, &indirect.unwrap().search_text(), SearchScope::Inventory).is_err() {
        return StepOutcome::default().say("You don't have that.");
    }
    let Ok(obj) = world.object_mut(&target) else {
        return StepOutcome::default().say("There's nothing like that here.");
    };
    obj.container_state = Some(if locking { ContainerState::Locked } else { ContainerState::Closed });
    let mut out = StepOutcome::default().say(if locking { "Locked." } else { "Unlocked." });
    let event = if locking { EventDef::TouchItem { item: target.clone() } } else { EventDef::UnlockItem { item: target } };
    let turn = world.moves;
    let _ = trigger::check_triggers(world, &[event], turn)
        .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
    out
}

fn do_attack(world: &mut World, direct: Option<NounPhrase>, weapon_phrase: Option<NounPhrase>) -> StepOutcome {
    let villain_id = match resolve(world, &direct, SearchScope::VisibleInRoom) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    let Ok(villain_obj) = world.object(&villain_id) else {
        return StepOutcome::default().say("There's nothing like that here.");
    };
    if !villain_obj.is_villain() {
        return StepOutcome::default().say("That doesn't seem like something you can fight.");
    }
    let weapon = weapon_phrase.and_then(|np| entity_search::find_item_match(world, &np.search_text(), SearchScope::Inventory).ok());
    let profile = VillainProfile { id: villain_id.clone(), best_weapon: None, best_adv: 2 };
    match combat::hero_blow(world, &profile, weapon) {
        Ok(report) => {
            let message = format!("You attack the {villain_id}: {:?}.", report.outcome);
            let mut out = StepOutcome::default().say(message);
            let villain_died = world.object(&villain_id).map(|o| o.strength == Some(0)).unwrap_or(true);
            if villain_died {
                world.winner.last_villain_fought = None;
                let turn = world.moves;
                let _ = trigger::check_triggers(world, &[EventDef::NpcDeath { npc: villain_id }], turn)
                    .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
            } else {
                world.winner.last_villain_fought = Some(villain_id);
            }
            out
        },
        Err(err) => StepOutcome::default().say(err.to_string()),
    }
}

fn do_give(world: &mut World, direct: Option<NounPhrase>, indirect: Option<NounPhrase>) -> StepOutcome {
    let item = match resolve(world, &direct, SearchScope::Inventory) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    let npc = match resolve(world, &indirect, SearchScope::VisibleInRoom) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    match world.move_object(&item, Container::Object(npc.clone())) {
        Ok(()) => {
            let mut out = StepOutcome::default().say("Given.");
            let turn = world.moves;
            let _ = trigger::check_triggers(world, &[EventDef::GiveToNpc { item, npc }], turn)
                .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
            out
        },
        Err(_) => StepOutcome::default().say("They won't take it."),
    }
}

fn do_read(world: &mut World, direct: Option<NounPhrase>) -> StepOutcome {
    let id = match resolve(world, &direct, SearchScope::TouchableToPlayer) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    if !world.lit {
        return StepOutcome::default().say(GameError::DarkRoom.to_string());
    }
    let can_read = world.object(&id).map(|o| o.flags.has(crate::flags::Flag::Read)).unwrap_or(false);
    if !can_read {
        return StepOutcome::default().say("There's nothing written on it.");
    }
    let text = world.object(&id).ok().and_then(|o| o.text.clone()).unwrap_or_else(|| "Nothing legible.".into());
    let mut out = StepOutcome::default().say(text);
    let turn = world.moves;
    let _ = trigger::check_triggers(world, &[EventDef::LookAtItem { item: id }], turn)
        .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
    out
}

/// Eat/drink/inhale are mechanically identical at this layer — resolve the
/// item, fire the matching `Ingest` event, and leave the actual effect (heal,
/// poison, remove the item) to a catalogue trigger reacting to it, the same
/// "push correctness to a declarative trigger" split `do_lock_unlock` uses.
fn do_ingest(world: &mut World, direct: Option<NounPhrase>, mode: IngestMode) -> StepOutcome {
    let id = match resolve(world, &direct, SearchScope::TouchableToPlayer) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    let verb = match mode {
        IngestMode::Eat => "eat",
        IngestMode::Drink => "drink",
        IngestMode::Inhale => "inhale",
    };
    let name = world.object(&id).map(|o| o.name.clone()).unwrap_or(id.clone());
    let mut out = StepOutcome::default().say(format!("You {verb} the {name}."));
    let turn = world.moves;
    let _ = trigger::check_triggers(world, &[EventDef::Ingest { item: id, mode }], turn)
        .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
    out
}

fn do_turn(world: &mut World, direct: Option<NounPhrase>, preposition: Option<&str>) -> StepOutcome {
    let id = match resolve(world, &direct, SearchScope::TouchableToPlayer) {
        Ok(id) => id,
        Err(err) => return StepOutcome::default().say(err.to_string()),
    };
    let turning_on = preposition != Some("off");
    let ability = if turning_on { ItemAbility::TurnOn } else { ItemAbility::TurnOff };
    let Ok(obj) = world.object_mut(&id) else {
        return StepOutcome::default().say("There's nothing like that here.");
    };
    obj.flags.toggle(crate::flags::Flag::On, turning_on);
    world.recompute_lit();
    let mut out = StepOutcome::default().say(if turning_on { "Turned on." } else { "Turned off." });
    let turn = world.moves;
    let _ = trigger::check_triggers(world, &[EventDef::UseItem { item: id, ability }], turn)
        .map(|fired| out.messages.extend(fired.into_iter().map(|n| format!("[{n}]"))));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Object, Room};
    use crate::flags::FlagSet;
    use crate::world::tests_support::bare_world;
    use std::collections::HashMap;

    fn world_with_room_and_item() -> World {
        let mut world = bare_world();
        world.rooms.insert(
            "start".into(),
            Room { id: "start".into(), name: "Start".into(), desc: "A bare room.".into(), visited: true, exits: HashMap::new(), flags: FlagSet::new() },
        );
        world.winner.here = "start".into();
        world.objects.insert(
            "lantern".into(),
            Object {
                id: "lantern".into(),
                name: "brass lantern".into(),
                desc: "A lantern.".into(),
                text: None,
                container: Container::Room("start".into()),
                flags: FlagSet::new(),
                container_state: None,
                strength: None,
                health: None,
                dialogue: Default::default(),
                npc_state: None,
                movement: None,
                wake_prob: None,
                synonyms: vec!["lamp".into()],
                adjectives: vec!["brass".into()],
            },
        );
        world
    }

    #[test]
    fn take_moves_object_into_inventory() {
        let mut world = world_with_room_and_item();
        let outcome = dispatch(&mut world, "take lantern", 0);
        assert!(outcome.messages[0].contains("Taken"));
        assert_eq!(world.object("lantern").unwrap().container, Container::Winner);
    }

    #[test]
    fn drop_moves_object_back_to_room() {
        let mut world = world_with_room_and_item();
        dispatch(&mut world, "take lantern", 0);
        let outcome = dispatch(&mut world, "drop lantern", 1);
        assert!(outcome.messages[0].contains("Dropped"));
        assert_eq!(world.object("lantern").unwrap().container, Container::Room("start".into()));
    }

    #[test]
    fn unknown_verb_reports_error() {
        let mut world = world_with_room_and_item();
        let outcome = dispatch(&mut world, "frobnicate lantern", 0);
        assert!(outcome.messages[0].contains("don't know the verb"));
    }

    #[test]
    fn quit_sets_quit_flag() {
        let mut world = world_with_room_and_item();
        let outcome = dispatch(&mut world, "quit", 0);
        assert!(outcome.quit);
    }

    #[test]
    fn eat_reports_action_without_requiring_the_item_be_held() {
        let mut world = world_with_room_and_item();
        let outcome = dispatch(&mut world, "eat lantern", 0);
        assert!(outcome.messages[0].contains("eat the brass lantern"));
    }
}
