//! Exit resolution and room-transition side effects (spec §4.G).
//!
//! `Exit` is a tagged union rather than one flat struct with optional
//! fields: flag-gating lives in `Conditional`'s `flag` arm instead of as
//! separate booleans checked by every caller.

use anyhow::{Result, anyhow};

use crate::entity::{Container, Exit};
use crate::error::GameError;
use crate::world::World;

pub enum ExitFunction {
    /// The maze-diode case: destination depends on how the maze was
    /// entered rather than being a fixed token. The catalogue supplies a
    /// lookup table keyed by `(room, entered_from_direction)`.
    MazeDiode,
}

pub fn resolve_function(name: &str) -> Option<ExitFunction> {
    match name {
        "maze-diode" => Some(ExitFunction::MazeDiode),
        _ => None,
    }
}

/// Attempt to move the player in `direction` from the current room.
/// Returns the destination on success, or a `GameError::Precondition` with
/// the exit's specific refusal message otherwise.
pub fn try_move(world: &mut World, direction: &str) -> Result<String, GameError> {
    let here = world.winner.here.clone();
    let exit = {
        let room = world.room(&here).map_err(|e| GameError::Fatal(e.to_string()))?;
        room.exits
            .get(direction)
            .cloned_exit()
            .ok_or_else(|| GameError::Precondition(format!("You can't go {direction} from here.")))?
    };

    match exit {
        Exit::Direct { to } => Ok(to),
        Exit::Blocked { message } => Err(GameError::Precondition(message)),
        Exit::Conditional { to, flag, message } => {
            if world.flag(&flag).is_some() {
                Ok(to)
            } else {
                Err(GameError::Precondition(message))
            }
        },
        Exit::Door { to, door } => {
            let door_obj = world.object(&door).map_err(|e| GameError::Fatal(e.to_string()))?;
            match &door_obj.container_state {
                Some(state) if state.is_open() => Ok(to),
                Some(_) => Err(GameError::Precondition(format!("The {} is closed.", door_obj.name))),
                None => Ok(to),
            }
        },
        Exit::Functional { function } => match resolve_function(&function) {
            Some(ExitFunction::MazeDiode) => {
                // Maze rooms are authored with a direct exit per entry
                // vector; a functional exit here just means "ask the
                // current room's own maze-table", which the loader already
                // flattened into concrete per-direction exits at load time.
                Err(GameError::Fatal(format!("unresolved maze function '{function}'")))
            },
            None => Err(GameError::Fatal(format!("unknown exit function '{function}'"))),
        },
    }
}

/// Apply a successful move: leave-room triggers, update `here`, mark the
/// destination visited, recompute light, fire enter-room triggers. The
/// trigger firing itself is the caller's responsibility (dispatch.rs calls
/// back into the trigger engine); this just performs the mechanical state
/// transition described in spec §4.G/§4.K.
pub fn apply_move(world: &mut World, destination: &str) -> Result<()> {
    if !world.rooms.contains_key(destination) {
        return Err(anyhow!("move destination '{destination}' does not exist"));
    }
    world.winner.here = destination.to_string();
    world.visited_rooms.insert(destination.to_string());
    if let Ok(room) = world.room_mut(destination) {
        room.visited = true;
    }
    world.recompute_lit();
    Ok(())
}

/// Move NPCs whose `Movement` fires this turn, per spec §4.H's ordering
/// (after the combat daemon, before ambient triggers).
pub fn advance_npc_movement(world: &mut World, turn: u64) {
    let movers: Vec<String> = world
        .objects
        .values()
        .filter(|o| o.is_actor() && o.movement.as_ref().map(|m| m.active).unwrap_or(false))
        .map(|o| o.id.clone())
        .collect();

    for id in movers {
        let should_move = {
            let Ok(obj) = world.object(&id) else { continue };
            let Some(movement) = &obj.movement else { continue };
            match movement.timing {
                crate::entity::MovementTiming::EveryNTurns { turns } => turns > 0 && turn % turns as u64 == 0,
                crate::entity::MovementTiming::OnTurn { turn: on_turn } => turn == on_turn as u64,
            }
        };
        if !should_move {
            continue;
        }
        move_npc_step(world, &id);
    }
}

fn move_npc_step(world: &mut World, id: &str) {
    let mut route_room = None;
    let mut needs_random_draw = false;
    {
        let Ok(obj) = world.object_mut(id) else { return };
        let Some(movement) = &mut obj.movement else { return };
        if movement.rooms.is_empty() {
            return;
        }
        match movement.movement_type {
            crate::entity::MovementType::Route => {
                let room = movement.rooms[movement.route_index % movement.rooms.len()].clone();
                movement.route_index += 1;
                if movement.route_index >= movement.rooms.len() && !movement.loop_route {
                    movement.active = false;
                }
                route_room = Some(room);
            },
            crate::entity::MovementType::RandomSet => needs_random_draw = true,
        }
    }
    let next_room = if needs_random_draw {
        // Draw after releasing the mutable borrow on `obj.movement` above,
        // since `world.rng` and `world.object_mut` both borrow `world`.
        let rooms = world.object(id).ok().and_then(|o| o.movement.clone()).map(|m| m.rooms);
        let Some(rooms) = rooms else { return };
        let Some(room) = world.rng.choose(&rooms).cloned() else { return };
        room
    } else {
        match route_room {
            Some(room) => room,
            None => return,
        }
    };
    let _ = world.move_object(id, Container::Room(next_room));
}

trait ExitLookup {
    fn cloned_exit(self) -> Option<Exit>;
}

impl ExitLookup for Option<&Exit> {
    fn cloned_exit(self) -> Option<Exit> {
        self.cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Room;
    use crate::flags::FlagSet;
    use crate::world::tests_support::bare_world;
    use std::collections::HashMap;

    fn world_with_rooms() -> World {
        let mut world = bare_world();
        let mut start_exits = HashMap::new();
        start_exits.insert("north".to_string(), Exit::Direct { to: "north-room".into() });
        start_exits.insert(
            "south".to_string(),
            Exit::Blocked { message: "A wall of solid rock blocks the way.".into() },
        );
        world.rooms.insert(
            "start".into(),
            Room { id: "start".into(), name: "Start".into(), desc: String::new(), visited: true, exits: start_exits, flags: FlagSet::new() },
        );
        world.rooms.insert(
            "north-room".into(),
            Room { id: "north-room".into(), name: "North Room".into(), desc: String::new(), visited: false, exits: HashMap::new(), flags: FlagSet::new() },
        );
        world.winner.here = "start".into();
        world
    }

    #[test]
    fn direct_exit_succeeds() {
        let mut world = world_with_rooms();
        let dest = try_move(&mut world, "north").unwrap();
        assert_eq!(dest, "north-room");
    }

    #[test]
    fn blocked_exit_gives_specific_message() {
        let mut world = world_with_rooms();
        let err = try_move(&mut world, "south").unwrap_err();
        assert!(matches!(err, GameError::Precondition(msg) if msg.contains("wall of solid rock")));
    }

    #[test]
    fn missing_exit_gives_generic_refusal() {
        let mut world = world_with_rooms();
        let err = try_move(&mut world, "up").unwrap_err();
        assert!(matches!(err, GameError::Precondition(_)));
    }

    #[test]
    fn apply_move_marks_destination_visited_and_updates_here() {
        let mut world = world_with_rooms();
        apply_move(&mut world, "north-room").unwrap();
        assert_eq!(world.winner.here, "north-room");
        assert!(world.room("north-room").unwrap().visited);
    }

    #[test]
    fn random_set_movement_draws_from_the_shared_rng_and_moves() {
        let mut world = world_with_rooms();
        world.rooms.insert(
            "south-room".into(),
            Room { id: "south-room".into(), name: "South Room".into(), desc: String::new(), visited: false, exits: HashMap::new(), flags: FlagSet::new() },
        );
        world.objects.insert(
            "wanderer".into(),
            crate::entity::Object {
                id: "wanderer".into(),
                name: "wandering ghost".into(),
                desc: String::new(),
                text: None,
                container: Container::Room("start".into()),
                flags: FlagSet::from_iter([crate::flags::Flag::Actor]),
                container_state: None,
                strength: None,
                health: None,
                dialogue: Default::default(),
                npc_state: None,
                movement: Some(crate::entity::Movement {
                    movement_type: crate::entity::MovementType::RandomSet,
                    rooms: vec!["north-room".into(), "south-room".into()],
                    timing: crate::entity::MovementTiming::EveryNTurns { turns: 1 },
                    active: true,
                    loop_route: true,
                    route_index: 0,
                }),
                wake_prob: None,
                synonyms: Vec::new(),
                adjectives: Vec::new(),
            },
        );
        advance_npc_movement(&mut world, 1);
        let now_at = world.object("wanderer").unwrap().container.clone();
        assert!(matches!(now_at, Container::Room(r) if r == "north-room" || r == "south-room"));
    }
}
