//! Light and reachability queries: what the player can see and touch from
//! the current room, and the container-open/transparent traversal both rest
//! on. Load-bearing for the dark-room error case (spec §7, `DarkRoom`) as
//! well as for parser object resolution.

use crate::entity::{Container, EntityId, Object};
use crate::flags::Flag;
use crate::world::World;

/// Objects visible in the current room: in the room directly, or nested in
/// an open/transparent container that is itself in the room. Darkness
/// (spec I4) hides everything except objects with `sacred` or `light` set.
pub fn visible_in_room(world: &World, room: &str) -> Vec<&Object> {
    let mut out = Vec::new();
    for obj in world.objects.values() {
        if !is_visible_within(world, obj, room) {
            continue;
        }
        if world.lit || obj.flags.has(Flag::Sacred) || obj.flags.has(Flag::Light) {
            out.push(obj);
        }
    }
    out
}

/// Objects the player may physically touch: visible, and not sealed inside
/// a closed (non-transparent) container. Transparent-but-closed containers
/// are visible but not touchable — matching spec's touch-sequencing
/// invariant (I7): you can see the gem through the glass case, but you must
/// open it before handling the gem.
pub fn touchable_in_room(world: &World, room: &str) -> Vec<&Object> {
    visible_in_room(world, room)
        .into_iter()
        .filter(|obj| is_touchable(world, obj))
        .collect()
}

/// Is `obj` transitively inside `room`, through a chain of open or
/// transparent containers? Used both for visibility and by
/// `World::recompute_lit`, which needs the same traversal to decide whether
/// a sealed opaque container blocks its contents' light.
pub(crate) fn is_visible_within(world: &World, obj: &Object, room: &str) -> bool {
    match &obj.container {
        Container::Room(r) => r == room,
        Container::Object(parent_id) => {
            let Some(parent) = world.objects.get(parent_id) else {
                return false;
            };
            let parent_open_or_transparent = parent
                .container_state
                .as_ref()
                .map(|s| s.is_open() || s.is_transparent())
                .unwrap_or(true);
            parent_open_or_transparent && is_visible_within(world, parent, room)
        },
        Container::Winner | Container::Globals | Container::Limbo => false,
    }
}

fn is_touchable(world: &World, obj: &Object) -> bool {
    match &obj.container {
        Container::Room(_) => true,
        Container::Object(parent_id) => {
            let Some(parent) = world.objects.get(parent_id) else {
                return false;
            };
            let open = parent.container_state.as_ref().map(|s| s.is_open()).unwrap_or(true);
            open && is_touchable(world, parent)
        },
        Container::Winner | Container::Globals | Container::Limbo => false,
    }
}

/// Objects visible to the player right now: inventory plus whatever is
/// visible in the current room (or nothing, if the room is dark).
pub fn visible_to_player(world: &World) -> Vec<&Object> {
    let mut out = world.inventory();
    out.extend(visible_in_room(world, &world.winner.here));
    out
}

pub fn touchable_to_player(world: &World) -> Vec<&Object> {
    let mut out = world.inventory();
    out.extend(touchable_in_room(world, &world.winner.here));
    out
}

pub fn nearby_vessels(world: &World) -> Vec<&Object> {
    touchable_to_player(world)
        .into_iter()
        .filter(|o| o.flags.has(Flag::Cont))
        .collect()
}

/// Used by the save system and by goal tracking: has the player ever been
/// able to see this entity id, regardless of current container state.
pub fn entity_exists(world: &World, id: &EntityId) -> bool {
    world.objects.contains_key(id) || world.rooms.contains_key(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ContainerState, Room};
    use crate::flags::FlagSet;
    use crate::health::HealthState;
    use crate::rng::Rng;
    use crate::scheduler::Scheduler;
    use crate::world::{Verbosity, WorldFlag};
    use hollowgate_data::NpcState;
    use std::collections::{HashMap, HashSet};

    fn obj(id: &str, container: Container, state: Option<ContainerState>, flags: FlagSet) -> Object {
        Object {
            id: id.into(),
            name: id.into(),
            desc: String::new(),
            text: None,
            container,
            flags,
            container_state: state,
            strength: None,
            health: None,
            dialogue: HashMap::<NpcState, Vec<String>>::new(),
            npc_state: None,
            movement: None,
            wake_prob: None,
            synonyms: Vec::new(),
            adjectives: Vec::new(),
        }
    }

    fn world_with(objects: Vec<Object>, lit: bool) -> crate::world::World {
        let mut rooms = HashMap::new();
        rooms.insert(
            "hall".to_string(),
            Room {
                id: "hall".into(),
                name: "Hall".into(),
                desc: String::new(),
                visited: true,
                exits: HashMap::new(),
                flags: FlagSet::new(),
            },
        );
        crate::world::World {
            title: "t".into(),
            rooms,
            objects: objects.into_iter().map(|o| (o.id.clone(), o)).collect(),
            winner: crate::entity::Winner::new("Hero".into(), "you".into(), "hall".into(), 10, 3),
            score: 0,
            base_score: 0,
            moves: 0,
            deaths: 0,
            max_deaths: 3,
            world_flags: HashMap::<String, WorldFlag>::new(),
            visited_rooms: HashSet::new(),
            scheduler: Scheduler::new(),
            rng: Rng::new(1),
            verbosity: Verbosity::Normal,
            won: false,
            lit,
            triggers: Vec::new(),
            goals: Vec::new(),
            score_max: 350,
            resurrection_room: "hall".into(),
            scatter_room: "hall".into(),
            spinners: HashMap::new(),
        }
    }

    #[test]
    fn item_in_closed_opaque_chest_is_not_visible() {
        let chest = obj("chest", Container::Room("hall".into()), Some(ContainerState::Closed), FlagSet::new());
        let coin = obj("coin", Container::Object("chest".into()), None, FlagSet::new());
        let world = world_with(vec![chest, coin], true);
        let visible_ids: Vec<_> = visible_in_room(&world, "hall").iter().map(|o| o.id.clone()).collect();
        assert!(!visible_ids.contains(&"coin".to_string()));
    }

    #[test]
    fn item_in_transparent_closed_jar_is_visible_not_touchable() {
        let jar = obj(
            "jar",
            Container::Room("hall".into()),
            Some(ContainerState::TransparentClosed),
            FlagSet::new(),
        );
        let bug = obj("bug", Container::Object("jar".into()), None, FlagSet::new());
        let world = world_with(vec![jar, bug], true);
        let visible_ids: Vec<_> = visible_in_room(&world, "hall").iter().map(|o| o.id.clone()).collect();
        let touchable_ids: Vec<_> = touchable_in_room(&world, "hall").iter().map(|o| o.id.clone()).collect();
        assert!(visible_ids.contains(&"bug".to_string()));
        assert!(!touchable_ids.contains(&"bug".to_string()));
    }

    #[test]
    fn dark_room_hides_everything_except_sacred_and_light() {
        let mut sacred_flags = FlagSet::new();
        sacred_flags.set(Flag::Sacred);
        let statue = obj("statue", Container::Room("hall".into()), None, sacred_flags);
        let sword = obj("sword", Container::Room("hall".into()), None, FlagSet::new());
        let world = world_with(vec![statue, sword], false);
        let visible_ids: Vec<_> = visible_in_room(&world, "hall").iter().map(|o| o.id.clone()).collect();
        assert!(visible_ids.contains(&"statue".to_string()));
        assert!(!visible_ids.contains(&"sword".to_string()));
    }
}
