//! The single owning world state, passed as `&mut World` through the turn
//! loop (spec §9: "global mutable world" design note — one struct, no
//! `Rc<RefCell<_>>` webs, no dynamic dispatch on verbs).

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use log::debug;
use serde::{Deserialize, Serialize};

use hollowgate_data::GoalDef;

use crate::entity::{Container, EntityId, Object, Room, Winner, LIMBO, LOCAL_GLOBALS};
use crate::flags::Flag;
use crate::rng::Rng;
use crate::scheduler::Scheduler;
use crate::trigger::TriggerRuntime;

/// Progress state for a named "sequence" flag (spec: counter discipline,
/// I6). `Simple` flags are boolean; `Sequence` flags track a monotonic
/// step count up to `end` and report `complete` once reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorldFlag {
    Simple,
    Sequence { step: u8, end: u8 },
}

impl WorldFlag {
    pub fn is_complete(&self) -> bool {
        match self {
            WorldFlag::Simple => true,
            WorldFlag::Sequence { step, end } => step >= end,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        match self {
            WorldFlag::Simple => false,
            WorldFlag::Sequence { step, end } => step < end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Verbosity {
    Brief,
    #[default]
    Normal,
    Verbose,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub title: String,
    pub rooms: HashMap<EntityId, Room>,
    pub objects: HashMap<EntityId, Object>,
    pub winner: Winner,
    pub score: isize,
    pub base_score: isize,
    pub moves: u64,
    pub deaths: u32,
    pub max_deaths: u32,
    pub world_flags: HashMap<String, WorldFlag>,
    pub visited_rooms: std::collections::HashSet<EntityId>,
    pub scheduler: Scheduler,
    pub rng: Rng,
    pub verbosity: Verbosity,
    pub won: bool,
    pub lit: bool,
    pub triggers: Vec<TriggerRuntime>,
    pub goals: Vec<GoalDef>,
    pub score_max: isize,
    pub resurrection_room: EntityId,
    pub scatter_room: EntityId,
    /// Flattened weighted variant pools, keyed by catalogue spinner id —
    /// `(weight, text)` pairs ready for `Rng::choose_weighted`.
    pub spinners: HashMap<EntityId, Vec<(usize, String)>>,
}

impl World {
    pub fn room(&self, id: &str) -> Result<&Room> {
        self.rooms.get(id).ok_or_else(|| anyhow!("unknown room id '{id}'"))
    }

    pub fn room_mut(&mut self, id: &str) -> Result<&mut Room> {
        self.rooms.get_mut(id).ok_or_else(|| anyhow!("unknown room id '{id}'"))
    }

    pub fn object(&self, id: &str) -> Result<&Object> {
        self.objects.get(id).ok_or_else(|| anyhow!("unknown object id '{id}'"))
    }

    pub fn object_mut(&mut self, id: &str) -> Result<&mut Object> {
        self.objects.get_mut(id).ok_or_else(|| anyhow!("unknown object id '{id}'"))
    }

    pub fn current_room(&self) -> Result<&Room> {
        self.room(&self.winner.here)
    }

    /// Every object directly inside `container` (one level, not recursive).
    pub fn contents_of(&self, container: &Container) -> Vec<&Object> {
        self.objects.values().filter(|o| &o.container == container).collect()
    }

    pub fn inventory(&self) -> Vec<&Object> {
        self.contents_of(&Container::Winner)
    }

    /// Move an object into a new container. Fails if the destination would
    /// create a cycle (an object can't contain its own ancestor), preserving
    /// invariant I1's "container graph is a forest".
    pub fn move_object(&mut self, id: &str, dest: Container) -> Result<()> {
        if let Container::Object(dest_id) = &dest {
            if dest_id == id || self.is_ancestor(id, dest_id) {
                bail!("cannot move '{id}' into its own descendant '{dest_id}'");
            }
        }
        let obj = self.object_mut(id)?;
        obj.container = dest;
        Ok(())
    }

    fn is_ancestor(&self, candidate: &str, of: &str) -> bool {
        let mut current = of.to_string();
        loop {
            match self.objects.get(&current).map(|o| &o.container) {
                Some(Container::Object(parent)) => {
                    if parent == candidate {
                        return true;
                    }
                    current = parent.clone();
                },
                _ => return false,
            }
        }
    }

    /// Depth-first search upward from an object to see whether it ultimately
    /// sits in `room_id` (directly or nested in a chain of containers).
    pub fn object_room(&self, id: &str) -> Option<EntityId> {
        let mut current = self.objects.get(id)?.container.clone();
        loop {
            match current {
                Container::Room(room) => return Some(room),
                Container::Object(parent) => current = self.objects.get(&parent)?.container.clone(),
                Container::Winner => return Some(self.winner.here.clone()),
                Container::Globals | Container::Limbo => return None,
            }
        }
    }

    pub fn flag(&self, name: &str) -> Option<&WorldFlag> {
        self.world_flags.get(name)
    }

    pub fn set_flag_simple(&mut self, name: &str) {
        self.world_flags.insert(name.to_string(), WorldFlag::Simple);
    }

    pub fn advance_flag(&mut self, name: &str, end: u8) {
        let entry = self.world_flags.entry(name.to_string()).or_insert(WorldFlag::Sequence { step: 0, end });
        if let WorldFlag::Sequence { step, end: existing_end } = entry {
            *existing_end = end;
            *step = step.saturating_add(1);
            debug!("flag '{name}' advanced to {step}/{end}");
        }
    }

    pub fn remove_flag(&mut self, name: &str) {
        self.world_flags.remove(name);
    }

    pub fn recompute_lit(&mut self) {
        let room_lit = self.current_room().map(|r| r.flags.has(Flag::Lit)).unwrap_or(false);
        let carrying_light = self
            .contents_of(&Container::Winner)
            .iter()
            .any(|o| o.flags.has(Flag::Light) && o.flags.has(Flag::On));
        let here = self.winner.here.clone();
        let room_has_lit_object = self.objects.values().any(|o| {
            o.flags.has(Flag::Light) && o.flags.has(Flag::On) && crate::visibility::is_visible_within(self, o, &here)
        });
        self.lit = room_lit || carrying_light || room_has_lit_object;
    }

    pub fn award_points(&mut self, amount: isize) {
        self.score += amount;
    }

    /// Draw a weighted-random line of flavour text from a loaded spinner,
    /// routed through the shared seeded RNG to stay deterministic (spec §9).
    pub fn spin(&mut self, spinner: &str) -> Option<String> {
        let wedges = self.spinners.get(spinner)?;
        self.rng.choose_weighted(wedges).cloned()
    }

    /// Move everything the player was carrying into the current room and
    /// reset their location to the configured resurrection point, used by
    /// `jigs_up` (spec GLOSSARY).
    pub fn scatter_inventory_here(&mut self) {
        let ids: Vec<EntityId> = self.inventory().iter().map(|o| o.id.clone()).collect();
        let here = self.winner.here.clone();
        for id in ids {
            let _ = self.move_object(&id, Container::Room(here.clone()));
        }
    }
}

pub fn local_globals_container() -> Container {
    Container::Room(LOCAL_GLOBALS.to_string())
}

pub fn limbo_container() -> Container {
    Container::Room(LIMBO.to_string())
}

#[cfg(test)]
pub mod tests_support {
    use super::*;

    pub fn bare_world() -> World {
        World {
            title: "Test".into(),
            rooms: HashMap::new(),
            objects: HashMap::new(),
            winner: Winner::new("Hero".into(), "You.".into(), "start".into(), 10, 3),
            score: 0,
            base_score: 0,
            moves: 0,
            deaths: 0,
            max_deaths: 3,
            world_flags: HashMap::new(),
            visited_rooms: Default::default(),
            scheduler: Scheduler::new(),
            rng: Rng::new(1),
            verbosity: Verbosity::Normal,
            won: false,
            lit: true,
            triggers: Vec::new(),
            goals: Vec::new(),
            score_max: 350,
            resurrection_room: "start".into(),
            scatter_room: "start".into(),
            spinners: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagSet;

    fn empty_world() -> World {
        tests_support::bare_world()
    }

    #[test]
    fn moving_object_into_its_own_descendant_fails() {
        let mut world = empty_world();
        world.objects.insert(
            "box".into(),
            Object {
                id: "box".into(),
                name: "box".into(),
                desc: "A box.".into(),
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
                synonyms: Vec::new(),
                adjectives: Vec::new(),
            },
        );
        world.objects.insert(
            "pebble".into(),
            Object {
                id: "pebble".into(),
                name: "pebble".into(),
                desc: "A pebble.".into(),
                text: None,
                container: Container::Object("box".into()),
                flags: FlagSet::new(),
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
        let result = world.move_object("box", Container::Object("pebble".into()));
        assert!(result.is_err());
    }

    #[test]
    fn advance_flag_tracks_completion() {
        let mut world = empty_world();
        world.advance_flag("ritual", 3);
        assert!(world.flag("ritual").unwrap().is_in_progress());
        world.advance_flag("ritual", 3);
        world.advance_flag("ritual", 3);
        assert!(world.flag("ritual").unwrap().is_complete());
    }

    #[test]
    fn spin_draws_one_of_the_loaded_wedges() {
        let mut world = empty_world();
        world.spinners.insert("wind".into(), vec![(1, "A gust stirs the leaves.".into())]);
        assert_eq!(world.spin("wind").as_deref(), Some("A gust stirs the leaves."));
    }

    #[test]
    fn spin_on_unknown_spinner_returns_none() {
        let mut world = empty_world();
        assert_eq!(world.spin("nope"), None);
    }
}
