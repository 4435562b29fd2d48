//! Core entity shapes: rooms, objects, and the distinguished player record.
//!
//! Every entity lives in exactly one `Container`, and `Container::Object`/
//! `Container::Room` edges form a forest (no cycles) — see
//! `World::depth_from_room`, which relies on this to terminate.

use std::collections::HashMap;

use hollowgate_data::NpcState;
use serde::{Deserialize, Serialize};

use crate::flags::FlagSet;
use crate::health::HealthState;

/// Interned short catalogue token (`"mailbox"`, `"troll"`). The catalogue
/// token *is* the runtime identifier — there is no separate symbol table.
pub type EntityId = String;

/// Pseudo-location for objects not reachable from any room: the running
/// score/turn counters and similar bookkeeping that nonetheless need a
/// `Container` to satisfy "every entity has exactly one container".
pub const LOCAL_GLOBALS: &str = "#local-globals";
/// Pseudo-location for despawned/not-yet-spawned objects.
pub const LIMBO: &str = "#limbo";

/// Where an entity currently is. Forms a forest with rooms as roots: an
/// `Object` container chain must bottom out at a `Room` (or `Winner`, or one
/// of the two pseudo-locations) — see `World::depth_from_room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    Room(EntityId),
    Object(EntityId),
    Winner,
    Globals,
    Limbo,
}

impl Container {
    pub fn is_room(&self, room: &str) -> bool {
        matches!(self, Container::Room(id) if id == room)
    }
}

/// Tagged-union exit (spec §4.G): flag-gating and door-gating are distinct
/// variants rather than optional fields every caller has to check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Exit {
    /// Always usable, no gating.
    Direct { to: EntityId },
    /// Never usable; exists so "go north" gets a specific refusal instead of
    /// a generic "you can't go that way".
    Blocked { message: String },
    /// Usable only while a named flag is set; otherwise shows `message`.
    Conditional { to: EntityId, flag: String, message: String },
    /// Gated by an openable/lockable door object.
    Door { to: EntityId, door: EntityId },
    /// Resolved by a named function the movement resolver looks up — the
    /// maze-diode case, where the destination depends on how the maze was
    /// entered rather than being a fixed token.
    Functional { function: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    Open,
    Closed,
    Locked,
    TransparentOpen,
    TransparentClosed,
    TransparentLocked,
}

impl ContainerState {
    pub fn is_open(&self) -> bool {
        matches!(self, ContainerState::Open | ContainerState::TransparentOpen)
    }

    pub fn is_transparent(&self) -> bool {
        matches!(
            self,
            ContainerState::TransparentOpen | ContainerState::TransparentClosed | ContainerState::TransparentLocked
        )
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, ContainerState::Locked | ContainerState::TransparentLocked)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: EntityId,
    pub name: String,
    pub desc: String,
    pub visited: bool,
    pub exits: HashMap<String, Exit>,
    pub flags: FlagSet,
}

/// An object: item, scenery, door, or (when `actor`/`fight` are set) an
/// NPC or villain. One struct rather than separate `Item`/`Npc` types,
/// matching spec §3's framing of the player as "an Object plus `here`".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub id: EntityId,
    pub name: String,
    pub desc: String,
    pub text: Option<String>,
    pub container: Container,
    pub flags: FlagSet,
    pub container_state: Option<ContainerState>,
    pub strength: Option<i32>,
    pub health: Option<HealthState>,
    pub dialogue: HashMap<NpcState, Vec<String>>,
    pub npc_state: Option<NpcState>,
    pub movement: Option<Movement>,
    pub wake_prob: Option<u32>,
    /// Alternate head nouns a noun phrase may use in place of `name`.
    pub synonyms: Vec<String>,
    /// Adjectives a noun phrase may qualify this object with.
    pub adjectives: Vec<String>,
}

impl Object {
    pub fn is_actor(&self) -> bool {
        self.flags.has(crate::flags::Flag::Actor)
    }

    /// An actor with a combat strength set is villain-typed, independent of
    /// `Flag::Fight`, which only marks "currently engaged this turn".
    pub fn is_villain(&self) -> bool {
        self.is_actor() && self.strength.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementType {
    Route,
    RandomSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementTiming {
    EveryNTurns { turns: usize },
    OnTurn { turn: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub movement_type: MovementType,
    pub rooms: Vec<EntityId>,
    pub timing: MovementTiming,
    pub active: bool,
    pub loop_route: bool,
    pub route_index: usize,
}

/// The distinguished player record. Lives on `World` directly rather than in
/// the entity map — see DESIGN.md's "player as object vs. separate struct"
/// decision — but shares the same flag/inventory/health shape as `Object`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Winner {
    pub name: String,
    pub description: String,
    pub here: EntityId,
    pub flags: FlagSet,
    pub health: HealthState,
    pub strength: i32,
    pub it: Option<EntityId>,
    pub last_villain_fought: Option<EntityId>,
}

impl Winner {
    pub fn new(name: String, description: String, start_room: EntityId, max_hp: u32, strength: i32) -> Self {
        Self {
            name,
            description,
            here: start_room,
            flags: FlagSet::from_iter([crate::flags::Flag::Actor]),
            health: HealthState::new_at_max(max_hp),
            strength,
            it: None,
            last_villain_fought: None,
        }
    }
}
