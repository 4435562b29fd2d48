//! The closed set of entity flags and the per-entity flag set that carries
//! them: a fixed enum rather than free-form strings, so a typo in a
//! catalogue flag name is a load-time error instead of a silent no-op. The
//! catalogue can still author flags by name (`hollowgate_data::FlagDef`),
//! but the runtime only ever holds one of these variants.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flag {
    Lit,
    Sacred,
    Maze,
    RWater,
    Take,
    TryTake,
    Cont,
    Surface,
    Open,
    Door,
    Trans,
    Read,
    Light,
    On,
    Burn,
    Flame,
    Weapon,
    Tool,
    Food,
    Drink,
    Vehicle,
    Climb,
    Actor,
    Touch,
    Invisible,
    Ndesc,
    Search,
    Fight,
    Staggered,
    BurnedOut,
}

impl Flag {
    /// Parse a catalogue-authored flag name (`"take"`, `"try-take"`, ...)
    /// into the closed runtime enum. Unknown names are a load error, not a
    /// silently-ignored no-op, so catalogue typos surface at load time.
    pub fn from_name(name: &str) -> Option<Self> {
        use Flag::*;
        Some(match name {
            "lit" => Lit,
            "sacred" => Sacred,
            "maze" => Maze,
            "rwater" => RWater,
            "take" => Take,
            "trytake" | "try-take" => TryTake,
            "cont" | "container" => Cont,
            "surface" => Surface,
            "open" => Open,
            "door" => Door,
            "trans" | "transparent" => Trans,
            "read" => Read,
            "light" => Light,
            "on" => On,
            "burn" | "burnable" => Burn,
            "flame" => Flame,
            "weapon" => Weapon,
            "tool" => Tool,
            "food" => Food,
            "drink" => Drink,
            "vehicle" => Vehicle,
            "climb" => Climb,
            "actor" => Actor,
            "touch" | "touched" => Touch,
            "invisible" => Invisible,
            "ndesc" => Ndesc,
            "search" => Search,
            "fight" => Fight,
            "staggered" => Staggered,
            "burned-out" | "burnedout" => BurnedOut,
            _ => return None,
        })
    }
}

/// Per-entity flag set. A thin newtype over `HashSet<Flag>` so entity
/// structs read as `flags: FlagSet` rather than exposing the raw set type
/// everywhere they're touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet(HashSet<Flag>);

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_iter(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self(flags.into_iter().collect())
    }

    pub fn has(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    pub fn set(&mut self, flag: Flag) {
        self.0.insert(flag);
    }

    pub fn unset(&mut self, flag: Flag) {
        self.0.remove(&flag);
    }

    pub fn toggle(&mut self, flag: Flag, on: bool) {
        if on {
            self.set(flag);
        } else {
            self.unset(flag);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_flag_name_is_none() {
        assert_eq!(Flag::from_name("does-not-exist"), None);
    }

    #[test]
    fn known_aliases_resolve_to_same_flag() {
        assert_eq!(Flag::from_name("trytake"), Flag::from_name("try-take"));
    }

    #[test]
    fn set_unset_roundtrip() {
        let mut flags = FlagSet::new();
        assert!(!flags.has(Flag::Open));
        flags.set(Flag::Open);
        assert!(flags.has(Flag::Open));
        flags.unset(Flag::Open);
        assert!(!flags.has(Flag::Open));
    }
}
