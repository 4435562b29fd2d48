//! Resolve a player's noun phrase ("the rusty key", "all") against one of
//! several accessible-object scopes, by intersecting the phrase's adjective
//! and noun (synonym) words against each candidate's own sets (spec §4.D
//! step 3), folded into the `visibility` module's scope helpers.

use thiserror::Error;

use crate::entity::EntityId;
use crate::visibility;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    VisibleInRoom,
    TouchableInRoom,
    Inventory,
    VisibleToPlayer,
    TouchableToPlayer,
    NearbyVessels,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("I don't see anything like that here.")]
    NoMatchingName,
    #[error("I'm not sure which one you mean: {0}.")]
    Ambiguous(String),
    #[error("that's not something you can do that to.")]
    InvalidScope,
}

fn candidates<'w>(world: &'w World, scope: SearchScope) -> Vec<&'w crate::entity::Object> {
    match scope {
        SearchScope::VisibleInRoom => visibility::visible_in_room(world, &world.winner.here),
        SearchScope::TouchableInRoom => visibility::touchable_in_room(world, &world.winner.here),
        SearchScope::Inventory => world.inventory(),
        SearchScope::VisibleToPlayer => visibility::visible_to_player(world),
        SearchScope::TouchableToPlayer => visibility::touchable_to_player(world),
        SearchScope::NearbyVessels => visibility::nearby_vessels(world),
    }
}

/// An object's noun words: its catalogue synonyms plus the last word of its
/// display name (the head noun a bare "key" or "lantern" refers to).
fn noun_words(obj: &crate::entity::Object) -> std::collections::HashSet<String> {
    let mut words: std::collections::HashSet<String> = obj.synonyms.iter().map(|s| s.to_lowercase()).collect();
    if let Some(last) = obj.name.to_lowercase().split_whitespace().last() {
        words.insert(last.to_string());
    }
    words
}

/// An object's adjective words: its catalogue adjectives plus every word of
/// its display name except the last (so a catalogue author describing "a
/// rusty key" gets "rusty" as an adjective for free, without repeating it).
fn adjective_words(obj: &crate::entity::Object) -> std::collections::HashSet<String> {
    let name_lower = obj.name.to_lowercase();
    let mut words: Vec<&str> = name_lower.split_whitespace().collect();
    words.pop();
    let mut set: std::collections::HashSet<String> = words.into_iter().map(str::to_string).collect();
    set.extend(obj.adjectives.iter().map(|a| a.to_lowercase()));
    set
}

/// Does `obj` satisfy the noun phrase `tokens` (spec §4.D step 3:
/// intersect adjective and synonym sets)? The last token is the head noun;
/// earlier tokens must each be one of the object's adjectives. A
/// single-token phrase also matches on an adjective word alone, so "take
/// rusty" still resolves when only one rusty thing is around.
fn matches_phrase(obj: &crate::entity::Object, tokens: &[&str]) -> bool {
    let Some((&head, adjs)) = tokens.split_last() else {
        return false;
    };
    if adjs.is_empty() {
        return noun_words(obj).contains(head) || adjective_words(obj).contains(head) || obj.id.to_lowercase() == head;
    }
    noun_words(obj).contains(head) && adjs.iter().all(|a| adjective_words(obj).contains(*a))
}

/// Match a parsed noun phrase's head noun (and optional adjectives) against
/// objects in `scope`. More than one match is `Ambiguous`, zero is
/// `NoMatchingName`.
pub fn find_item_match(world: &World, pattern: &str, scope: SearchScope) -> Result<EntityId, SearchError> {
    let pattern = pattern.trim().to_lowercase();
    if pattern.is_empty() {
        return Err(SearchError::NoMatchingName);
    }
    let tokens: Vec<&str> = pattern.split_whitespace().collect();
    let matches: Vec<&crate::entity::Object> =
        candidates(world, scope).into_iter().filter(|obj| matches_phrase(obj, &tokens)).collect();

    match matches.as_slice() {
        [] => Err(SearchError::NoMatchingName),
        [only] => Ok(only.id.clone()),
        many => {
            // Exact-name matches disambiguate ties among looser matches.
            let exact: Vec<_> = many.iter().filter(|o| o.name.to_lowercase() == pattern).collect();
            if let [only] = exact.as_slice() {
                return Ok(only.id.clone());
            }
            let names: Vec<String> = many.iter().map(|o| o.name.clone()).collect();
            Err(SearchError::Ambiguous(names.join(", ")))
        },
    }
}

/// Resolve `"all"` within a scope: every matching object's id, in stable
/// iteration order. Used by the parser's `all`-noun handling (spec §4.D).
pub fn find_all(world: &World, scope: SearchScope) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = candidates(world, scope).into_iter().map(|o| o.id.clone()).collect();
    ids.sort();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Container;
    use crate::flags::FlagSet;
    use crate::world::tests_support::bare_world;

    fn with_object(mut world: World, id: &str, name: &str) -> World {
        world.objects.insert(
            id.to_string(),
            crate::entity::Object {
                id: id.to_string(),
                name: name.to_string(),
                desc: String::new(),
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
        world
    }

    #[test]
    fn unique_substring_match_resolves() {
        let mut world = bare_world();
        world.rooms.insert(
            "start".into(),
            crate::entity::Room {
                id: "start".into(),
                name: "Start".into(),
                desc: String::new(),
                visited: true,
                exits: Default::default(),
                flags: FlagSet::new(),
            },
        );
        let world = with_object(world, "key", "rusty key");
        assert_eq!(find_item_match(&world, "rusty", SearchScope::VisibleInRoom), Ok("key".to_string()));
    }

    #[test]
    fn ambiguous_match_lists_candidates() {
        let mut world = bare_world();
        world.rooms.insert(
            "start".into(),
            crate::entity::Room {
                id: "start".into(),
                name: "Start".into(),
                desc: String::new(),
                visited: true,
                exits: Default::default(),
                flags: FlagSet::new(),
            },
        );
        let world = with_object(world, "key1", "brass key");
        let world = with_object(world, "key2", "iron key");
        assert!(matches!(
            find_item_match(&world, "key", SearchScope::VisibleInRoom),
            Err(SearchError::Ambiguous(_))
        ));
    }

    #[test]
    fn no_match_is_reported() {
        let world = bare_world();
        assert_eq!(find_item_match(&world, "anything", SearchScope::VisibleInRoom), Err(SearchError::NoMatchingName));
    }

    #[test]
    fn synonym_resolves_to_the_object_it_names() {
        let mut world = bare_world();
        world.rooms.insert(
            "start".into(),
            crate::entity::Room {
                id: "start".into(),
                name: "Start".into(),
                desc: String::new(),
                visited: true,
                exits: Default::default(),
                flags: FlagSet::new(),
            },
        );
        world.objects.insert(
            "lantern".into(),
            crate::entity::Object {
                id: "lantern".into(),
                name: "brass lantern".into(),
                desc: String::new(),
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
        assert_eq!(find_item_match(&world, "lamp", SearchScope::VisibleInRoom), Ok("lantern".to_string()));
        assert_eq!(find_item_match(&world, "brass lamp", SearchScope::VisibleInRoom), Ok("lantern".to_string()));
    }

    #[test]
    fn adjective_mismatch_fails_to_resolve() {
        let mut world = bare_world();
        world.rooms.insert(
            "start".into(),
            crate::entity::Room {
                id: "start".into(),
                name: "Start".into(),
                desc: String::new(),
                visited: true,
                exits: Default::default(),
                flags: FlagSet::new(),
            },
        );
        let world = with_object(world, "key1", "brass key");
        assert_eq!(
            find_item_match(&world, "iron key", SearchScope::VisibleInRoom),
            Err(SearchError::NoMatchingName)
        );
    }
}
