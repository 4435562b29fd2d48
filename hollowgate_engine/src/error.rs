//! The closed, player-visible error taxonomy (spec §7). Internal plumbing
//! failures (malformed catalogue, I/O) stay `anyhow::Error`; only the
//! outcomes a player's command can actually produce live here, using the
//! same `thiserror` derive as `entity_search::SearchError`.

use thiserror::Error;

use crate::entity::EntityId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("I don't know the verb \"{0}\".")]
    UnknownVerb(String),

    #[error("I don't know what a \"{0}\" is.")]
    UnknownNoun(String),

    #[error("I don't see anything like that here.")]
    NoMatch,

    #[error("I'm not sure which one you mean: {0}.")]
    Ambiguous(String),

    #[error("You can't do that; it isn't here.")]
    NotHere,

    #[error("You can't reach it — the {0} is closed.")]
    InClosedContainer(EntityId),

    #[error("It's too dark to see.")]
    DarkRoom,

    #[error("You can only do that to one thing at a time.")]
    MultipleNotAllowed,

    #[error("{0}")]
    Precondition(String),

    #[error("You have died.")]
    Death,

    #[error("fatal engine error: {0}")]
    Fatal(String),

    #[error("unrecognized identifier '{0}'")]
    BadId(EntityId),
}

impl GameError {
    /// Stable machine-readable tag matching spec §7's taxonomy table —
    /// used by the JSON-lines session API so tooling doesn't have to parse
    /// English error text.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::UnknownVerb(_) => "unknown_verb",
            GameError::UnknownNoun(_) => "unknown_noun",
            GameError::NoMatch => "no_match",
            GameError::Ambiguous(_) => "ambiguous",
            GameError::NotHere => "not_here",
            GameError::InClosedContainer(_) => "in_closed_container",
            GameError::DarkRoom => "dark_room",
            GameError::MultipleNotAllowed => "multiple_not_allowed",
            GameError::Precondition(_) => "precondition",
            GameError::Death => "death",
            GameError::Fatal(_) => "fatal",
            GameError::BadId(_) => "bad_id",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(GameError::DarkRoom.code(), "dark_room");
        assert_eq!(GameError::NoMatch.code(), "no_match");
    }
}
