//! Tokenize raw player input into a structured command (spec §4.D).
//!
//! Built on `pest`, grammar in `parser/grammar.pest`. Stages: (1) pest parse
//! into a token tree, (2) verb-table lookup with synonym folding, (3)
//! noun-phrase → `EntityId` resolution is left to the dispatcher, which has
//! access to `World` and picks the right `entity_search::SearchScope` per
//! verb.

use pest::Parser;
use pest_derive::Parser as PestParser;

use crate::error::GameError;

#[derive(PestParser)]
#[grammar = "parser/grammar.pest"]
struct CommandGrammar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NounPhrase {
    /// `"all"` / `"all of"` — expanded against a scope by the dispatcher.
    All,
    /// Adjectives (possibly empty) plus the head noun, lowercased.
    Described { adjectives: Vec<String>, noun: String },
}

impl NounPhrase {
    pub fn search_text(&self) -> String {
        match self {
            NounPhrase::All => String::new(),
            NounPhrase::Described { adjectives, noun } => {
                let mut text = adjectives.join(" ");
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(noun);
                text
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Quit,
    Inventory,
    Look(Option<NounPhrase>),
    Help,
    Score,
    Diagnostics,
    Undo,
    Again,
    Save(Option<String>),
    Restore(Option<String>),
    Action {
        verb: String,
        direct: Option<NounPhrase>,
        preposition: Option<String>,
        indirect: Option<NounPhrase>,
    },
}

pub fn parse(input: &str) -> Result<ParsedCommand, GameError> {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(GameError::UnknownVerb(String::new()));
    }
    let mut pairs =
        CommandGrammar::parse(Rule::command, &normalized).map_err(|_| GameError::UnknownVerb(normalized.clone()))?;
    let command_pair = pairs.next().ok_or_else(|| GameError::UnknownVerb(normalized.clone()))?;
    let inner = command_pair.into_inner().next().ok_or_else(|| GameError::UnknownVerb(normalized.clone()))?;

    match inner.as_rule() {
        Rule::meta_command => parse_meta(inner),
        Rule::action_command => parse_action(inner),
        Rule::EOI => Err(GameError::UnknownVerb(normalized)),
        _ => Err(GameError::UnknownVerb(normalized)),
    }
}

fn parse_meta(pair: pest::iterators::Pair<Rule>) -> Result<ParsedCommand, GameError> {
    let kind = pair.into_inner().next().expect("meta_command always has one alternative");
    Ok(match kind.as_rule() {
        Rule::quit => ParsedCommand::Quit,
        Rule::inventory => ParsedCommand::Inventory,
        Rule::look => {
            let noun = kind.into_inner().find_map(|p| if p.as_rule() == Rule::noun_phrase { Some(to_noun_phrase(p)) } else { None });
            ParsedCommand::Look(noun)
        },
        Rule::help => ParsedCommand::Help,
        Rule::score => ParsedCommand::Score,
        Rule::diagnostics => ParsedCommand::Diagnostics,
        Rule::undo => ParsedCommand::Undo,
        Rule::again => ParsedCommand::Again,
        Rule::save => {
            let slot = kind.into_inner().find(|p| p.as_rule() == Rule::word).map(|p| p.as_str().to_string());
            ParsedCommand::Save(slot)
        },
        Rule::restore => {
            let slot = kind.into_inner().find(|p| p.as_rule() == Rule::word).map(|p| p.as_str().to_string());
            ParsedCommand::Restore(slot)
        },
        _ => unreachable!("meta_command grammar covers every meta variant"),
    })
}

fn parse_action(pair: pest::iterators::Pair<Rule>) -> Result<ParsedCommand, GameError> {
    let mut inner = pair.into_inner();
    let verb = inner.next().expect("action_command always starts with a verb").as_str().to_string();

    let mut noun_phrases = Vec::new();
    let mut prepositions = Vec::new();
    for part in inner {
        match part.as_rule() {
            Rule::noun_phrase => noun_phrases.push(to_noun_phrase(part)),
            Rule::preposition => prepositions.push(part.as_str().to_string()),
            _ => {},
        }
    }

    let direct = noun_phrases.first().cloned();
    let indirect = noun_phrases.get(1).cloned();
    let preposition = prepositions.first().cloned();

    Ok(ParsedCommand::Action { verb, direct, preposition, indirect })
}

fn to_noun_phrase(pair: pest::iterators::Pair<Rule>) -> NounPhrase {
    let mut words: Vec<String> = Vec::new();
    let mut is_all = false;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::all_marker => is_all = true,
            Rule::phrase_word => words.push(part.as_str().to_string()),
            _ => {},
        }
    }
    if is_all {
        return NounPhrase::All;
    }
    let noun = words.pop().unwrap_or_default();
    NounPhrase::Described { adjectives: words, noun }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_verb_noun() {
        let parsed = parse("take lantern").unwrap();
        match parsed {
            ParsedCommand::Action { verb, direct, .. } => {
                assert_eq!(verb, "take");
                assert_eq!(direct, Some(NounPhrase::Described { adjectives: vec![], noun: "lantern".into() }));
            },
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn parses_adjective_noun_and_indirect_object() {
        let parsed = parse("put brass lantern in wicker basket").unwrap();
        match parsed {
            ParsedCommand::Action { verb, direct, preposition, indirect } => {
                assert_eq!(verb, "put");
                assert_eq!(
                    direct,
                    Some(NounPhrase::Described { adjectives: vec!["brass".into()], noun: "lantern".into() })
                );
                assert_eq!(preposition, Some("in".into()));
                assert_eq!(
                    indirect,
                    Some(NounPhrase::Described { adjectives: vec!["wicker".into()], noun: "basket".into() })
                );
            },
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn parses_all_marker() {
        let parsed = parse("take all").unwrap();
        match parsed {
            ParsedCommand::Action { direct, .. } => assert_eq!(direct, Some(NounPhrase::All)),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn recognizes_meta_commands() {
        assert_eq!(parse("inventory").unwrap(), ParsedCommand::Inventory);
        assert_eq!(parse("i").unwrap(), ParsedCommand::Inventory);
        assert_eq!(parse("quit").unwrap(), ParsedCommand::Quit);
    }

    #[test]
    fn blank_input_is_rejected() {
        assert!(parse("   ").is_err());
    }
}
