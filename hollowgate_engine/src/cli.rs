//! Command-line flag parsing (spec §6's CLI surface) and the batch/`--ml`
//! shells built on top of `turn::Session`.
//!
//! A small hand-rolled loop over `std::env::args()` with `anyhow::bail!` on
//! malformed input, rather than reaching for a dedicated argument-parsing
//! crate — the flag surface is narrow enough not to need one.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Result, bail};

use serde::Serialize;

use crate::turn::{RewardSignals, Session, StateSnapshot, StructuredAction};

#[derive(Serialize)]
struct MlFrame<'a> {
    snapshot: &'a StateSnapshot,
    reward: Option<RewardSignals>,
}

#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub catalogue: Option<PathBuf>,
    pub seed: Option<u64>,
    pub input: Option<PathBuf>,
    pub strict: bool,
    pub fail_on_death: bool,
    pub fail_on_parser_error: bool,
    pub max_turns: Option<u64>,
    pub quiet: bool,
    pub ml: bool,
    pub ml_rewards: bool,
}

/// Process exit codes (spec §6): these are contract, not cosmetic — shells
/// and tests key off the numeric value, not the message on stderr.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const DEATH: i32 = 1;
    pub const PARSER_ERROR: i32 = 2;
    pub const INTERNAL_ERROR: i32 = 3;
    pub const MAX_TURNS: i32 = 4;
    pub const GENERIC: i32 = 5;
}

/// Parse `argv` (excluding the program name) into `CliOptions`.
///
/// # Errors
/// Returns an error if a flag is unrecognized or a value-carrying flag is
/// missing its value or the value doesn't parse.
pub fn parse_args(argv: &[String]) -> Result<CliOptions> {
    let mut opts = CliOptions::default();
    let mut iter = argv.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--catalogue" => opts.catalogue = Some(PathBuf::from(next_value(&mut iter, "--catalogue")?)),
            "--seed" => opts.seed = Some(next_value(&mut iter, "--seed")?.parse().map_err(|_| anyhow::anyhow!("--seed wants an integer"))?),
            "--input" => opts.input = Some(PathBuf::from(next_value(&mut iter, "--input")?)),
            "--strict" => opts.strict = true,
            "--fail-on-death" => opts.fail_on_death = true,
            "--fail-on-parser-error" => opts.fail_on_parser_error = true,
            "--max-turns" => {
                opts.max_turns = Some(next_value(&mut iter, "--max-turns")?.parse().map_err(|_| anyhow::anyhow!("--max-turns wants an integer"))?)
            },
            "--quiet" => opts.quiet = true,
            "--ml" => opts.ml = true,
            "--ml-rewards" => opts.ml_rewards = true,
            other => bail!("unrecognized flag '{other}'"),
        }
    }
    if opts.strict {
        opts.fail_on_death = true;
        opts.fail_on_parser_error = true;
    }
    Ok(opts)
}

fn next_value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a str> {
    iter.next().map(String::as_str).ok_or_else(|| anyhow::anyhow!("{flag} requires a value"))
}

/// Run an interactive or scripted text session, returning the process exit
/// code (spec §6's contract table).
pub fn run_text_session(mut session: Session, opts: &CliOptions) -> Result<i32> {
    let mut turns = 0u64;
    let mut lines: Box<dyn Iterator<Item = io::Result<String>>> = match &opts.input {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            Box::new(io::BufReader::new(file).lines())
        },
        None => Box::new(io::BufReader::new(io::stdin()).lines()),
    };

    loop {
        if let Some(max) = opts.max_turns {
            if turns >= max {
                return Ok(exit_code::MAX_TURNS);
            }
        }
        let Some(line) = lines.next() else { break };
        let line = line?;
        let result = session.step(&line);
        if !opts.quiet {
            for message in &result.messages {
                println!("{message}");
            }
            io::stdout().flush()?;
        }
        if opts.fail_on_parser_error && result.messages.iter().any(|m| m.starts_with("I don't know")) {
            return Ok(exit_code::PARSER_ERROR);
        }
        if result.finished {
            if opts.fail_on_death && session.world.deaths > 0 && !session.world.won {
                return Ok(exit_code::DEATH);
            }
            return Ok(exit_code::SUCCESS);
        }
        turns += 1;
    }
    Ok(exit_code::SUCCESS)
}

/// `--ml` mode (spec §6): one JSON `StateSnapshot` per line of stdout, one
/// JSON `StructuredAction` per line expected from stdin. Reserved verbs
/// `reset` and `stats` are intercepted before reaching the session.
pub fn run_ml_session(mut session: Session, opts: &CliOptions) -> Result<i32> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let snapshot = session.snapshot();
    writeln!(stdout, "{}", serde_json::to_string(&MlFrame { snapshot: &snapshot, reward: None })?)?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "stats" {
            let snapshot = session.snapshot();
            writeln!(stdout, "{}", serde_json::to_string(&MlFrame { snapshot: &snapshot, reward: None })?)?;
            stdout.flush()?;
            continue;
        }
        if trimmed == "reset" {
            return Ok(exit_code::SUCCESS);
        }
        let action: StructuredAction = match serde_json::from_str(trimmed) {
            Ok(action) => action,
            Err(err) => {
                if opts.fail_on_parser_error {
                    return Ok(exit_code::PARSER_ERROR);
                }
                writeln!(stdout, "{{\"error\":\"{err}\"}}")?;
                stdout.flush()?;
                continue;
            },
        };
        let before = session.snapshot();
        session.execute_action(&action);
        let after = session.snapshot();
        let reward = opts.ml_rewards.then(|| session.reward_signals(&before, &after));
        writeln!(stdout, "{}", serde_json::to_string(&MlFrame { snapshot: &after, reward })?)?;
        stdout.flush()?;
        if session.finished {
            break;
        }
    }
    Ok(exit_code::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seed_and_max_turns() {
        let opts = parse_args(&["--seed".into(), "7".into(), "--max-turns".into(), "50".into()]).unwrap();
        assert_eq!(opts.seed, Some(7));
        assert_eq!(opts.max_turns, Some(50));
    }

    #[test]
    fn strict_implies_both_fail_flags() {
        let opts = parse_args(&["--strict".into()]).unwrap();
        assert!(opts.fail_on_death);
        assert!(opts.fail_on_parser_error);
    }

    #[test]
    fn unrecognized_flag_is_an_error() {
        assert!(parse_args(&["--bogus".into()]).is_err());
    }

    #[test]
    fn missing_value_is_an_error() {
        assert!(parse_args(&["--seed".into()]).is_err());
    }
}
