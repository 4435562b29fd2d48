#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

use std::io::Write;

use anyhow::{Context, Result};
use colored::Colorize;
use env_logger::Env;
use log::info;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use textwrap::{fill, termwidth};

use hollowgate_engine::cli::{self, exit_code};
use hollowgate_engine::loader;
use hollowgate_engine::rng::Rng;
use hollowgate_engine::turn::Session;
use hollowgate_engine::world::World;

const DEFAULT_CATALOGUE: &str = include_str!("../data/world.toml");

fn main() -> Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let opts = match cli::parse_args(&argv) {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(exit_code::GENERIC);
        },
    };

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).format_timestamp(None).init();

    let mut world = match &opts.catalogue {
        Some(path) => loader::load_world_from_path(path).with_context(|| format!("loading catalogue from '{}'", path.display()))?,
        None => loader::load_world_from_str(DEFAULT_CATALOGUE).context("loading bundled catalogue")?,
    };
    info!("world '{}' loaded", world.title);

    if let Some(seed) = opts.seed {
        world.rng = Rng::new(seed);
    }

    let code = if opts.ml {
        run_ml(world, &opts)?
    } else {
        run_interactive(world, &opts)?
    };
    std::process::exit(code);
}

fn run_ml(world: World, opts: &cli::CliOptions) -> Result<i32> {
    let session = Session::new(world);
    cli::run_ml_session(session, opts)
}

fn run_interactive(world: World, opts: &cli::CliOptions) -> Result<i32> {
    if opts.input.is_some() {
        let session = Session::new(world);
        return cli::run_text_session(session, opts);
    }

    print!("\x1B[2J\x1B[H");
    std::io::stdout().flush().expect("failed to flush stdout after clearing the screen");

    println!("{:^width$}", world.title.bright_yellow().underline(), width = termwidth());
    println!("\n{}\n", fill(format!("You are {}.", world.winner.name).as_str(), termwidth()));

    let mut session = Session::new(world);
    let mut editor = DefaultEditor::new().context("initializing readline editor")?;
    let mut turns = 0u64;

    loop {
        if let Some(max) = opts.max_turns {
            if turns >= max {
                return Ok(exit_code::MAX_TURNS);
            }
        }
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let _ = editor.add_history_entry(line.as_str());
        let result = session.step(&line);
        if !opts.quiet {
            for message in &result.messages {
                println!("{}", fill(message, termwidth()));
            }
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
