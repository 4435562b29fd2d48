//! The turn loop (spec §4.K): owns undo history and end-of-turn daemon
//! firing, and drives one line of input at a time through `dispatch.rs`.
//!
//! One step: read line, dispatch, check for death, advance NPCs, fire
//! scheduled events, check ambient triggers. `Session::step` exposes this
//! to any front end — CLI, tests, or otherwise — one line at a time,
//! rather than owning its own read loop tied to stdout.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use hollowgate_data::EventDef;
use log::info;
use serde::{Deserialize, Serialize};

use crate::action;
use crate::dispatch::{self, StepOutcome};
use crate::entity::{Container, Exit, Object};
use crate::movement;
use crate::scheduler::EventPayload;
use crate::score::{self, DeathOutcome};
use crate::trigger;
use crate::world::World;

/// How many prior world snapshots `undo` can step back through. A handful of
/// recent states rather than the whole history, since cloning the whole
/// `World` on every real move is the cost of the "single mutable struct"
/// design (spec §9, P4/P5).
const UNDO_DEPTH: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct StepResult {
    pub messages: Vec<String>,
    pub finished: bool,
}

pub struct Session {
    pub world: World,
    undo_stack: Vec<World>,
    pub finished: bool,
    last_message: String,
    seen_rooms: std::collections::HashSet<String>,
    seen_message_hashes: std::collections::HashSet<u64>,
}

/// Structured view of the world between turns (spec §6's `StateSnapshot`),
/// for headless/ML shells that don't want to scrape player-facing prose.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub score: isize,
    pub moves: u64,
    pub deaths: u32,
    pub room: RoomView,
    pub visible: Vec<ObjectView>,
    pub inventory: Vec<ObjectView>,
    pub exits: HashMap<String, String>,
    pub last_message: String,
    pub last_message_hash: u64,
    pub game_over: Option<String>,
    pub valid_actions: Vec<StructuredAction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub lit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectView {
    pub id: String,
    pub name: String,
    pub flags: Vec<String>,
    pub depth: u32,
}

/// Spec §6's structured action schema: a verb frame an ML shell can submit
/// without going through the text parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAction {
    pub verb: String,
    pub direction: Option<String>,
    pub direct_object: Option<String>,
    pub indirect_object: Option<String>,
    pub preposition: Option<String>,
}

impl StructuredAction {
    /// Render back into the plain-text surface syntax `dispatch.rs` already
    /// understands, so `execute_action` can reuse `step` rather than
    /// duplicating the dispatcher.
    fn to_command_line(&self) -> String {
        let mut line = self.verb.clone();
        if let Some(dir) = &self.direction {
            line.push(' ');
            line.push_str(dir);
        }
        if let Some(direct) = &self.direct_object {
            line.push(' ');
            line.push_str(direct);
        }
        if let Some(prep) = &self.preposition {
            line.push(' ');
            line.push_str(prep);
        }
        if let Some(indirect) = &self.indirect_object {
            line.push(' ');
            line.push_str(indirect);
        }
        line
    }
}

/// Spec §8's reward signals for an `--ml-rewards` shell: computed purely
/// from a before/after `StateSnapshot` pair plus the session's own novelty
/// sets, with no weighting baked in — shells pick their own weights.
#[derive(Debug, Clone, Serialize)]
pub struct RewardSignals {
    pub score_delta: isize,
    pub novel_room: bool,
    pub novel_message: bool,
    pub object_taken: bool,
    pub container_opened: bool,
    pub death: bool,
    pub valid_action: bool,
}

fn message_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

fn exit_target(exit: &Exit) -> Option<&str> {
    match exit {
        Exit::Direct { to } | Exit::Conditional { to, .. } | Exit::Door { to, .. } => Some(to.as_str()),
        Exit::Blocked { .. } | Exit::Functional { .. } => None,
    }
}

fn container_depth(world: &World, id: &str) -> u32 {
    let mut depth = 0;
    let Ok(start) = world.object(id) else { return 0 };
    let mut current = start.container.clone();
    loop {
        match current {
            Container::Object(parent) => {
                depth += 1;
                match world.objects.get(&parent) {
                    Some(obj) => current = obj.container.clone(),
                    None => break,
                }
            },
            _ => break,
        }
    }
    depth
}

fn object_view(world: &World, obj: &Object) -> ObjectView {
    ObjectView {
        id: obj.id.clone(),
        name: obj.name.clone(),
        flags: obj.flags.iter().map(|f| format!("{f:?}").to_lowercase()).collect(),
        depth: container_depth(world, &obj.id),
    }
}

impl Session {
    pub fn new(world: World) -> Self {
        Self {
            world,
            undo_stack: Vec::new(),
            finished: false,
            last_message: String::new(),
            seen_rooms: std::collections::HashSet::new(),
            seen_message_hashes: std::collections::HashSet::new(),
        }
    }

    fn push_undo(&mut self) {
        if self.undo_stack.len() >= UNDO_DEPTH {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(self.world.clone());
    }

    fn undo(&mut self) -> Option<String> {
        self.undo_stack.pop().map(|snapshot| {
            self.world = snapshot;
            "Undone.".to_string()
        })
    }

    /// Process one line of player input, running the full spec §4.K
    /// sequence: skip blank/comment lines, snapshot for undo, dispatch,
    /// and (for real moves only) advance daemons, NPCs, and triggers.
    pub fn step(&mut self, input: &str) -> StepResult {
        let result = self.step_impl(input);
        if !result.messages.is_empty() {
            self.last_message = result.messages.join("\n");
        }
        result
    }

    fn step_impl(&mut self, input: &str) -> StepResult {
        if self.finished {
            return StepResult { messages: vec!["The game has ended.".into()], finished: true };
        }

        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            return StepResult::default();
        }

        if trimmed.eq_ignore_ascii_case("undo") {
            let message = self.undo().unwrap_or_else(|| "Nothing to undo.".to_string());
            return StepResult { messages: vec![message], finished: false };
        }

        let is_meta = matches!(
            crate::parser::parse(trimmed),
            Ok(
                crate::parser::ParsedCommand::Quit
                    | crate::parser::ParsedCommand::Help
                    | crate::parser::ParsedCommand::Score
                    | crate::parser::ParsedCommand::Diagnostics
                    | crate::parser::ParsedCommand::Undo
                    | crate::parser::ParsedCommand::Again
                    | crate::parser::ParsedCommand::Save(_)
                    | crate::parser::ParsedCommand::Restore(_)
            )
        );
        if !is_meta {
            self.push_undo();
        }

        let StepOutcome { mut messages, is_move, quit } = dispatch::dispatch(&mut self.world, trimmed, self.world.moves);

        if quit {
            self.finished = true;
            return StepResult { messages, finished: true };
        }

        if is_move {
            self.world.moves += 1;
            self.run_combat_daemon(&mut messages);
            if self.finished {
                return StepResult { messages, finished: true };
            }
            movement::advance_npc_movement(&mut self.world, self.world.moves);
            self.run_scheduled_events(&mut messages);
            let turn = self.world.moves;
            if let Ok(fired) = trigger::check_ambient_triggers(&mut self.world, turn) {
                messages.extend(fired.into_iter().map(|n| format!("[{n}]")));
            }
            self.check_darkness_death(&mut messages);
            self.check_win(&mut messages);
        }

        StepResult { messages, finished: self.finished }
    }

    /// Spec §4.H: the combat daemon always fires first, before NPC movement
    /// or scheduled events. A villain the player is still fighting gets one
    /// automatic blow back each turn the fight hasn't ended.
    fn run_combat_daemon(&mut self, messages: &mut Vec<String>) {
        let Some(villain_id) = self.world.winner.last_villain_fought.clone() else {
            return;
        };
        let still_fighting = self.world.object(&villain_id).map(|o| o.is_villain()).unwrap_or(false);
        if !still_fighting {
            self.world.winner.last_villain_fought = None;
            return;
        }
        let profile = crate::combat::VillainProfile { id: villain_id.clone(), best_weapon: None, best_adv: 2 };
        if let Ok(report) = crate::combat::villain_blow(&mut self.world, &profile) {
            messages.push(format!("The {villain_id} attacks you: {:?}.", report.outcome));
        }
        if self.world.winner.strength <= 0 {
            self.handle_player_death(messages, false);
        }
    }

    fn run_scheduled_events(&mut self, messages: &mut Vec<String>) {
        let now = self.world.moves;
        while let Some(event) = self.world.scheduler.pop_due(now) {
            info!("daemon fired: {}", event.name);
            match &event.payload {
                Some(EventPayload::Actions(actions)) => {
                    for action_def in actions.clone() {
                        if let Ok(lines) = action::execute_action(&mut self.world, &action_def, now) {
                            messages.extend(lines);
                        }
                    }
                },
                Some(EventPayload::Daemon(name)) => {
                    if let Err(err) = crate::daemon::run_named_daemon(&mut self.world, name, messages) {
                        info!("daemon '{name}' failed: {err}");
                    }
                },
                None => {},
            }
            self.world.scheduler.rearm(event, now);
        }
    }

    /// One more move in a dark room kills the player outright (spec §4.G's
    /// grue rule) — a fatal ending, not subject to the 3-death resurrection
    /// budget.
    fn check_darkness_death(&mut self, messages: &mut Vec<String>) {
        if self.world.lit {
            self.world.remove_flag("grue-watch");
            return;
        }
        if self.world.flag("grue-watch").is_some() {
            messages.push("Oh, no! A lurking grue has got you!".to_string());
            self.handle_player_death(messages, true);
            return;
        }
        self.world.set_flag_simple("grue-watch");
    }

    fn handle_player_death(&mut self, messages: &mut Vec<String>, fatal: bool) {
        let resurrection_room = self.world.resurrection_room.clone();
        let scatter_room = self.world.scatter_room.clone();
        match score::jigs_up(&mut self.world, &resurrection_room, &scatter_room, fatal) {
            DeathOutcome::Resurrected => messages.push(format!(
                "You wake up in {}, a little worse for wear ({} death{} so far).",
                resurrection_room,
                self.world.deaths,
                if self.world.deaths == 1 { "" } else { "s" }
            )),
            DeathOutcome::GameOverPermadeath => {
                messages.push("This time, you really have died.".to_string());
                self.finished = true;
            },
            DeathOutcome::GameOverFatal => {
                messages.push("*** You have died. ***".to_string());
                self.finished = true;
            },
        }
        if let Ok(fired) = trigger::check_triggers(&mut self.world, &[EventDef::PlayerDeath], self.world.moves) {
            messages.extend(fired.into_iter().map(|n| format!("[{n}]")));
        }
    }

    fn check_win(&mut self, messages: &mut Vec<String>) {
        let score_max = self.world.score_max;
        if score::score_update(&mut self.world, 0, score_max) {
            messages.push(format!("You have won, with a score of {} in {} moves!", self.world.score, self.world.moves));
            self.finished = true;
        }
    }

    /// Structured view of the world between turns (spec §6), for shells that
    /// want state as data rather than scraping player-facing prose.
    pub fn snapshot(&self) -> StateSnapshot {
        let room = self.world.current_room().ok();
        let exits = room
            .map(|r| r.exits.iter().filter_map(|(dir, exit)| exit_target(exit).map(|to| (dir.clone(), to.to_string()))).collect())
            .unwrap_or_default();
        let visible = crate::visibility::visible_to_player(&self.world).into_iter().map(|o| object_view(&self.world, o)).collect();
        let inventory = self.world.inventory().into_iter().map(|o| object_view(&self.world, o)).collect();
        let game_over = if !self.finished {
            None
        } else if self.world.won {
            Some("won".to_string())
        } else if self.world.deaths >= self.world.max_deaths {
            Some("dead".to_string())
        } else {
            Some("quit".to_string())
        };

        StateSnapshot {
            score: self.world.score,
            moves: self.world.moves,
            deaths: self.world.deaths,
            room: RoomView {
                id: room.map(|r| r.id.clone()).unwrap_or_default(),
                name: room.map(|r| r.name.clone()).unwrap_or_default(),
                desc: room.map(|r| r.desc.clone()).unwrap_or_default(),
                lit: self.world.lit,
            },
            visible,
            inventory,
            exits,
            last_message: self.last_message.clone(),
            last_message_hash: message_hash(&self.last_message),
            game_over,
            valid_actions: self.valid_actions(),
        }
    }

    /// Every structured action currently legal from this exact state,
    /// derived purely from the snapshot's room/inventory/exits (spec §6).
    pub fn valid_actions(&self) -> Vec<StructuredAction> {
        if self.finished {
            return Vec::new();
        }
        let meta = |verb: &str| StructuredAction {
            verb: verb.to_string(),
            direction: None,
            direct_object: None,
            indirect_object: None,
            preposition: None,
        };
        let mut actions = vec![meta("look"), meta("inventory"), meta("wait"), meta("quit")];

        if let Ok(room) = self.world.current_room() {
            for (direction, exit) in &room.exits {
                if exit_target(exit).is_some() {
                    actions.push(StructuredAction {
                        verb: "go".to_string(),
                        direction: Some(direction.clone()),
                        direct_object: None,
                        indirect_object: None,
                        preposition: None,
                    });
                }
            }
        }

        let touchable = crate::visibility::touchable_to_player(&self.world);
        for obj in &touchable {
            actions.push(StructuredAction {
                verb: "examine".to_string(),
                direction: None,
                direct_object: Some(obj.id.clone()),
                indirect_object: None,
                preposition: None,
            });
            let verb = if obj.container == Container::Winner { "drop" } else { "take" };
            actions.push(StructuredAction {
                verb: verb.to_string(),
                direction: None,
                direct_object: Some(obj.id.clone()),
                indirect_object: None,
                preposition: None,
            });
            if obj.is_villain() {
                actions.push(StructuredAction {
                    verb: "attack".to_string(),
                    direction: None,
                    direct_object: Some(obj.id.clone()),
                    indirect_object: None,
                    preposition: None,
                });
            }
        }
        actions
    }

    pub fn action_count(&self) -> usize {
        self.valid_actions().len()
    }

    /// Parallel to `step`, but the input is already a verb frame rather than
    /// free text — used by headless/ML shells (spec §6). Rendered back into
    /// the dispatcher's plain-text surface syntax and driven through the
    /// same `step` path so it gets identical undo/daemon/trigger handling.
    pub fn execute_action(&mut self, action: &StructuredAction) -> StepResult {
        self.step(&action.to_command_line())
    }

    /// Score `before`/`after` snapshots bracketing one `step`/`execute_action`
    /// call (spec §8). `novel_room`/`novel_message` consult (and update) the
    /// session's own remembered sets, so repeats within one run report false.
    pub fn reward_signals(&mut self, before: &StateSnapshot, after: &StateSnapshot) -> RewardSignals {
        let novel_room = self.seen_rooms.insert(after.room.id.clone());
        let novel_message = self.seen_message_hashes.insert(after.last_message_hash);
        RewardSignals {
            score_delta: after.score - before.score,
            novel_room,
            novel_message,
            object_taken: after.inventory.len() > before.inventory.len(),
            container_opened: after.last_message.to_lowercase().contains("open"),
            death: after.deaths > before.deaths,
            valid_action: !after.last_message.starts_with("I don't know") && !after.last_message.starts_with("You can't"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests_support::bare_world;

    #[test]
    fn blank_line_is_a_no_op() {
        let mut session = Session::new(bare_world());
        let result = session.step("   ");
        assert!(result.messages.is_empty());
        assert!(!result.finished);
    }

    #[test]
    fn comment_line_is_a_no_op() {
        let mut session = Session::new(bare_world());
        let result = session.step("; a note to self");
        assert!(result.messages.is_empty());
    }

    #[test]
    fn quit_ends_the_session() {
        let mut session = Session::new(bare_world());
        let result = session.step("quit");
        assert!(result.finished);
        assert!(session.finished);
    }

    #[test]
    fn meta_verb_does_not_advance_moves() {
        let mut session = Session::new(bare_world());
        session.step("score");
        assert_eq!(session.world.moves, 0);
    }

    #[test]
    fn undo_restores_previous_world_state() {
        let mut session = Session::new(bare_world());
        session.world.award_points(5);
        session.step("wait");
        assert_eq!(session.world.moves, 1);
        let result = session.step("undo");
        assert_eq!(result.messages[0], "Undone.");
        assert_eq!(session.world.moves, 0);
    }

    #[test]
    fn snapshot_reports_score_and_moves() {
        let mut session = Session::new(bare_world());
        session.step("wait");
        let snapshot = session.snapshot();
        assert_eq!(snapshot.moves, 1);
        assert!(snapshot.game_over.is_none());
    }

    #[test]
    fn valid_actions_always_includes_the_metaverbs() {
        let session = Session::new(bare_world());
        let verbs: Vec<&str> = session.valid_actions().iter().map(|a| a.verb.as_str()).collect();
        assert!(verbs.contains(&"look"));
        assert!(verbs.contains(&"quit"));
        assert_eq!(session.action_count(), session.valid_actions().len());
    }

    #[test]
    fn execute_action_drives_the_same_path_as_step() {
        let mut session = Session::new(bare_world());
        let action = StructuredAction {
            verb: "wait".to_string(),
            direction: None,
            direct_object: None,
            indirect_object: None,
            preposition: None,
        };
        session.execute_action(&action);
        assert_eq!(session.world.moves, 1);
    }

    #[test]
    fn reward_signals_reports_score_delta_and_death() {
        let mut session = Session::new(bare_world());
        let before = session.snapshot();
        session.world.award_points(5);
        let after = session.snapshot();
        let reward = session.reward_signals(&before, &after);
        assert_eq!(reward.score_delta, 5);
        assert!(!reward.death);
    }

    #[test]
    fn reward_signals_novel_room_is_false_on_repeat() {
        let mut session = Session::new(bare_world());
        let snapshot = session.snapshot();
        assert!(session.reward_signals(&snapshot, &snapshot).novel_room);
        assert!(!session.reward_signals(&snapshot, &snapshot).novel_room);
    }
}
