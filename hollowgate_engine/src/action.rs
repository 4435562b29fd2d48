//! Action-fn protocol (spec §4.E): executes the catalogue's declarative
//! `ActionKind` tree against a `World`, and evaluates the `ConditionExpr`
//! boolean trees gating triggers, exits, and goals.
//!
//! Spec §9 rejects "action hooks as closures" in favor of a tagged variant
//! plus registry/interpreter: a two-phase condition-evaluate / action-
//! execute split, keyed by catalogue `Id` strings rather than opaque
//! runtime handles.

use anyhow::{Result, anyhow};
use hollowgate_data::{ActionDef, ActionKind, ConditionDef, ConditionExpr, FlagDef, NpcState, OnFalsePolicy};
use log::warn;

use crate::entity::{Container, ContainerState};
use crate::flags::Flag;
use crate::scheduler::DaemonKind;
use crate::world::World;

fn map_container_state(state: hollowgate_data::ContainerState) -> ContainerState {
    use hollowgate_data::ContainerState as D;
    match state {
        D::Open => ContainerState::Open,
        D::Closed => ContainerState::Closed,
        D::Locked => ContainerState::Locked,
        D::TransparentOpen => ContainerState::TransparentOpen,
        D::TransparentClosed => ContainerState::TransparentClosed,
        D::TransparentLocked => ContainerState::TransparentLocked,
    }
}

/// Takes `&mut World` because `ChancePercent` must draw from the shared RNG
/// to stay deterministic across save/restore — a read-only evaluator would
/// have to fork an independent RNG, which is exactly the non-determinism
/// bug this engine is built to avoid (spec §9, P6).
pub fn eval_condition(world: &mut World, expr: &ConditionExpr) -> bool {
    match expr {
        ConditionExpr::All(kids) => kids.iter().all(|kid| eval_condition(world, kid)),
        ConditionExpr::Any(kids) => kids.iter().any(|kid| eval_condition(world, kid)),
        ConditionExpr::Pred(pred) => eval_predicate(world, pred),
    }
}

fn eval_predicate(world: &mut World, pred: &ConditionDef) -> bool {
    match pred {
        ConditionDef::HasFlag { flag } => world.flag(flag).is_some(),
        ConditionDef::MissingFlag { flag } => world.flag(flag).is_none(),
        ConditionDef::FlagInProgress { flag } => world.flag(flag).map(|f| f.is_in_progress()).unwrap_or(false),
        ConditionDef::FlagComplete { flag } => world.flag(flag).map(|f| f.is_complete()).unwrap_or(false),
        ConditionDef::HasItem { item } => world.inventory().iter().any(|o| &o.id == item),
        ConditionDef::MissingItem { item } => !world.inventory().iter().any(|o| &o.id == item),
        ConditionDef::HasVisited { room } => world.visited_rooms.contains(room),
        ConditionDef::PlayerInRoom { room } => &world.winner.here == room,
        ConditionDef::WithNpc { npc } => world.object_room(npc).as_deref() == Some(world.winner.here.as_str()),
        ConditionDef::NpcHasItem { npc, item } => {
            world.contents_of(&Container::Object(npc.clone())).iter().any(|o| &o.id == item)
        },
        ConditionDef::NpcInState { npc, state } => world.object(npc).ok().and_then(|o| o.npc_state.as_ref()) == Some(state),
        ConditionDef::ContainerHasItem { container, item } => {
            world.contents_of(&Container::Object(container.clone())).iter().any(|o| &o.id == item)
        },
        ConditionDef::ChancePercent { percent } => world.rng.chance_percent(*percent),
        ConditionDef::Ambient { spinner: _, rooms } => rooms.as_ref().is_none_or(|rooms| rooms.contains(&world.winner.here)),
    }
}

fn apply_flag_def(world: &mut World, flag: &FlagDef) {
    match flag {
        FlagDef::Simple { name } => world.set_flag_simple(name),
        FlagDef::Sequence { name, end } => world.advance_flag(name, end.unwrap_or(1)),
    }
}

/// Execute one declarative action, returning any message lines it produced
/// for the per-turn output buffer (spec §9's design note on text emission).
pub fn execute_action(world: &mut World, action: &ActionDef, current_turn: u64) -> Result<Vec<String>> {
    execute_kind(world, &action.action, current_turn)
}

fn execute_kind(world: &mut World, kind: &ActionKind, current_turn: u64) -> Result<Vec<String>> {
    let mut out = Vec::new();
    match kind {
        ActionKind::ShowMessage { text } => out.push(text.clone()),
        ActionKind::DenyRead { reason } => out.push(reason.clone()),
        ActionKind::AddFlag { flag } => apply_flag_def(world, flag),
        ActionKind::AdvanceFlag { name } => world.advance_flag(name, u8::MAX),
        ActionKind::RemoveFlag { name } => world.remove_flag(name),
        ActionKind::ResetFlag { name } => world.remove_flag(name),
        ActionKind::AwardPoints { amount, reason } => {
            world.award_points(*amount);
            out.push(format!("[Your score has just increased by {amount} points. {reason}]"));
        },
        ActionKind::DamagePlayer { amount, .. } => world.winner.health.damage(*amount),
        ActionKind::DamagePlayerOT { amount, turns, cause } => world.winner.health.add_effect(
            crate::health::HealthEffect::DamageOverTime {
                amount: *amount,
                turns_left: *turns,
                cause: cause.clone(),
            },
        ),
        ActionKind::HealPlayer { amount, .. } => world.winner.health.heal(*amount),
        ActionKind::HealPlayerOT { amount, turns, cause } => world.winner.health.add_effect(
            crate::health::HealthEffect::HealOverTime {
                amount: *amount,
                turns_left: *turns,
                cause: cause.clone(),
            },
        ),
        ActionKind::RemovePlayerEffect { cause } => world.winner.health.remove_effects_with_cause(cause),
        ActionKind::DamageNpc { npc, amount, .. } => {
            if let Ok(obj) = world.object_mut(npc) {
                if let Some(health) = &mut obj.health {
                    health.damage(*amount);
                }
            }
        },
        ActionKind::DamageNpcOT { npc, amount, turns, cause } => {
            if let Ok(obj) = world.object_mut(npc) {
                if let Some(health) = &mut obj.health {
                    health.add_effect(crate::health::HealthEffect::DamageOverTime {
                        amount: *amount,
                        turns_left: *turns,
                        cause: cause.clone(),
                    });
                }
            }
        },
        ActionKind::HealNpc { npc, amount, .. } => {
            if let Ok(obj) = world.object_mut(npc) {
                if let Some(health) = &mut obj.health {
                    health.heal(*amount);
                }
            }
        },
        ActionKind::HealNpcOT { npc, amount, turns, cause } => {
            if let Ok(obj) = world.object_mut(npc) {
                if let Some(health) = &mut obj.health {
                    health.add_effect(crate::health::HealthEffect::HealOverTime {
                        amount: *amount,
                        turns_left: *turns,
                        cause: cause.clone(),
                    });
                }
            }
        },
        ActionKind::RemoveNpcEffect { npc, cause } => {
            if let Ok(obj) = world.object_mut(npc) {
                if let Some(health) = &mut obj.health {
                    health.remove_effects_with_cause(cause);
                }
            }
        },
        ActionKind::SetNpcActive { npc, active } => {
            if let Ok(obj) = world.object_mut(npc) {
                if let Some(movement) = &mut obj.movement {
                    movement.active = *active;
                }
            }
        },
        ActionKind::SetNpcState { npc, state } => {
            if let Ok(obj) = world.object_mut(npc) {
                obj.npc_state = Some(map_npc_state(state));
            }
        },
        ActionKind::NpcSays { npc, quote } => out.push(format!("{npc} says, \"{quote}\"")),
        ActionKind::NpcSaysRandom { npc } => {
            if let Ok(obj) = world.object(npc) {
                let state = obj.npc_state.clone().unwrap_or(map_npc_state(&NpcState::Normal));
                if let Some(lines) = obj.dialogue.get(&state).cloned() {
                    let name = obj.name.clone();
                    if let Some(line) = world.rng.choose(&lines) {
                        out.push(format!("{name} says, \"{line}\""));
                    }
                }
            }
        },
        ActionKind::NpcRefuseItem { npc, reason } => out.push(format!("{npc} refuses: {reason}")),
        ActionKind::GiveItemToPlayer { item, .. } => {
            world.move_object(item, Container::Winner)?;
        },
        ActionKind::PushPlayerTo { room } => world.winner.here = room.clone(),
        ActionKind::AddSpinnerWedge { spinner, text, width } => {
            world.spinners.entry(spinner.clone()).or_default().push((*width, text.clone()));
        },
        ActionKind::SpinnerMessage { spinner } => {
            if let Some(text) = world.spin(spinner) {
                out.push(text);
            } else {
                warn!("spinner '{spinner}' has no wedges loaded");
            }
        },
        ActionKind::SpawnItemCurrentRoom { item } => {
            let here = world.winner.here.clone();
            world.move_object(item, Container::Room(here))?;
        },
        ActionKind::SpawnItemInRoom { item, room } => world.move_object(item, Container::Room(room.clone()))?,
        ActionKind::SpawnItemInInventory { item } => world.move_object(item, Container::Winner)?,
        ActionKind::SpawnItemInContainer { item, container } => {
            world.move_object(item, Container::Object(container.clone()))?
        },
        ActionKind::SpawnNpcInRoom { npc, room } => world.move_object(npc, Container::Room(room.clone()))?,
        ActionKind::DespawnItem { item } | ActionKind::DespawnNpc { npc: item } => {
            world.move_object(item, Container::Limbo)?
        },
        ActionKind::ReplaceItem { old_item, new_item } | ActionKind::ReplaceDropItem { old_item, new_item } => {
            let dest = world.object(old_item)?.container.clone();
            world.move_object(old_item, Container::Limbo)?;
            world.move_object(new_item, dest)?;
        },
        ActionKind::LockItem { item } => set_container_state(world, item, ContainerState::Locked)?,
        ActionKind::UnlockItem { item } => {
            let current = world.object(item)?.container_state.clone();
            let next = match current {
                Some(ContainerState::TransparentLocked) => ContainerState::TransparentClosed,
                _ => ContainerState::Closed,
            };
            set_container_state(world, item, next)?;
        },
        ActionKind::SetContainerState { item, state } => {
            world.object_mut(item)?.container_state = state.map(map_container_state);
        },
        ActionKind::SetItemDescription { item, text } => world.object_mut(item)?.desc = text.clone(),
        ActionKind::SetItemMovability { .. } => {},
        ActionKind::LockExit { from_room, direction } => lock_exit(world, from_room, direction, true)?,
        ActionKind::UnlockExit { from_room, direction } => lock_exit(world, from_room, direction, false)?,
        ActionKind::RevealExit { exit_from, exit_to, direction } => {
            world
                .room_mut(exit_from)?
                .exits
                .insert(direction.clone(), crate::entity::Exit::Direct { to: exit_to.clone() });
        },
        ActionKind::SetBarredMessage { exit_from, direction, msg } => {
            if let Some(crate::entity::Exit::Blocked { message }) = world.room_mut(exit_from)?.exits.get_mut(direction) {
                *message = msg.clone();
            }
        },
        ActionKind::ModifyItem { item, patch } => {
            let obj = world.object_mut(item)?;
            if let Some(name) = &patch.name {
                obj.name = name.clone();
            }
            if let Some(desc) = &patch.desc {
                obj.desc = desc.clone();
            }
            if let Some(text) = &patch.text {
                obj.text = Some(text.clone());
            }
        },
        ActionKind::ModifyRoom { room, patch } => {
            let r = world.room_mut(room)?;
            if let Some(name) = &patch.name {
                r.name = name.clone();
            }
            if let Some(desc) = &patch.desc {
                r.desc = desc.clone();
            }
            for dir in &patch.remove_exits {
                r.exits.remove(dir);
            }
        },
        ActionKind::ModifyNpc { npc, patch } => {
            let obj = world.object_mut(npc)?;
            if let Some(name) = &patch.name {
                obj.name = name.clone();
            }
            if let Some(desc) = &patch.desc {
                obj.desc = desc.clone();
            }
            if let Some(state) = &patch.state {
                obj.npc_state = Some(map_npc_state(state));
            }
        },
        ActionKind::Conditional { condition, actions } => {
            if eval_condition(world, condition) {
                for action in actions {
                    out.extend(execute_kind(world, &action.action, current_turn)?);
                }
            }
        },
        ActionKind::ScheduleIn { turns_ahead, actions, note } => {
            schedule_batch(world, current_turn + *turns_ahead as u64, actions.clone(), note.clone());
        },
        ActionKind::ScheduleOn { on_turn, actions, note } => {
            schedule_batch(world, *on_turn as u64, actions.clone(), note.clone());
        },
        ActionKind::ScheduleInIf { turns_ahead, condition, on_false, actions, note } => {
            schedule_conditional(world, current_turn, current_turn + *turns_ahead as u64, condition, on_false, actions.clone(), note.clone());
        },
        ActionKind::ScheduleOnIf { on_turn, condition, on_false, actions, note } => {
            schedule_conditional(world, current_turn, *on_turn as u64, condition, on_false, actions.clone(), note.clone());
        },
    }
    Ok(out)
}

fn schedule_batch(world: &mut World, due: u64, actions: Vec<ActionDef>, note: Option<String>) {
    world.scheduler.schedule_on(
        due,
        "scheduled-actions".to_string(),
        Some(DaemonKind::OneShot),
        Some(crate::scheduler::EventPayload::Actions(actions)),
        note,
    );
}

fn schedule_conditional(
    world: &mut World,
    now: u64,
    due: u64,
    condition: &ConditionExpr,
    on_false: &OnFalsePolicy,
    actions: Vec<ActionDef>,
    note: Option<String>,
) {
    if eval_condition(world, condition) {
        schedule_batch(world, due, actions, note);
        return;
    }
    match on_false {
        OnFalsePolicy::Cancel => {},
        OnFalsePolicy::RetryNextTurn => schedule_batch(world, now + 1, actions, note),
        OnFalsePolicy::RetryAfter { turns } => schedule_batch(world, now + *turns as u64, actions, note),
    }
}

fn set_container_state(world: &mut World, item: &str, state: ContainerState) -> Result<()> {
    world.object_mut(item)?.container_state = Some(state);
    Ok(())
}

fn lock_exit(world: &mut World, from_room: &str, direction: &str, locked: bool) -> Result<()> {
    let room = world.room_mut(from_room)?;
    let exit = room
        .exits
        .get_mut(direction)
        .ok_or_else(|| anyhow!("room '{from_room}' has no '{direction}' exit to lock/unlock"))?;
    if let crate::entity::Exit::Door { door, .. } = exit {
        let door_id = door.clone();
        drop(exit);
        let obj = world.object_mut(&door_id)?;
        let next = if locked { ContainerState::Locked } else { ContainerState::Closed };
        obj.container_state = Some(next);
    }
    Ok(())
}

fn map_npc_state(state: &NpcState) -> NpcState {
    state.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests_support::bare_world;
    use hollowgate_data::ConditionDef;

    #[test]
    fn award_points_action_increments_score() {
        let mut world = bare_world();
        let action = ActionDef {
            action: ActionKind::AwardPoints { amount: 10, reason: "test".into() },
            priority: None,
        };
        execute_action(&mut world, &action, 0).unwrap();
        assert_eq!(world.score, 10);
    }

    #[test]
    fn conditional_action_only_fires_when_condition_holds() {
        let mut world = bare_world();
        let inner = ActionDef {
            action: ActionKind::AwardPoints { amount: 5, reason: "bonus".into() },
            priority: None,
        };
        let action = ActionDef {
            action: ActionKind::Conditional {
                condition: ConditionExpr::Pred(ConditionDef::HasFlag { flag: "won-the-day".into() }),
                actions: vec![inner],
            },
            priority: None,
        };
        execute_action(&mut world, &action, 0).unwrap();
        assert_eq!(world.score, 0);
        world.set_flag_simple("won-the-day");
        execute_action(&mut world, &action, 0).unwrap();
        assert_eq!(world.score, 5);
    }
}
