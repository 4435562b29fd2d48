//! Goal progress evaluation (spec §4.F's scoring-adjacent tracking layer).
//!
//! Status is computed on demand from current world state rather than stored
//! and incrementally updated, so there's nothing to keep in sync when flags
//! or inventory change.

use hollowgate_data::{GoalCondition, GoalDef};

use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    Inactive,
    Active,
    Complete,
    Failed,
}

fn condition_satisfied(world: &World, condition: &GoalCondition) -> bool {
    match condition {
        GoalCondition::HasItem { item } => world.inventory().iter().any(|o| &o.id == item),
        GoalCondition::HasFlag { flag } => world.flag(flag).is_some(),
        GoalCondition::MissingFlag { flag } => world.flag(flag).is_none(),
        GoalCondition::ReachedRoom { room } => world.room(room).map(|r| r.visited).unwrap_or(false),
        GoalCondition::GoalComplete { goal_id } => world
            .goals
            .iter()
            .find(|g| &g.id == goal_id)
            .is_some_and(|g| goal_status(world, g) == GoalStatus::Complete),
        GoalCondition::FlagInProgress { flag } => world.flag(flag).map(|f| f.is_in_progress()).unwrap_or(false),
        GoalCondition::FlagComplete { flag } => world.flag(flag).map(|f| f.is_complete()).unwrap_or(false),
    }
}

/// Compute a goal's current status. Failure takes priority over
/// completion, which takes priority over activation.
pub fn goal_status(world: &World, goal: &GoalDef) -> GoalStatus {
    if let Some(fail) = &goal.failed_when {
        if condition_satisfied(world, fail) {
            return GoalStatus::Failed;
        }
    }
    match &goal.activate_when {
        Some(start) if !condition_satisfied(world, start) => GoalStatus::Inactive,
        _ => {
            if condition_satisfied(world, &goal.finished_when) {
                GoalStatus::Complete
            } else {
                GoalStatus::Active
            }
        },
    }
}

pub fn active_and_complete_counts(world: &World) -> (usize, usize) {
    let statuses: Vec<GoalStatus> = world.goals.iter().map(|g| goal_status(world, g)).collect();
    let active = statuses.iter().filter(|s| **s == GoalStatus::Active).count();
    let complete = statuses.iter().filter(|s| **s == GoalStatus::Complete).count();
    (active, complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests_support::bare_world;
    use hollowgate_data::GoalGroup;

    fn goal(id: &str, finished_when: GoalCondition) -> GoalDef {
        GoalDef {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            group: GoalGroup::Required,
            activate_when: None,
            finished_when,
            failed_when: None,
        }
    }

    #[test]
    fn goal_completes_once_flag_is_set() {
        let mut world = bare_world();
        let g = goal("light-lamp", GoalCondition::HasFlag { flag: "lamp-lit".into() });
        assert_eq!(goal_status(&world, &g), GoalStatus::Active);
        world.set_flag_simple("lamp-lit");
        assert_eq!(goal_status(&world, &g), GoalStatus::Complete);
    }

    #[test]
    fn failed_when_takes_priority_over_finished_when() {
        let mut world = bare_world();
        let mut g = goal("stay-alive", GoalCondition::HasFlag { flag: "won".into() });
        g.failed_when = Some(GoalCondition::HasFlag { flag: "dead".into() });
        world.set_flag_simple("won");
        world.set_flag_simple("dead");
        assert_eq!(goal_status(&world, &g), GoalStatus::Failed);
    }

    #[test]
    fn inactive_until_activation_condition_holds() {
        let mut world = bare_world();
        let mut g = goal("endgame", GoalCondition::HasFlag { flag: "won".into() });
        g.activate_when = Some(GoalCondition::HasFlag { flag: "near-end".into() });
        assert_eq!(goal_status(&world, &g), GoalStatus::Inactive);
        world.set_flag_simple("near-end");
        assert_eq!(goal_status(&world, &g), GoalStatus::Active);
    }
}
