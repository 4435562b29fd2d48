//! Combat state machine (spec §4.I): roll one blow against an outcome
//! table keyed by the attacker/defender strength differential, then apply
//! the wound. Strength changes saturate and a combatant is retired once
//! reduced to zero, matching `health.rs`'s wound-accounting style.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::entity::{Container, EntityId};
use crate::flags::Flag;
use crate::world::World;

pub const STRENGTH_MIN: i32 = 1;
pub const STRENGTH_MAX: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatOutcome {
    Missed,
    Stagger,
    LightWound,
    SeriousWound,
    Unconscious,
    Killed,
    LoseWeapon,
}

/// Villain catalogue record, matching spec's `Villain { id, best_weapon?,
/// best_adv, wake_prob, messages }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VillainProfile {
    pub id: EntityId,
    pub best_weapon: Option<EntityId>,
    pub best_adv: i32,
}

#[derive(Debug, Clone)]
pub struct BlowReport {
    pub outcome: CombatOutcome,
    pub attacker: EntityId,
    pub defender: EntityId,
    pub weapon: Option<EntityId>,
}

/// `STRENGTH_MIN + score / (score_max / (STRENGTH_MAX - STRENGTH_MIN)) + wound_modifier`,
/// clamped to `[STRENGTH_MIN, STRENGTH_MAX]`.
pub fn player_fight_strength(world: &World, score_max: isize) -> i32 {
    let span = STRENGTH_MAX - STRENGTH_MIN;
    let score_term = if score_max > 0 {
        (world.score as f64 / (score_max as f64 / span as f64)) as i32
    } else {
        0
    };
    let wound_modifier = world.winner.strength.min(0);
    (STRENGTH_MIN + score_term + wound_modifier).clamp(STRENGTH_MIN, STRENGTH_MAX)
}

/// `def = villain_strength(villain, weapon)`: subtract `best_adv` (floored
/// at 1) when the player's weapon matches the villain's `best_weapon`.
/// Unconscious villains (negative base strength) keep their sign.
pub fn villain_strength(base_strength: i32, profile: &VillainProfile, weapon: Option<&str>) -> i32 {
    if base_strength < 0 {
        return base_strength;
    }
    match (&profile.best_weapon, weapon) {
        (Some(best), Some(used)) if best == used => (base_strength - profile.best_adv.max(1)).max(0),
        _ => base_strength,
    }
}

fn select_table(def: i32, differential: i32) -> &'static [CombatOutcome] {
    use CombatOutcome::*;
    // Attacker badly outmatched by a strong defender.
    const DEF1: &[CombatOutcome] = &[Missed, Missed, Missed, Stagger, Stagger, Stagger, LightWound, LightWound, Stagger];
    // Roughly even fight, defender modestly stronger.
    const DEF2A: &[CombatOutcome] = &[Missed, Missed, Stagger, LightWound, LightWound, SeriousWound, Stagger, LightWound, LoseWeapon];
    const DEF2B: &[CombatOutcome] = &[
        Missed, Stagger, LightWound, LightWound, SeriousWound, SeriousWound, Unconscious, LightWound, Stagger,
    ];
    // Attacker has the clear advantage, graduated by how much.
    const DEF3A: &[CombatOutcome] = &[
        Missed, LightWound, LightWound, SeriousWound, SeriousWound, Unconscious, Unconscious, SeriousWound, LightWound,
    ];
    const DEF3B: &[CombatOutcome] = &[
        LightWound, SeriousWound, SeriousWound, Unconscious, Unconscious, Killed, SeriousWound, Unconscious, LightWound,
    ];
    const DEF3C: &[CombatOutcome] = &[
        SeriousWound, Unconscious, Unconscious, Killed, Killed, Killed, Unconscious, SeriousWound, Unconscious,
    ];

    if def >= STRENGTH_MAX - 1 {
        DEF1
    } else if differential <= 0 {
        DEF2A
    } else if differential <= 2 {
        DEF2B
    } else if differential <= 4 {
        DEF3A
    } else if differential <= 6 {
        DEF3B
    } else {
        DEF3C
    }
}

/// Step 6's post-modifiers: a player still reeling from a previous stagger
/// turns this blow's `Stagger` into a flat `Missed` and `Unconscious` into
/// `Killed` — the villain presses the advantage while the player is down.
fn apply_stagger_postmodifier(outcome: CombatOutcome, was_staggered: bool) -> CombatOutcome {
    if !was_staggered {
        return outcome;
    }
    match outcome {
        CombatOutcome::Stagger => CombatOutcome::Missed,
        CombatOutcome::Unconscious => CombatOutcome::Killed,
        other => other,
    }
}

/// Resolve one hero blow against a villain. Mutates `world` in place and
/// returns the report the caller renders to the output buffer.
pub fn hero_blow(world: &mut World, villain: &VillainProfile, weapon: Option<EntityId>) -> Result<BlowReport> {
    let was_staggered = world.winner.flags.has(Flag::Staggered);
    world.winner.flags.unset(Flag::Staggered);

    let att = player_fight_strength(world, world.score_max).max(1);
    let base_strength = world.object(&villain.id)?.strength.unwrap_or(STRENGTH_MAX);
    let def = villain_strength(base_strength, villain, weapon.as_deref());

    let villain_has_weapon = world
        .contents_of(&Container::Object(villain.id.clone()))
        .iter()
        .any(|o| o.flags.has(Flag::Weapon));

    let outcome = if !villain_has_weapon && def < 0 {
        CombatOutcome::Killed
    } else {
        let differential = att - def;
        let table = select_table(def, differential);
        let idx = world.rng.next_in_range(0, 9) as usize;
        let mut outcome = apply_stagger_postmodifier(table[idx.min(table.len() - 1)], was_staggered);
        if outcome == CombatOutcome::Stagger && villain_has_weapon && world.rng.chance_percent(25.0) {
            outcome = CombatOutcome::LoseWeapon;
        }
        outcome
    };

    apply_outcome_to_villain(world, &villain.id, outcome)?;

    Ok(BlowReport {
        outcome,
        attacker: "player".into(),
        defender: villain.id.clone(),
        weapon,
    })
}

fn apply_outcome_to_villain(world: &mut World, villain_id: &str, outcome: CombatOutcome) -> Result<()> {
    let obj = world.object_mut(villain_id)?;
    let strength = obj.strength.unwrap_or(STRENGTH_MAX);
    let new_strength = match outcome {
        CombatOutcome::Missed | CombatOutcome::Stagger | CombatOutcome::LoseWeapon => strength,
        CombatOutcome::LightWound => (strength - 1).max(0),
        CombatOutcome::SeriousWound => (strength - 2).max(0),
        CombatOutcome::Unconscious => -(strength.max(1)),
        CombatOutcome::Killed => 0,
    };
    obj.strength = Some(new_strength);
    if new_strength == 0 {
        obj.flags.unset(Flag::Fight);
        world.move_object(villain_id, Container::Limbo)?;
    }
    Ok(())
}

/// Villain's attack against the player, mirroring `hero_blow`'s table logic
/// but applying damage to the player's wound counter instead.
pub fn villain_blow(world: &mut World, villain: &VillainProfile) -> Result<BlowReport> {
    let base_strength = world.object(&villain.id)?.strength.unwrap_or(STRENGTH_MAX);
    if base_strength <= 0 {
        bail!("villain '{}' cannot attack while unconscious or dead", villain.id);
    }
    let def = player_fight_strength(world, world.score_max);
    let att = villain_strength(base_strength, villain, None);
    let differential = att - def;
    let table = select_table(def, differential);
    let idx = world.rng.next_in_range(0, 9) as usize;
    let outcome = table[idx.min(table.len() - 1)];

    match outcome {
        CombatOutcome::Stagger => world.winner.flags.set(Flag::Staggered),
        CombatOutcome::LightWound => world.winner.strength -= 1,
        CombatOutcome::SeriousWound => world.winner.strength -= 2,
        CombatOutcome::Unconscious | CombatOutcome::Killed => world.winner.strength = 0,
        CombatOutcome::Missed | CombatOutcome::LoseWeapon => {},
    }

    Ok(BlowReport {
        outcome,
        attacker: villain.id.clone(),
        defender: "player".into(),
        weapon: None,
    })
}

/// Each turn an unconscious villain isn't healed, `wake_prob` grows by 25
/// (capped at 100); the daemon rolls against it every turn.
pub fn tick_awakening(world: &mut World, villain_id: &str, wake_prob: &mut u32) -> Result<bool> {
    let strength = world.object(villain_id)?.strength.unwrap_or(0);
    if strength >= 0 {
        return Ok(false);
    }
    *wake_prob = (*wake_prob + 25).min(100);
    if world.rng.chance_percent(*wake_prob as f64) {
        let obj = world.object_mut(villain_id)?;
        obj.strength = Some(-strength);
        *wake_prob = 0;
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_strength_clamps_to_bounds() {
        let mut world = crate::world::tests_support::bare_world();
        world.score = -1000;
        assert_eq!(player_fight_strength(&world, 350), STRENGTH_MIN);
        world.score = 1_000_000;
        assert_eq!(player_fight_strength(&world, 350), STRENGTH_MAX);
    }

    #[test]
    fn villain_strength_applies_best_weapon_advantage() {
        let profile = VillainProfile {
            id: "troll".into(),
            best_weapon: Some("axe".into()),
            best_adv: 2,
        };
        assert_eq!(villain_strength(5, &profile, Some("axe")), 3);
        assert_eq!(villain_strength(5, &profile, Some("sword")), 5);
    }

    #[test]
    fn unconscious_villain_keeps_negative_strength() {
        let profile = VillainProfile {
            id: "troll".into(),
            best_weapon: None,
            best_adv: 0,
        };
        assert_eq!(villain_strength(-3, &profile, None), -3);
    }

    #[test]
    fn stagger_postmodifier_demotes_stagger_to_missed() {
        assert_eq!(apply_stagger_postmodifier(CombatOutcome::Stagger, true), CombatOutcome::Missed);
    }

    #[test]
    fn stagger_postmodifier_promotes_unconscious_to_killed() {
        assert_eq!(apply_stagger_postmodifier(CombatOutcome::Unconscious, true), CombatOutcome::Killed);
    }

    #[test]
    fn stagger_postmodifier_is_noop_when_not_staggered() {
        assert_eq!(apply_stagger_postmodifier(CombatOutcome::Stagger, false), CombatOutcome::Stagger);
        assert_eq!(apply_stagger_postmodifier(CombatOutcome::Unconscious, false), CombatOutcome::Unconscious);
    }
}
