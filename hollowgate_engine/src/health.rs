//! Wound accounting shared by the player and by villains in combat.
//!
//! A `current_hp`/`max_hp` pair plus a queue of pending effects, applied
//! once per turn — the subset the catalogue's `DamagePlayerOT`/
//! `HealPlayerOT` actions and the combat resolver (`combat.rs`) need.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HealthEffect {
    InstantDamage { amount: u32, cause: String },
    InstantHeal { amount: u32, cause: String },
    DamageOverTime { amount: u32, turns_left: u32, cause: String },
    HealOverTime { amount: u32, turns_left: u32, cause: String },
}

impl HealthEffect {
    pub fn cause(&self) -> &str {
        match self {
            HealthEffect::InstantDamage { cause, .. }
            | HealthEffect::InstantHeal { cause, .. }
            | HealthEffect::DamageOverTime { cause, .. }
            | HealthEffect::HealOverTime { cause, .. } => cause,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthState {
    pub max_hp: u32,
    pub current_hp: u32,
    pub effects: Vec<HealthEffect>,
}

impl HealthState {
    pub fn new_at_max(max_hp: u32) -> Self {
        Self {
            max_hp,
            current_hp: max_hp,
            effects: Vec::new(),
        }
    }

    pub fn life_state(&self) -> LifeState {
        if self.current_hp == 0 {
            LifeState::Dead
        } else {
            LifeState::Alive
        }
    }

    pub fn damage(&mut self, amount: u32) {
        self.current_hp = self.current_hp.saturating_sub(amount);
    }

    pub fn heal(&mut self, amount: u32) {
        self.current_hp = (self.current_hp + amount).min(self.max_hp);
    }

    pub fn add_effect(&mut self, effect: HealthEffect) {
        self.effects.push(effect);
    }

    pub fn remove_effects_with_cause(&mut self, cause: &str) {
        self.effects.retain(|effect| effect.cause() != cause);
    }

    /// Apply every queued effect once, decrementing over-time counters and
    /// dropping them when exhausted. Stops early if an effect kills the
    /// entity, leaving any later effects in the queue untouched.
    pub fn tick_effects(&mut self) {
        let mut remaining = Vec::with_capacity(self.effects.len());
        let mut died = false;
        for effect in std::mem::take(&mut self.effects) {
            if died {
                remaining.push(effect);
                continue;
            }
            match effect {
                HealthEffect::InstantDamage { amount, .. } => {
                    self.damage(amount);
                },
                HealthEffect::InstantHeal { amount, .. } => {
                    self.heal(amount);
                },
                HealthEffect::DamageOverTime { amount, turns_left, cause } => {
                    self.damage(amount);
                    if turns_left > 1 {
                        remaining.push(HealthEffect::DamageOverTime {
                            amount,
                            turns_left: turns_left - 1,
                            cause,
                        });
                    }
                },
                HealthEffect::HealOverTime { amount, turns_left, cause } => {
                    self.heal(amount);
                    if turns_left > 1 {
                        remaining.push(HealthEffect::HealOverTime {
                            amount,
                            turns_left: turns_left - 1,
                            cause,
                        });
                    }
                },
            }
            if matches!(self.life_state(), LifeState::Dead) {
                died = true;
            }
        }
        self.effects = remaining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heal_saturates_at_max_hp() {
        let mut hp = HealthState::new_at_max(10);
        hp.damage(3);
        hp.heal(100);
        assert_eq!(hp.current_hp, 10);
    }

    #[test]
    fn damage_over_time_expires_after_turns() {
        let mut hp = HealthState::new_at_max(10);
        hp.add_effect(HealthEffect::DamageOverTime {
            amount: 1,
            turns_left: 2,
            cause: "poison".into(),
        });
        hp.tick_effects();
        assert_eq!(hp.current_hp, 9);
        assert_eq!(hp.effects.len(), 1);
        hp.tick_effects();
        assert_eq!(hp.current_hp, 8);
        assert!(hp.effects.is_empty());
    }

    #[test]
    fn lethal_effect_stops_remaining_queue() {
        let mut hp = HealthState::new_at_max(5);
        hp.add_effect(HealthEffect::InstantDamage { amount: 5, cause: "fall".into() });
        hp.add_effect(HealthEffect::InstantHeal { amount: 5, cause: "potion".into() });
        hp.tick_effects();
        assert_eq!(hp.current_hp, 0);
        assert_eq!(hp.effects.len(), 1);
    }
}
