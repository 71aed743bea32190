//! Combat resolution.
//!
//! Pure functions over combatant snapshots. Equipped gear is folded into
//! the snapshot before any roll, so the math never touches the world
//! model. All randomness comes from the caller's generator; the session
//! seeds one `StdRng` for its whole lifetime, which makes every fight
//! replayable from a seed.

use std::collections::HashMap;

use rand::Rng;

use crate::world::types::{CharacterRecord, ItemRecord};

/// Damage multiplier applied on a critical hit, as a (num, den) ratio.
const CRIT_NUMERATOR: i32 = 3;
const CRIT_DENOMINATOR: i32 = 2;

/// Hard cap on armor damage reduction.
const ARMOR_REDUCTION_CAP: i32 = 15;

/// A combat-ready snapshot of a character: stats plus equipped bonuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combatant {
    pub name: String,
    pub strength: i32,
    pub agility: i32,
    pub base_armor: i32,
    pub weapon_bonus: i32,
    pub armor_bonus: i32,
}

impl Combatant {
    /// Build a snapshot from a character, resolving every equipped slot
    /// against the item table.
    pub fn from_character(
        character: &CharacterRecord,
        items: &HashMap<String, ItemRecord>,
    ) -> Self {
        let mut weapon_bonus = 0;
        let mut armor_bonus = 0;
        for item_id in character.equipped.values() {
            if let Some(item) = items.get(item_id) {
                weapon_bonus += item.damage_bonus;
                armor_bonus += item.armor_bonus;
            }
        }
        Self {
            name: character.name.clone(),
            strength: character.strength,
            agility: character.agility,
            base_armor: character.armor,
            weapon_bonus,
            armor_bonus,
        }
    }

    pub fn total_armor(&self) -> i32 {
        self.base_armor + self.armor_bonus
    }

    /// Full per-swing damage before the defender's armor.
    pub fn total_damage(&self) -> i32 {
        base_damage(self.strength) + self.weapon_bonus
    }
}

/// Outcome of one attack roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    pub hit: bool,
    pub critical: bool,
    /// Damage after armor; zero on a miss.
    pub damage: i32,
}

/// Chance in percent that an attack lands, clamped to [20, 95].
pub fn hit_chance(attacker_agility: i32, defender_agility: i32) -> i32 {
    let accuracy = 70 + 2 * (attacker_agility - 10);
    let dodge = 10 + 3 * (defender_agility - 10);
    (accuracy - dodge).clamp(20, 95)
}

/// Chance in percent that a landed hit is critical, clamped to [1, 50].
pub fn crit_chance(attacker_agility: i32) -> i32 {
    (5 + (attacker_agility - 10)).clamp(1, 50)
}

/// Unarmed base damage from strength alone, never below 1.
pub fn base_damage(strength: i32) -> i32 {
    (5 + (strength - 10).div_euclid(2)).max(1)
}

/// Armor damage reduction: half of total armor, capped.
pub fn armor_reduction(total_armor: i32) -> i32 {
    (total_armor.max(0) / 2).min(ARMOR_REDUCTION_CAP)
}

/// Chance in percent to break away from combat, clamped to [15, 95].
pub fn flee_chance(runner_agility: i32, opponent_agility: i32) -> i32 {
    (50 + 5 * (runner_agility - opponent_agility)).clamp(15, 95)
}

/// Resolve one attack: hit roll, crit roll, damage through armor.
///
/// A landed hit always deals at least 1 damage; armor can blunt a blow
/// but never erase it.
pub fn resolve_attack(
    attacker: &Combatant,
    defender: &Combatant,
    rng: &mut impl Rng,
) -> AttackRoll {
    let chance = hit_chance(attacker.agility, defender.agility);
    if rng.gen_range(0..100) >= chance {
        return AttackRoll {
            hit: false,
            critical: false,
            damage: 0,
        };
    }

    let critical = rng.gen_range(0..100) < crit_chance(attacker.agility);
    let mut damage = attacker.total_damage();
    if critical {
        damage = damage * CRIT_NUMERATOR / CRIT_DENOMINATOR;
    }
    let damage = (damage - armor_reduction(defender.total_armor())).max(1);

    AttackRoll {
        hit: true,
        critical,
        damage,
    }
}

/// Roll a flee attempt. The caller owes the opponent a free counter-attack
/// when this returns false.
pub fn attempt_flee(runner_agility: i32, opponent_agility: i32, rng: &mut impl Rng) -> bool {
    rng.gen_range(0..100) < flee_chance(runner_agility, opponent_agility)
}

/// Flavor of a companion's assistance, picked by its better stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistStyle {
    /// Strength is the companion's better stat.
    Mighty,
    /// Agility matches or beats strength.
    Swift,
}

/// Bonus damage a living companion contributes to the player's attack:
/// a fifth of its own per-swing damage, rounded down.
pub fn companion_assist(companion: &Combatant) -> (i32, AssistStyle) {
    let bonus = companion.total_damage() / 5;
    let style = if companion.strength > companion.agility {
        AssistStyle::Mighty
    } else {
        AssistStyle::Swift
    };
    (bonus, style)
}
