//! Physiological decay applied to characters over elapsed wall time.
//!
//! The scheduler calls [`apply_elapsed`] once per cycle with the cycle's
//! shared delta. All rates are per-second so the same function handles a
//! 5-second cycle and a long gap after a restart.
//!
//! # Order of operations
//!
//! 1. Nutrition and hydration decay
//! 2. Sleep recovery (asleep) or tiredness accrual (awake)
//! 3. Forced sleep when tiredness crosses 100
//! 4. Damage severity decay; zeroed entries dropped
//!
//! Every stat is clamped to `[0, 100]` on the way out.

use reverie_types::{AWAKE_THRESHOLD, Character, clamp_percent};

/// Seconds for nutrition to drop one percent (~1%/15min).
const NUTRITION_SECS_PER_PERCENT: f64 = 900.0;

/// Seconds for hydration to drop one percent (~1%/10min).
const HYDRATION_SECS_PER_PERCENT: f64 = 600.0;

/// Seconds for tiredness to rise one percent while awake.
const TIREDNESS_SECS_PER_PERCENT: f64 = 600.0;

/// Percent of tiredness shed and alertness regained per minute of sleep.
const SLEEP_RECOVERY_PER_MINUTE: f64 = 5.0;

/// Percent of damage severity healed per hour.
const DAMAGE_DECAY_PER_HOUR: f64 = 0.5;

/// Apply `dt_secs` of physiological time to a character in place.
///
/// Returns `true` if the character was forced asleep by crossing the
/// tiredness ceiling during this update.
pub fn apply_elapsed(character: &mut Character, dt_secs: f64) -> bool {
    character.nutrition =
        clamp_percent(character.nutrition - dt_secs / NUTRITION_SECS_PER_PERCENT);
    character.hydration =
        clamp_percent(character.hydration - dt_secs / HYDRATION_SECS_PER_PERCENT);

    let mut forced_asleep = false;
    if character.alertness < AWAKE_THRESHOLD {
        // Asleep: recover.
        let recovery = SLEEP_RECOVERY_PER_MINUTE * dt_secs / 60.0;
        character.tiredness = clamp_percent(character.tiredness - recovery);
        character.alertness = clamp_percent(character.alertness + recovery);
    } else {
        // Awake: tire.
        let accrued = character.tiredness + dt_secs / TIREDNESS_SECS_PER_PERCENT;
        character.tiredness = clamp_percent(accrued);
        if accrued >= 100.0 {
            character.alertness = 0.0;
            forced_asleep = true;
        }
    }

    let decay = DAMAGE_DECAY_PER_HOUR * dt_secs / 3600.0;
    for entry in &mut character.damage {
        entry.severity = clamp_percent(entry.severity - decay);
    }
    character.damage.retain(|entry| entry.severity > 0.0);

    forced_asleep
}

#[cfg(test)]
mod tests {
    use reverie_types::{
        AreaId, CharacterClass, CharacterId, DamageEntry, WorldId,
    };

    use super::*;

    fn test_character() -> Character {
        Character {
            id: CharacterId::new(1),
            world_id: WorldId::new(1),
            name: "Mara".to_owned(),
            species: "human".to_owned(),
            gender: "female".to_owned(),
            age: 29,
            description: String::new(),
            backstory: String::new(),
            likes: Vec::new(),
            dislikes: Vec::new(),
            interests: Vec::new(),
            beliefs: Vec::new(),
            internal_conflict: String::new(),
            memory: Vec::new(),
            nutrition: 100.0,
            hydration: 100.0,
            tiredness: 0.0,
            alertness: 100.0,
            damage: Vec::new(),
            current_area_id: Some(AreaId::new(1)),
            owner_id: None,
            character_class: CharacterClass::Minor,
        }
    }

    #[test]
    fn nutrition_and_hydration_decay_linearly() {
        let mut c = test_character();
        apply_elapsed(&mut c, 900.0);
        assert!((c.nutrition - 99.0).abs() < 1e-9);
        assert!((c.hydration - 98.5).abs() < 1e-9);
    }

    #[test]
    fn awake_tiredness_accrues() {
        let mut c = test_character();
        apply_elapsed(&mut c, 600.0);
        assert!((c.tiredness - 1.0).abs() < 1e-9);
        assert!((c.alertness - 100.0).abs() < 1e-9);
    }

    #[test]
    fn short_delta_does_not_cross_ceiling() {
        let mut c = test_character();
        c.tiredness = 99.5;
        c.alertness = 80.0;
        let forced = apply_elapsed(&mut c, 10.0);
        assert!(!forced);
        assert!(c.tiredness < 100.0);
        assert!((c.alertness - 80.0).abs() < 1e-9);
    }

    #[test]
    fn crossing_ceiling_forces_sleep() {
        let mut c = test_character();
        c.tiredness = 99.5;
        c.alertness = 80.0;
        let forced = apply_elapsed(&mut c, 600.0);
        assert!(forced);
        assert!((c.tiredness - 100.0).abs() < 1e-9);
        assert!((c.alertness - 0.0).abs() < 1e-9);
        assert!(!c.is_awake());
    }

    #[test]
    fn sleep_recovers_tiredness_and_alertness() {
        let mut c = test_character();
        c.tiredness = 100.0;
        c.alertness = 0.0;
        apply_elapsed(&mut c, 60.0);
        assert!((c.tiredness - 95.0).abs() < 1e-9);
        assert!((c.alertness - 5.0).abs() < 1e-9);
    }

    #[test]
    fn sleeper_wakes_past_threshold() {
        let mut c = test_character();
        c.tiredness = 50.0;
        c.alertness = 0.0;
        // 5%/min recovery: 4 minutes brings alertness to 20.
        apply_elapsed(&mut c, 240.0);
        assert!(c.is_awake());
    }

    #[test]
    fn damage_decays_and_zeroed_entries_drop() {
        let mut c = test_character();
        c.damage = vec![
            DamageEntry {
                part: "left arm".to_owned(),
                kind: "bruise".to_owned(),
                severity: 10.0,
            },
            DamageEntry {
                part: "right hand".to_owned(),
                kind: "cut".to_owned(),
                severity: 0.2,
            },
        ];
        // One hour: each entry loses 0.5.
        apply_elapsed(&mut c, 3600.0);
        assert_eq!(c.damage.len(), 1);
        assert!((c.damage[0].severity - 9.5).abs() < 1e-9);
    }

    #[test]
    fn stats_never_leave_range() {
        let mut c = test_character();
        c.nutrition = 0.5;
        c.hydration = 0.2;
        apply_elapsed(&mut c, 100_000.0);
        assert!(c.nutrition >= 0.0);
        assert!(c.hydration >= 0.0);
        assert!(c.tiredness <= 100.0);
    }
}
