//! Loot-box resolution: rarity roll, bonus-token roll and the pity counter.
//!
//! Everything here is pure. Randomness comes in through [`RollSource`] and the
//! resulting [`RewardState`] goes back to the caller, which owns persistence.

use db::models::{loot_item::Rarity, user_profile::UserProfile};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Consecutive opens without a bonus token after which one is guaranteed.
pub const PITY_THRESHOLD: u32 = 60;

/// Chance of a bonus token on a regular (non-pity) open, in percent.
pub const BONUS_TOKEN_CHANCE_PERCENT: f64 = 1.0;

/// Source of uniform random draws.
pub trait RollSource: Send {
    /// Next value uniformly distributed in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Next value uniformly distributed in `[0, 100)`
    fn next_percent(&mut self) -> f64 {
        self.next_unit() * 100.0
    }
}

/// Rolls backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngRolls<R> {
    rng: R,
}

impl<R: Rng> RngRolls<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngRolls<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> RollSource for RngRolls<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// A fixed sequence of draws. Once exhausted it keeps returning the last value.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRolls {
    /// Draws given as unit values in `[0, 1)`
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// Draws given as percentages in `[0, 100)`
    pub fn percents(values: &[f64]) -> Self {
        Self::new(values.iter().map(|v| v / 100.0).collect::<Vec<_>>())
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RollSource for ScriptedRolls {
    fn next_unit(&mut self) -> f64 {
        let value = self
            .values
            .get(self.cursor)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0.0);
        self.cursor += 1;
        value
    }
}

/// Persisted per-user reward counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RewardState {
    /// Opens since the last bonus token, always below [`PITY_THRESHOLD`]
    pub open_counter: u32,
    pub bonus_token_count: u32,
}

impl RewardState {
    /// State after an open that produced `bonus`.
    pub fn apply(self, bonus: &BonusOutcome) -> Self {
        Self {
            open_counter: bonus.next_counter,
            bonus_token_count: self
                .bonus_token_count
                .saturating_add(u32::from(bonus.granted_bonus_token)),
        }
    }
}

impl From<&UserProfile> for RewardState {
    fn from(profile: &UserProfile) -> Self {
        Self {
            open_counter: clamp_counter(profile.open_counter),
            bonus_token_count: saturate(profile.bonus_token_count),
        }
    }
}

/// The schema keeps `open_counter` in `0..PITY_THRESHOLD`; anything outside
/// that is pinned to the nearest valid value.
fn clamp_counter(raw: i64) -> u32 {
    raw.clamp(0, i64::from(PITY_THRESHOLD - 1)) as u32
}

fn saturate(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

/// Result of the bonus-token / pity half of an open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusOutcome {
    pub granted_bonus_token: bool,
    pub is_pity_trigger: bool,
    pub next_counter: u32,
}

/// Full result of one open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct OpenOutcome {
    pub rarity: Rarity,
    pub granted_bonus_token: bool,
    pub is_pity_trigger: bool,
    /// Counter to persist. Guest outcomes carry 0 and are never persisted.
    pub next_counter: u32,
}

/// Map a roll in `[0, 100)` onto the cumulative rarity table.
pub fn rarity_for_roll(roll: f64) -> Rarity {
    Rarity::THRESHOLDS
        .iter()
        .find(|(_, bound)| roll < *bound)
        .map(|(rarity, _)| *rarity)
        .unwrap_or(Rarity::Legendary)
}

pub fn roll_rarity<R: RollSource + ?Sized>(rolls: &mut R) -> Rarity {
    rarity_for_roll(rolls.next_percent())
}

/// Advance the pity counter and decide whether a bonus token drops.
/// No token roll is drawn when pity fires.
pub fn roll_bonus<R: RollSource + ?Sized>(prior_counter: u32, rolls: &mut R) -> BonusOutcome {
    let candidate = prior_counter.saturating_add(1);
    if candidate >= PITY_THRESHOLD {
        return BonusOutcome {
            granted_bonus_token: true,
            is_pity_trigger: true,
            next_counter: 0,
        };
    }

    if rolls.next_percent() < BONUS_TOKEN_CHANCE_PERCENT {
        BonusOutcome {
            granted_bonus_token: true,
            is_pity_trigger: false,
            next_counter: 0,
        }
    } else {
        BonusOutcome {
            granted_bonus_token: false,
            is_pity_trigger: false,
            next_counter: candidate,
        }
    }
}

/// Resolve one open for a user with a durable counter: token roll first
/// (unless pity fires), then an independent rarity roll.
pub fn resolve_open<R: RollSource + ?Sized>(prior_counter: u32, rolls: &mut R) -> OpenOutcome {
    let bonus = roll_bonus(prior_counter, rolls);
    let rarity = roll_rarity(rolls);
    OpenOutcome {
        rarity,
        granted_bonus_token: bonus.granted_bonus_token,
        is_pity_trigger: bonus.is_pity_trigger,
        next_counter: bonus.next_counter,
    }
}

/// Resolve an open for a session without a durable counter: rarity only.
pub fn resolve_guest_open<R: RollSource + ?Sized>(rolls: &mut R) -> OpenOutcome {
    OpenOutcome {
        rarity: roll_rarity(rolls),
        granted_bonus_token: false,
        is_pity_trigger: false,
        next_counter: 0,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const NO_TOKEN: f64 = 50.0;

    #[test]
    fn pity_never_fires_below_threshold() {
        for prior in 0..=58 {
            // token roll always misses
            let mut rolls = ScriptedRolls::percents(&[NO_TOKEN, 10.0]);
            let outcome = resolve_open(prior, &mut rolls);
            assert!(!outcome.is_pity_trigger, "prior {prior}");
            assert!(!outcome.granted_bonus_token, "prior {prior}");
            assert_eq!(outcome.next_counter, prior + 1);
        }
    }

    #[test]
    fn pity_always_fires_at_fifty_nine() {
        for token_roll in [0.0, 0.5, 1.0, 50.0, 99.999] {
            let mut rolls = ScriptedRolls::percents(&[token_roll, 10.0]);
            let outcome = resolve_open(59, &mut rolls);
            assert!(outcome.is_pity_trigger);
            assert!(outcome.granted_bonus_token);
            assert_eq!(outcome.next_counter, 0);
        }
    }

    #[test]
    fn pity_skips_the_token_draw() {
        let mut rolls = ScriptedRolls::percents(&[95.0, 0.0]);
        let outcome = resolve_open(59, &mut rolls);
        // the first draw went to rarity, not to a token roll
        assert_eq!(outcome.rarity, Rarity::Epic);
        assert_eq!(rolls.consumed(), 1);
    }

    #[test]
    fn counter_wraps_through_a_full_pity_cycle() {
        let mut state = RewardState::default();
        let mut rolls = ScriptedRolls::percents(&[NO_TOKEN]);
        for open in 1..=PITY_THRESHOLD {
            let bonus = roll_bonus(state.open_counter, &mut rolls);
            state = state.apply(&bonus);
            assert!(state.open_counter < PITY_THRESHOLD);
            if open == PITY_THRESHOLD {
                assert!(bonus.is_pity_trigger);
            }
        }
        assert_eq!(state, RewardState { open_counter: 0, bonus_token_count: 1 });
    }

    #[test]
    fn lucky_token_resets_counter() {
        for prior in [0, 1, 30, 58] {
            let mut rolls = ScriptedRolls::percents(&[0.999, 10.0]);
            let outcome = resolve_open(prior, &mut rolls);
            assert!(outcome.granted_bonus_token);
            assert!(!outcome.is_pity_trigger);
            assert_eq!(outcome.next_counter, 0);
        }
    }

    #[test]
    fn token_roll_boundary_is_exclusive() {
        let mut rolls = ScriptedRolls::percents(&[1.0]);
        let bonus = roll_bonus(10, &mut rolls);
        assert!(!bonus.granted_bonus_token);
        assert_eq!(bonus.next_counter, 11);
    }

    #[test]
    fn bonus_grant_always_resets_counter() {
        let mut rolls = RngRolls::seeded(7);
        for prior in (0..PITY_THRESHOLD).cycle().take(5_000) {
            let outcome = resolve_open(prior, &mut rolls);
            if outcome.granted_bonus_token {
                assert_eq!(outcome.next_counter, 0);
            } else {
                assert_eq!(outcome.next_counter, prior + 1);
            }
        }
    }

    #[test]
    fn rarity_boundaries() {
        assert_eq!(rarity_for_roll(0.0), Rarity::Common);
        assert_eq!(rarity_for_roll(69.999), Rarity::Common);
        assert_eq!(rarity_for_roll(70.0), Rarity::Rare);
        assert_eq!(rarity_for_roll(89.999), Rarity::Rare);
        assert_eq!(rarity_for_roll(90.0), Rarity::Epic);
        assert_eq!(rarity_for_roll(97.999), Rarity::Epic);
        assert_eq!(rarity_for_roll(98.0), Rarity::Legendary);
        assert_eq!(rarity_for_roll(99.999), Rarity::Legendary);
    }

    #[test]
    fn rarity_boundaries_through_unit_draws() {
        let cases = [
            (0.0, Rarity::Common),
            (0.69999, Rarity::Common),
            (0.7, Rarity::Rare),
            (0.9, Rarity::Epic),
            (0.98, Rarity::Legendary),
            (0.99999, Rarity::Legendary),
        ];
        for (unit, expected) in cases {
            let mut rolls = ScriptedRolls::new(vec![unit]);
            assert_eq!(roll_rarity(&mut rolls), expected, "unit {unit}");
        }
    }

    #[test]
    fn rarity_and_token_are_independent() {
        let mut seen = HashSet::new();
        for token_roll in [0.5, NO_TOKEN] {
            for rarity_roll in [10.0, 80.0, 95.0, 99.0] {
                let mut rolls = ScriptedRolls::percents(&[token_roll, rarity_roll]);
                let outcome = resolve_open(5, &mut rolls);
                seen.insert((outcome.granted_bonus_token, outcome.rarity));
            }
        }
        assert_eq!(seen.len(), 8);
        assert!(seen.contains(&(true, Rarity::Legendary)));
        assert!(seen.contains(&(false, Rarity::Common)));

        // a Common item can come with a pity grant
        let mut rolls = ScriptedRolls::percents(&[0.0]);
        let outcome = resolve_open(59, &mut rolls);
        assert!(outcome.is_pity_trigger);
        assert_eq!(outcome.rarity, Rarity::Common);
    }

    #[test]
    fn guest_open_never_grants_tokens() {
        let mut rolls = ScriptedRolls::percents(&[0.0, 99.5]);
        for _ in 0..10 {
            let outcome = resolve_guest_open(&mut rolls);
            assert!(!outcome.granted_bonus_token);
            assert!(!outcome.is_pity_trigger);
        }
        // the single draw per guest open is the rarity roll
        let mut rolls = ScriptedRolls::percents(&[99.5]);
        assert_eq!(resolve_guest_open(&mut rolls).rarity, Rarity::Legendary);
    }

    #[test]
    fn observed_distribution_matches_table() {
        let mut rolls = RngRolls::seeded(42);
        let samples = 200_000;
        let mut counts = [0usize; 4];
        let mut tokens = 0usize;
        for _ in 0..samples {
            let outcome = resolve_open(0, &mut rolls);
            let idx = Rarity::ALL.iter().position(|r| *r == outcome.rarity).unwrap();
            counts[idx] += 1;
            tokens += usize::from(outcome.granted_bonus_token);
        }
        for (rarity, count) in Rarity::ALL.iter().zip(counts) {
            let observed = count as f64 * 100.0 / samples as f64;
            assert!(
                (observed - rarity.drop_chance_percent()).abs() < 0.5,
                "{rarity}: {observed}"
            );
        }
        let token_rate = tokens as f64 * 100.0 / samples as f64;
        assert!((token_rate - BONUS_TOKEN_CHANCE_PERCENT).abs() < 0.2, "{token_rate}");
    }

    #[test]
    fn oversized_stored_values_saturate_instead_of_resetting() {
        let profile = UserProfile {
            user_id: uuid::Uuid::new_v4(),
            open_counter: 1_000,
            bonus_token_count: i64::from(u32::MAX) + 5,
            version: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let state = RewardState::from(&profile);
        assert_eq!(state.bonus_token_count, u32::MAX);
        assert_eq!(state.open_counter, PITY_THRESHOLD - 1);

        let bonus = BonusOutcome {
            granted_bonus_token: true,
            is_pity_trigger: true,
            next_counter: 0,
        };
        assert_eq!(state.apply(&bonus).bonus_token_count, u32::MAX);
    }

    #[test]
    fn state_from_profile_clamps_negatives() {
        let profile = UserProfile {
            user_id: uuid::Uuid::new_v4(),
            open_counter: 12,
            bonus_token_count: -1,
            version: 3,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert_eq!(
            RewardState::from(&profile),
            RewardState { open_counter: 12, bonus_token_count: 0 }
        );
    }
}
