// ABOUTME: Rolls concrete attacks with a pluggable random number generator.
// ABOUTME: Applies advantage, luck, critical range, reroll-low and doubled crit dice.

use crate::ast::ParsedExpression;
use crate::attack::{AttackConfig, RollOutcome};
use crate::d20::D20;
use crate::damage::{DamageConfig, REROLL_FACES};
use crate::error::{Error, Result};

/// Trait for random number generation, allowing for testing with fixed values.
pub trait Rng {
    /// Generate a random number in the range [1, max].
    fn roll(&mut self, max: u32) -> u32;
}

/// Default RNG using fastrand.
pub struct FastRng(fastrand::Rng);

impl FastRng {
    pub fn new() -> Self {
        Self(fastrand::Rng::new())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self(fastrand::Rng::with_seed(seed))
    }
}

impl Default for FastRng {
    fn default() -> Self {
        Self::new()
    }
}

impl Rng for FastRng {
    fn roll(&mut self, max: u32) -> u32 {
        self.0.u32(1..=max)
    }
}

/// One rolled attack.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackRoll {
    /// Every d20 rolled, after luck rerolls, before one is kept.
    pub naturals: Vec<i64>,
    /// The kept d20.
    pub natural: i64,
    /// Critical miss, critical hit, or the total against defense.
    pub outcome: RollOutcome,
    /// Damage dealt if the attack connects; `None` on a critical miss or
    /// when no damage roll was given.
    pub damage: Option<i64>,
}

/// Roll one attack.
///
/// Fails only on a die with more faces than the generator can roll.
pub fn roll_attack(
    attack: &AttackConfig,
    damage: Option<&DamageConfig>,
    rng: &mut impl Rng,
) -> Result<AttackRoll> {
    Roller { rng }.attack(attack, damage)
}

/// Roll a dice expression once.
pub fn roll_expression(
    expr: &ParsedExpression,
    reroll_low: bool,
    rng: &mut impl Rng,
) -> Result<i64> {
    Roller { rng }.expression(expr, reroll_low)
}

struct Roller<'a, R: Rng> {
    rng: &'a mut R,
}

impl<R: Rng> Roller<'_, R> {
    fn attack(
        &mut self,
        attack: &AttackConfig,
        damage: Option<&DamageConfig>,
    ) -> Result<AttackRoll> {
        let naturals = (0..attack.advantage().dice_count())
            .map(|_| self.d20(attack.luck()))
            .collect::<Result<Vec<i64>>>()?;
        let mode = attack.advantage();
        let natural = naturals
            .iter()
            .copied()
            .reduce(|a, b| mode.keep(a, b))
            .unwrap_or(1);

        let outcome = if natural == 1 {
            RollOutcome::CriticalMiss
        } else if natural >= attack.crit_threshold() {
            RollOutcome::CriticalHit
        } else {
            RollOutcome::Total(natural + self.expression(attack.to_hit(), false)?)
        };

        let damage = match (outcome, damage) {
            (RollOutcome::CriticalMiss, _) | (_, None) => None,
            (RollOutcome::CriticalHit, Some(config)) => {
                Some(self.expression(&config.damage().doubled(), config.reroll_low())?)
            }
            (RollOutcome::Total(_), Some(config)) => {
                Some(self.expression(config.damage(), config.reroll_low())?)
            }
        };

        Ok(AttackRoll {
            naturals,
            natural,
            outcome,
            damage,
        })
    }

    fn d20(&mut self, luck: bool) -> Result<i64> {
        let value = self.die(D20, false)?;
        if luck && value == 1 {
            self.die(D20, false)
        } else {
            Ok(value)
        }
    }

    fn die(&mut self, sides: i64, reroll_low: bool) -> Result<i64> {
        let faces = u32::try_from(sides.unsigned_abs()).map_err(|_| Error::ComputationOverflow {
            what: "die faces",
            value: usize::try_from(sides.unsigned_abs()).unwrap_or(usize::MAX),
            limit: u32::MAX as usize,
        })?;
        let mut value = i64::from(self.rng.roll(faces));
        if reroll_low && value <= REROLL_FACES {
            value = i64::from(self.rng.roll(faces));
        }
        Ok(value * sides.signum())
    }

    fn expression(&mut self, expr: &ParsedExpression, reroll_low: bool) -> Result<i64> {
        let mut total = expr.modifier();
        for &sides in expr.dice() {
            total += self.die(sides, reroll_low)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d20::AdvantageMode;

    /// A deterministic RNG for testing.
    struct TestRng {
        values: Vec<u32>,
        index: usize,
    }

    impl TestRng {
        fn new(values: Vec<u32>) -> Self {
            Self { values, index: 0 }
        }
    }

    impl Rng for TestRng {
        fn roll(&mut self, _max: u32) -> u32 {
            let value = self.values[self.index % self.values.len()];
            self.index += 1;
            value
        }
    }

    #[test]
    fn test_plain_hit() {
        let attack = AttackConfig::parse("1d4 + 5").unwrap();
        let damage = DamageConfig::parse("1d8 + 3").unwrap();
        // d20, to-hit d4, damage d8
        let mut rng = TestRng::new(vec![12, 3, 6]);
        let roll = roll_attack(&attack, Some(&damage), &mut rng).unwrap();
        assert_eq!(roll.natural, 12);
        assert_eq!(roll.outcome, RollOutcome::Total(20));
        assert_eq!(roll.damage, Some(9));
    }

    #[test]
    fn test_natural_one_misses() {
        let attack = AttackConfig::parse("100").unwrap();
        let damage = DamageConfig::parse("1d8").unwrap();
        let mut rng = TestRng::new(vec![1]);
        let roll = roll_attack(&attack, Some(&damage), &mut rng).unwrap();
        assert_eq!(roll.outcome, RollOutcome::CriticalMiss);
        assert_eq!(roll.damage, None);
    }

    #[test]
    fn test_critical_doubles_dice() {
        let attack = AttackConfig::parse("0")
            .unwrap()
            .with_crit_threshold(19)
            .unwrap();
        let damage = DamageConfig::parse("1d6 + 2").unwrap();
        let mut rng = TestRng::new(vec![19, 4, 5]);
        let roll = roll_attack(&attack, Some(&damage), &mut rng).unwrap();
        assert_eq!(roll.outcome, RollOutcome::CriticalHit);
        assert_eq!(roll.damage, Some(11));
    }

    #[test]
    fn test_advantage_keeps_higher() {
        let attack = AttackConfig::parse("0")
            .unwrap()
            .with_advantage(AdvantageMode::Advantage);
        let mut rng = TestRng::new(vec![3, 15]);
        let roll = roll_attack(&attack, None, &mut rng).unwrap();
        assert_eq!(roll.naturals, vec![3, 15]);
        assert_eq!(roll.natural, 15);
    }

    #[test]
    fn test_disadvantage_with_luck_rerolls_each_die() {
        let attack = AttackConfig::parse("0")
            .unwrap()
            .with_advantage(AdvantageMode::Disadvantage)
            .with_luck(true);
        // First die 1 -> reroll 8, second die 10.
        let mut rng = TestRng::new(vec![1, 8, 10]);
        let roll = roll_attack(&attack, None, &mut rng).unwrap();
        assert_eq!(roll.naturals, vec![8, 10]);
        assert_eq!(roll.outcome, RollOutcome::Total(8));
    }

    #[test]
    fn test_reroll_low_once() {
        let expr = ParsedExpression::new(vec![6, 6], 0).unwrap();
        // 2 -> reroll 1 (kept), 5
        let mut rng = TestRng::new(vec![2, 1, 5]);
        assert_eq!(roll_expression(&expr, true, &mut rng).unwrap(), 6);
    }

    #[test]
    fn test_subtracted_die() {
        let expr = ParsedExpression::new(vec![8, -4], 1).unwrap();
        let mut rng = TestRng::new(vec![5, 3]);
        assert_eq!(roll_expression(&expr, false, &mut rng).unwrap(), 3);
    }

    #[test]
    fn test_die_too_large_to_roll() {
        let expr = ParsedExpression::new(vec![1_i64 << 32], 0).unwrap();
        let mut rng = FastRng::with_seed(1);
        assert!(matches!(
            roll_expression(&expr, false, &mut rng),
            Err(Error::ComputationOverflow {
                what: "die faces",
                ..
            })
        ));

        let expr = ParsedExpression::new(vec![-(1_i64 << 40)], 0).unwrap();
        assert!(roll_expression(&expr, true, &mut rng).is_err());
    }

    #[test]
    fn test_seeded_rolls_repeat() {
        let attack = AttackConfig::parse("1d4 + 5").unwrap();
        let first = roll_attack(&attack, None, &mut FastRng::with_seed(7)).unwrap();
        let second = roll_attack(&attack, None, &mut FastRng::with_seed(7)).unwrap();
        assert_eq!(first, second);
    }
}
