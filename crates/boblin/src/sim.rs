// ABOUTME: Monte Carlo simulation of attack rolls.
// ABOUTME: Rolls many attacks to cross-check the exact distributions empirically.

use crate::attack::{RollOutcome, ToHit};
use crate::dist::Distribution;
use crate::error::Result;
use crate::report::Calculation;
use crate::roller::{roll_attack, FastRng, Rng};
use std::collections::HashMap;
use tracing::debug;

/// Counts gathered by rolling a calculation `n` times.
#[derive(Debug, Clone, Default)]
pub struct SimResult {
    /// Number of natural 1s.
    pub crit_miss: usize,
    /// Number of natural rolls in the critical range.
    pub crit_hit: usize,
    /// Non-critical totals: value -> count.
    pub totals: HashMap<i64, usize>,
    /// Damage of non-critical attacks: value -> count.
    pub normal_damage: HashMap<i64, usize>,
    /// Damage of critical hits: value -> count.
    pub critical_damage: HashMap<i64, usize>,
    /// Number of trials run.
    pub n: usize,
}

fn frequencies(counts: &HashMap<i64, usize>, n: usize) -> Distribution {
    if n == 0 {
        return Distribution::empty();
    }
    counts
        .iter()
        .map(|(&value, &count)| (value, count as f64 / n as f64))
        .collect()
}

impl SimResult {
    /// Observed to-hit frequencies, shaped like the exact [`ToHit`].
    pub fn to_hit(&self) -> ToHit {
        let n = self.n.max(1) as f64;
        ToHit {
            band: frequencies(&self.totals, self.n),
            crit_hit: self.crit_hit as f64 / n,
            crit_miss: self.crit_miss as f64 / n,
        }
    }

    /// Observed damage of normal hits, normalized over those hits.
    pub fn normal_damage(&self) -> Distribution {
        frequencies(&self.normal_damage, self.normal_damage.values().sum())
    }

    /// Observed damage of critical hits, normalized over those hits.
    pub fn critical_damage(&self) -> Distribution {
        frequencies(&self.critical_damage, self.critical_damage.values().sum())
    }

    /// Non-critical totals sorted by value.
    pub fn sorted_totals(&self) -> Vec<(i64, usize)> {
        let mut totals: Vec<_> = self.totals.iter().map(|(&k, &v)| (k, v)).collect();
        totals.sort_by_key(|(k, _)| *k);
        totals
    }
}

/// Run a Monte Carlo simulation of a calculation.
pub fn simulate(calculation: &Calculation, n: usize) -> Result<SimResult> {
    simulate_with_rng(calculation, n, &mut FastRng::new())
}

/// Run a simulation with a seeded RNG for reproducibility.
pub fn simulate_seeded(calculation: &Calculation, n: usize, seed: u64) -> Result<SimResult> {
    simulate_with_rng(calculation, n, &mut FastRng::with_seed(seed))
}

pub fn simulate_with_rng(
    calculation: &Calculation,
    n: usize,
    rng: &mut impl Rng,
) -> Result<SimResult> {
    calculation.limits.check(calculation.attack.to_hit())?;
    if let Some(damage) = &calculation.damage {
        calculation.limits.check(&damage.damage().doubled())?;
    }

    let mut result = SimResult {
        n,
        ..SimResult::default()
    };

    for _ in 0..n {
        let roll = roll_attack(&calculation.attack, calculation.damage.as_ref(), rng)?;
        match roll.outcome {
            RollOutcome::CriticalMiss => result.crit_miss += 1,
            RollOutcome::CriticalHit => {
                result.crit_hit += 1;
                if let Some(damage) = roll.damage {
                    *result.critical_damage.entry(damage).or_insert(0) += 1;
                }
            }
            RollOutcome::Total(total) => {
                *result.totals.entry(total).or_insert(0) += 1;
                if let Some(damage) = roll.damage {
                    *result.normal_damage.entry(damage).or_insert(0) += 1;
                }
            }
        }
    }

    debug!(
        n,
        crit_hit = result.crit_hit,
        crit_miss = result.crit_miss,
        "simulation finished"
    );
    Ok(result)
}
