// ABOUTME: To-hit distribution of an attack roll.
// ABOUTME: Combines the effective d20 with the to-hit modifier, holding natural 1s and crits apart.

use crate::ast::ParsedExpression;
use crate::config::Limits;
use crate::d20::{self, AdvantageMode, D20};
use crate::dist::Distribution;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Lowest natural roll that may be configured as a critical hit.
pub const MIN_CRIT_THRESHOLD: i64 = 2;
/// Natural 20 always crits.
pub const MAX_CRIT_THRESHOLD: i64 = D20;

/// Checks that a critical threshold lies in 2..=20.
pub fn validate_crit_threshold(threshold: i64) -> Result<i64> {
    if (MIN_CRIT_THRESHOLD..=MAX_CRIT_THRESHOLD).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(Error::InvalidCritThreshold(threshold))
    }
}

/// Everything that shapes the attack roll itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackConfig {
    to_hit: ParsedExpression,
    advantage: AdvantageMode,
    luck: bool,
    crit_threshold: i64,
}

impl AttackConfig {
    /// A plain attack: normal roll, no luck, crits on a natural 20.
    pub fn new(to_hit: ParsedExpression) -> Self {
        Self {
            to_hit,
            advantage: AdvantageMode::Normal,
            luck: false,
            crit_threshold: MAX_CRIT_THRESHOLD,
        }
    }

    /// Parse the to-hit modifier notation and build a plain attack.
    pub fn parse(to_hit: &str) -> Result<Self> {
        Ok(Self::new(crate::parser::parse(to_hit)?))
    }

    pub fn with_advantage(mut self, advantage: AdvantageMode) -> Self {
        self.advantage = advantage;
        self
    }

    /// Reroll every natural 1 on the attack dice once.
    pub fn with_luck(mut self, luck: bool) -> Self {
        self.luck = luck;
        self
    }

    pub fn with_crit_threshold(mut self, threshold: i64) -> Result<Self> {
        self.crit_threshold = validate_crit_threshold(threshold)?;
        Ok(self)
    }

    pub fn to_hit(&self) -> &ParsedExpression {
        &self.to_hit
    }

    pub fn advantage(&self) -> AdvantageMode {
        self.advantage
    }

    pub fn luck(&self) -> bool {
        self.luck
    }

    pub fn crit_threshold(&self) -> i64 {
        self.crit_threshold
    }
}

/// Result of an attack roll against an unknown defense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToHit {
    /// Totals of every roll that is neither a natural 1 nor a critical.
    ///
    /// Sums to `1 - crit_hit - crit_miss`.
    pub band: Distribution,
    /// Probability of a natural roll at or above the critical threshold.
    pub crit_hit: f64,
    /// Probability of a natural 1.
    pub crit_miss: f64,
}

/// A point on the to-hit plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollOutcome {
    CriticalMiss,
    Total(i64),
    CriticalHit,
}

impl fmt::Display for RollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollOutcome::CriticalMiss => f.write_str("CritMiss"),
            RollOutcome::Total(total) => write!(f, "{total}"),
            RollOutcome::CriticalHit => f.write_str("CritHit"),
        }
    }
}

impl ToHit {
    /// Chance to hit a target whose defense is `defense`.
    pub fn hit_chance(&self, defense: i64) -> f64 {
        self.band.at_least(defense) + self.crit_hit
    }

    /// Average to-hit total over the non-critical band, zero if the band is empty.
    pub fn band_mean(&self) -> f64 {
        let mass = self.band.total();
        if mass > 0.0 {
            self.band.mean() / mass
        } else {
            0.0
        }
    }

    /// Plot series: critical miss, every total, critical hit, each with its
    /// probability and the probability of that outcome or better.
    pub fn series(&self) -> Vec<(RollOutcome, f64, f64)> {
        let mut points = Vec::with_capacity(self.band.len() + 2);
        points.push((RollOutcome::CriticalMiss, self.crit_miss));
        points.extend(self.band.iter().map(|(v, p)| (RollOutcome::Total(v), p)));
        points.push((RollOutcome::CriticalHit, self.crit_hit));

        let mut acc = 0.0;
        let mut series: Vec<_> = points
            .into_iter()
            .rev()
            .map(|(outcome, p)| {
                acc += p;
                (outcome, p, acc)
            })
            .collect();
        series.reverse();
        series
    }
}

/// Totals of `d20 + modifier` for natural rolls strictly between 1 and
/// `crit_threshold`.
pub fn to_hit_band(
    d20: &Distribution,
    modifier: &Distribution,
    crit_threshold: i64,
) -> Distribution {
    d20.iter()
        .filter(|&(natural, _)| natural > 1 && natural < crit_threshold)
        .flat_map(move |(natural, pn)| {
            modifier
                .iter()
                .map(move |(m, pm)| (natural + m, pn * pm))
        })
        .collect()
}

pub fn critical_hit_probability(d20: &Distribution, crit_threshold: i64) -> f64 {
    d20.at_least(crit_threshold)
}

pub fn critical_miss_probability(d20: &Distribution) -> f64 {
    d20.get(1)
}

/// To-hit distribution with the default [`Limits`].
pub fn to_hit_distribution(config: &AttackConfig) -> Result<ToHit> {
    to_hit_distribution_with(config, &Limits::default())
}

pub fn to_hit_distribution_with(config: &AttackConfig, limits: &Limits) -> Result<ToHit> {
    limits.check(&config.to_hit)?;

    let d20 = d20::table(config.advantage, config.luck);
    let modifier = config.to_hit.distribution();
    let band = to_hit_band(d20, &modifier, config.crit_threshold);
    let to_hit = ToHit {
        band,
        crit_hit: critical_hit_probability(d20, config.crit_threshold),
        crit_miss: critical_miss_probability(d20),
    };

    debug!(
        to_hit = %config.to_hit,
        advantage = %config.advantage,
        luck = config.luck,
        crit = config.crit_threshold,
        crit_hit = to_hit.crit_hit,
        "computed to-hit distribution"
    );
    Ok(to_hit)
}
