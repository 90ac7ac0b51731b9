// ABOUTME: Damage distributions for normal and critical hits.
// ABOUTME: Supports rerolling low damage dice once and doubling dice on a critical.

use crate::ast::ParsedExpression;
use crate::config::Limits;
use crate::dist::Distribution;
use crate::error::Result;
use serde::Serialize;
use tracing::debug;

/// Faces that the reroll-low option rerolls: 1 and 2.
pub const REROLL_FACES: i64 = 2;

/// Everything that shapes the damage roll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageConfig {
    damage: ParsedExpression,
    reroll_low: bool,
}

impl DamageConfig {
    pub fn new(damage: ParsedExpression) -> Self {
        Self {
            damage,
            reroll_low: false,
        }
    }

    /// Parse the damage notation.
    pub fn parse(damage: &str) -> Result<Self> {
        Ok(Self::new(crate::parser::parse(damage)?))
    }

    /// Reroll damage dice showing 1 or 2 once, keeping the new result.
    pub fn with_reroll_low(mut self, reroll_low: bool) -> Self {
        self.reroll_low = reroll_low;
        self
    }

    pub fn damage(&self) -> &ParsedExpression {
        &self.damage
    }

    pub fn reroll_low(&self) -> bool {
        self.reroll_low
    }
}

/// Damage dealt by a normal hit and by a critical hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageDistributions {
    pub normal: Distribution,
    pub critical: Distribution,
}

impl DamageDistributions {
    pub fn normal_mean(&self) -> f64 {
        self.normal.mean()
    }

    pub fn critical_mean(&self) -> f64 {
        self.critical.mean()
    }
}

/// Distribution of a single damage die.
///
/// With `reroll_low`, a roll of 1 or 2 is replaced once by a fresh roll:
/// P(1) = P(2) = 2/n², and every other face gets 1/n + 2/n².
/// Subtracted dice (negative `sides`) use the negated faces.
pub fn die_distribution(sides: i64, reroll_low: bool) -> Distribution {
    if !reroll_low {
        return Distribution::uniform_die(sides);
    }

    let n = sides.abs();
    let low = n.min(REROLL_FACES);
    let p = 1.0 / n as f64;
    let die: Distribution = (1..=n)
        .flat_map(|face| {
            if face <= low {
                (1..=n).map(|reroll| (reroll, p * p)).collect::<Vec<_>>()
            } else {
                vec![(face, p)]
            }
        })
        .collect();

    if sides < 0 {
        die.negate()
    } else {
        die
    }
}

/// Damage distributions with the default [`Limits`].
pub fn damage_distributions(config: &DamageConfig) -> Result<DamageDistributions> {
    damage_distributions_with(config, &Limits::default())
}

pub fn damage_distributions_with(
    config: &DamageConfig,
    limits: &Limits,
) -> Result<DamageDistributions> {
    let critical_expr = config.damage.doubled();
    // The critical roll is the larger of the two.
    limits.check(&critical_expr)?;

    let die = |sides| die_distribution(sides, config.reroll_low);
    let damage = DamageDistributions {
        normal: config.damage.distribution_with(die),
        critical: critical_expr.distribution_with(die),
    };

    debug!(
        damage = %config.damage,
        reroll_low = config.reroll_low,
        normal_mean = damage.normal_mean(),
        critical_mean = damage.critical_mean(),
        "computed damage distributions"
    );
    Ok(damage)
}
