// ABOUTME: A complete calculation and everything it reports.
// ABOUTME: Bundles the to-hit, damage, and expected damage results for presentation layers.

use crate::attack::{to_hit_distribution_with, AttackConfig, ToHit};
use crate::config::{CurveWindow, Limits};
use crate::curve::expected_damage_curve;
use crate::damage::{damage_distributions_with, DamageConfig, DamageDistributions};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// An attack, its optional damage roll, and how far to take the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub attack: AttackConfig,
    pub damage: Option<DamageConfig>,
    pub window: CurveWindow,
    pub limits: Limits,
}

impl Calculation {
    pub fn new(attack: AttackConfig) -> Self {
        Self {
            attack,
            damage: None,
            window: CurveWindow::default(),
            limits: Limits::default(),
        }
    }

    pub fn with_damage(mut self, damage: DamageConfig) -> Self {
        self.damage = Some(damage);
        self
    }

    pub fn with_window(mut self, window: CurveWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Runs every model the calculation asks for.
    pub fn report(&self) -> Result<Report> {
        let to_hit = to_hit_distribution_with(&self.attack, &self.limits)?;

        let damage = match &self.damage {
            Some(config) => {
                let distributions = damage_distributions_with(config, &self.limits)?;
                let normal_mean = distributions.normal_mean();
                let critical_mean = distributions.critical_mean();
                let expected_damage = expected_damage_curve(
                    &to_hit.band,
                    to_hit.crit_hit,
                    normal_mean,
                    critical_mean,
                    &self.window,
                );
                Some(DamageReport {
                    config: config.clone(),
                    distributions,
                    normal_mean,
                    critical_mean,
                    expected_damage,
                })
            }
            None => None,
        };

        info!(
            to_hit = %self.attack.to_hit(),
            damage = damage.is_some(),
            "calculation complete"
        );

        Ok(Report {
            attack: self.attack.clone(),
            to_hit,
            damage,
        })
    }
}

/// Everything computed about the damage side of an attack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageReport {
    pub config: DamageConfig,
    pub distributions: DamageDistributions,
    pub normal_mean: f64,
    pub critical_mean: f64,
    /// Defense -> expected damage per attack.
    pub expected_damage: BTreeMap<i64, f64>,
}

/// Result of [`Calculation::report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub attack: AttackConfig,
    pub to_hit: ToHit,
    pub damage: Option<DamageReport>,
}
