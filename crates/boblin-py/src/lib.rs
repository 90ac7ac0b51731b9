// ABOUTME: Python bindings for the boblin library using PyO3.
// ABOUTME: Exposes parsing, exact attack distributions, expected damage and simulation to Python.

use ::boblin as core;
use ::boblin::{AdvantageMode, AttackConfig, Calculation, CurveWindow, DamageConfig};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::BTreeMap;

fn value_error(e: core::Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn attack_config(to_hit: &str, mode: &str, luck: bool, crit: i64) -> core::Result<AttackConfig> {
    let mode: AdvantageMode = mode.parse()?;
    AttackConfig::parse(to_hit)?
        .with_advantage(mode)
        .with_luck(luck)
        .with_crit_threshold(crit)
}

fn to_map(dist: &core::Distribution) -> BTreeMap<i64, f64> {
    dist.iter().collect()
}

/// Result of an attack roll against an unknown defense.
#[pyclass]
#[derive(Clone)]
pub struct ToHit {
    /// Non-critical totals and their probabilities.
    #[pyo3(get)]
    pub band: BTreeMap<i64, f64>,
    #[pyo3(get)]
    pub crit_hit: f64,
    #[pyo3(get)]
    pub crit_miss: f64,
    inner: core::ToHit,
}

#[pymethods]
impl ToHit {
    /// Chance to hit a target with the given defense.
    fn hit_chance(&self, defense: i64) -> f64 {
        self.inner.hit_chance(defense)
    }

    /// Plot series as (label, probability, probability of this or better).
    fn series(&self) -> Vec<(String, f64, f64)> {
        self.inner
            .series()
            .into_iter()
            .map(|(outcome, p, at_least)| (outcome.to_string(), p, at_least))
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "ToHit(crit_hit={:.4}, crit_miss={:.4}, totals={})",
            self.crit_hit,
            self.crit_miss,
            self.band.len()
        )
    }
}

impl From<core::ToHit> for ToHit {
    fn from(inner: core::ToHit) -> Self {
        Self {
            band: to_map(&inner.band),
            crit_hit: inner.crit_hit,
            crit_miss: inner.crit_miss,
            inner,
        }
    }
}

/// Damage of a normal hit and of a critical hit.
#[pyclass]
#[derive(Clone)]
pub struct Damage {
    #[pyo3(get)]
    pub normal: BTreeMap<i64, f64>,
    #[pyo3(get)]
    pub critical: BTreeMap<i64, f64>,
    #[pyo3(get)]
    pub normal_mean: f64,
    #[pyo3(get)]
    pub critical_mean: f64,
}

#[pymethods]
impl Damage {
    fn __repr__(&self) -> String {
        format!(
            "Damage(normal_mean={:.2}, critical_mean={:.2})",
            self.normal_mean, self.critical_mean
        )
    }
}

/// Result of a Monte Carlo simulation.
#[pyclass]
#[derive(Clone)]
pub struct SimResult {
    #[pyo3(get)]
    pub n: usize,
    #[pyo3(get)]
    pub crit_miss: usize,
    #[pyo3(get)]
    pub crit_hit: usize,
    /// Non-critical totals: value -> count.
    #[pyo3(get)]
    pub totals: BTreeMap<i64, usize>,
    #[pyo3(get)]
    pub normal_damage: BTreeMap<i64, usize>,
    #[pyo3(get)]
    pub critical_damage: BTreeMap<i64, usize>,
}

#[pymethods]
impl SimResult {
    /// Observed frequency of each non-critical total.
    fn probabilities(&self) -> BTreeMap<i64, f64> {
        let n = self.n.max(1) as f64;
        self.totals
            .iter()
            .map(|(&k, &v)| (k, v as f64 / n))
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "SimResult(n={}, crit_hit={}, crit_miss={})",
            self.n, self.crit_hit, self.crit_miss
        )
    }
}

/// Parse a dice expression into its dice and flat modifier.
///
/// Example:
///     >>> parse("2d6 - d4 + 3")
///     ([6, 6, -4], 3)
#[pyfunction]
fn parse(expr: &str) -> PyResult<(Vec<i64>, i64)> {
    core::parse(expr)
        .map(|e| (e.dice().to_vec(), e.modifier()))
        .map_err(value_error)
}

/// Distribution of the effective d20.
///
/// Args:
///     mode: "normal", "advantage", "disadvantage", "super", or -1..2
///     luck: reroll natural 1s once
#[pyfunction]
#[pyo3(signature = (mode="normal", luck=false))]
fn d20_distribution(mode: &str, luck: bool) -> PyResult<BTreeMap<i64, f64>> {
    let mode: AdvantageMode = mode.parse().map_err(value_error)?;
    Ok(to_map(&core::d20_distribution(mode, luck)))
}

/// To-hit distribution of an attack.
///
/// Example:
///     >>> t = to_hit("1d4 + 5", mode="advantage")
///     >>> t.crit_hit
///     0.0975
#[pyfunction]
#[pyo3(signature = (to_hit, mode="normal", luck=false, crit=20))]
fn to_hit(to_hit: &str, mode: &str, luck: bool, crit: i64) -> PyResult<ToHit> {
    let attack = attack_config(to_hit, mode, luck, crit).map_err(value_error)?;
    core::to_hit_distribution(&attack)
        .map(ToHit::from)
        .map_err(value_error)
}

/// Damage distributions of a normal and a critical hit.
#[pyfunction]
#[pyo3(signature = (damage, reroll_low=false))]
fn damage(damage: &str, reroll_low: bool) -> PyResult<Damage> {
    let config = DamageConfig::parse(damage)
        .map_err(value_error)?
        .with_reroll_low(reroll_low);
    core::damage_distributions(&config)
        .map(|d| Damage {
            normal: to_map(&d.normal),
            critical: to_map(&d.critical),
            normal_mean: d.normal_mean(),
            critical_mean: d.critical_mean(),
        })
        .map_err(value_error)
}

/// Expected damage per attack for each defense value.
///
/// Example:
///     >>> curve = expected_damage("5", "2d6")
///     >>> round(curve[15], 2)
///     4.2
#[pyfunction]
#[pyo3(signature = (to_hit, damage, mode="normal", luck=false, crit=20, reroll_low=false))]
fn expected_damage(
    to_hit: &str,
    damage: &str,
    mode: &str,
    luck: bool,
    crit: i64,
    reroll_low: bool,
) -> PyResult<BTreeMap<i64, f64>> {
    let attack = attack_config(to_hit, mode, luck, crit).map_err(value_error)?;
    let damage = DamageConfig::parse(damage)
        .map_err(value_error)?
        .with_reroll_low(reroll_low);
    core::expected_damage_vs_defense(&attack, &damage, &CurveWindow::default())
        .map_err(value_error)
}

/// Simulate attacks to check the exact numbers.
///
/// Args:
///     n: Number of trials to run (default: 10000)
///     seed: Optional seed for reproducible runs
#[pyfunction]
#[pyo3(signature = (to_hit, damage=None, mode="normal", luck=false, crit=20, reroll_low=false, n=10000, seed=None))]
#[allow(clippy::too_many_arguments)]
fn simulate(
    to_hit: &str,
    damage: Option<&str>,
    mode: &str,
    luck: bool,
    crit: i64,
    reroll_low: bool,
    n: usize,
    seed: Option<u64>,
) -> PyResult<SimResult> {
    let attack = attack_config(to_hit, mode, luck, crit).map_err(value_error)?;
    let mut calculation = Calculation::new(attack);
    if let Some(damage) = damage {
        let damage = DamageConfig::parse(damage)
            .map_err(value_error)?
            .with_reroll_low(reroll_low);
        calculation = calculation.with_damage(damage);
    }

    let result = match seed {
        Some(seed) => core::simulate_seeded(&calculation, n, seed),
        None => core::simulate(&calculation, n),
    }
    .map_err(value_error)?;

    Ok(SimResult {
        n: result.n,
        crit_miss: result.crit_miss,
        crit_hit: result.crit_hit,
        totals: result.totals.into_iter().collect(),
        normal_damage: result.normal_damage.into_iter().collect(),
        critical_damage: result.critical_damage.into_iter().collect(),
    })
}

/// Python module for boblin.
#[pymodule]
fn boblin(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse, m)?)?;
    m.add_function(wrap_pyfunction!(d20_distribution, m)?)?;
    m.add_function(wrap_pyfunction!(to_hit, m)?)?;
    m.add_function(wrap_pyfunction!(damage, m)?)?;
    m.add_function(wrap_pyfunction!(expected_damage, m)?)?;
    m.add_function(wrap_pyfunction!(simulate, m)?)?;
    m.add_class::<ToHit>()?;
    m.add_class::<Damage>()?;
    m.add_class::<SimResult>()?;
    Ok(())
}
