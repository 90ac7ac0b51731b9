// ABOUTME: Discrete probability distributions over integer outcomes.
// ABOUTME: Point masses, dice, convolution, shifting, and summary statistics.

use serde::Serialize;
use std::collections::btree_map;
use std::collections::BTreeMap;
use tracing::trace;

/// Tolerance used when comparing probability sums.
pub const EPSILON: f64 = 1e-9;

/// A discrete probability distribution: outcome -> probability.
///
/// Outcomes with zero probability are never stored, so the keys are exactly
/// the achievable outcomes. Most distributions sum to one; the to-hit band of
/// an attack deliberately does not, since critical rolls are held outside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Distribution {
    probs: BTreeMap<i64, f64>,
}

impl Distribution {
    /// An empty measure. Not a probability distribution on its own.
    pub fn empty() -> Self {
        Self::default()
    }

    /// All probability on a single outcome.
    ///
    /// `point_mass(0)` is the identity for [`Distribution::convolve`].
    pub fn point_mass(value: i64) -> Self {
        Self {
            probs: BTreeMap::from([(value, 1.0)]),
        }
    }

    /// A fair die with `sides` faces.
    ///
    /// Positive sides give 1..=sides; negative sides give the subtracted die
    /// -1..=-|sides|.
    pub fn uniform_die(sides: i64) -> Self {
        debug_assert_ne!(sides, 0, "a die needs at least one face");
        let n = sides.abs();
        let sign = sides.signum();
        let p = 1.0 / n as f64;
        (1..=n).map(|face| (sign * face, p)).collect()
    }

    /// Probability of `value`, zero if it is not achievable.
    pub fn get(&self, value: i64) -> f64 {
        self.probs.get(&value).copied().unwrap_or(0.0)
    }

    /// Outcomes and probabilities in ascending outcome order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.probs.iter().map(|(&k, &v)| (k, v))
    }

    /// Number of achievable outcomes.
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Smallest achievable outcome.
    pub fn min(&self) -> Option<i64> {
        self.probs.keys().next().copied()
    }

    /// Largest achievable outcome.
    pub fn max(&self) -> Option<i64> {
        self.probs.keys().next_back().copied()
    }

    /// Total probability mass.
    pub fn total(&self) -> f64 {
        self.probs.values().sum()
    }

    /// True if the mass sums to one within [`EPSILON`].
    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() < EPSILON
    }

    /// Sum of `value * probability`.
    ///
    /// For a sub-probability measure this is the unconditional contribution,
    /// which is zero for an empty measure.
    pub fn mean(&self) -> f64 {
        self.iter().map(|(v, p)| v as f64 * p).sum()
    }

    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.iter()
            .map(|(v, p)| {
                let d = v as f64 - mean;
                d * d * p
            })
            .sum()
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Probability of an outcome of at least `threshold`.
    pub fn at_least(&self, threshold: i64) -> f64 {
        self.probs.range(threshold..).map(|(_, &p)| p).sum()
    }

    /// Reverse cumulative series: each outcome paired with P(X >= outcome).
    pub fn survival(&self) -> Vec<(i64, f64)> {
        let mut acc = 0.0;
        let mut out: Vec<(i64, f64)> = self
            .probs
            .iter()
            .rev()
            .map(|(&v, &p)| {
                acc += p;
                (v, acc)
            })
            .collect();
        out.reverse();
        out
    }

    /// Distribution of `X + Y` for independent `X` (self) and `Y` (other).
    ///
    /// Works on dense arrays spanning each side's lowest to highest outcome.
    /// Convolving with a fair die costs one pass over the other side.
    pub fn convolve(&self, other: &Distribution) -> Distribution {
        let (Some((a_min, a)), Some((b_min, b))) = (self.dense(), other.dense()) else {
            return Self::empty();
        };

        let sums = if is_flat(&b) && is_gapless(&a) {
            window_sums(&a, b.len(), b[0])
        } else if is_flat(&a) && is_gapless(&b) {
            window_sums(&b, a.len(), a[0])
        } else {
            let mut sums = vec![0.0; a.len() + b.len() - 1];
            for (i, &pa) in a.iter().enumerate() {
                if pa == 0.0 {
                    continue;
                }
                for (j, &pb) in b.iter().enumerate() {
                    sums[i + j] += pa * pb;
                }
            }
            sums
        };

        let result: Distribution = sums
            .into_iter()
            .enumerate()
            .map(|(k, p)| (a_min + b_min + k as i64, p))
            .collect();
        trace!(
            left = self.len(),
            right = other.len(),
            result = result.len(),
            "convolved"
        );
        result
    }

    /// Lowest outcome and the probabilities of every outcome from there up
    /// to the highest, zero where an outcome is not achievable.
    fn dense(&self) -> Option<(i64, Vec<f64>)> {
        let (min, max) = (self.min()?, self.max()?);
        let mut probs = vec![0.0; (max - min + 1) as usize];
        for (&v, &p) in &self.probs {
            probs[(v - min) as usize] = p;
        }
        Some((min, probs))
    }

    /// Distribution of `X + offset`.
    pub fn shift(&self, offset: i64) -> Distribution {
        Self {
            probs: self.probs.iter().map(|(&k, &v)| (k + offset, v)).collect(),
        }
    }

    /// Distribution of `-X`.
    pub fn negate(&self) -> Distribution {
        Self {
            probs: self.probs.iter().map(|(&k, &v)| (-k, v)).collect(),
        }
    }

    /// Convolution of every distribution in `parts`.
    ///
    /// An empty iterator yields `point_mass(0)`.
    pub fn sum_of<'a>(parts: impl IntoIterator<Item = &'a Distribution>) -> Distribution {
        parts
            .into_iter()
            .fold(Self::point_mass(0), |acc, part| acc.convolve(part))
    }

    /// True if both have the same outcomes with probabilities within `eps`.
    pub fn approx_eq(&self, other: &Distribution, eps: f64) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((a, pa), (b, pb))| a == b && (pa - pb).abs() < eps)
    }
}

fn is_flat(probs: &[f64]) -> bool {
    probs.iter().all(|&p| p == probs[0])
}

fn is_gapless(probs: &[f64]) -> bool {
    probs.iter().all(|&p| p > 0.0)
}

/// Convolution of `probs` with `width` outcomes of equal probability `p`,
/// through a running window over prefix sums.
fn window_sums(probs: &[f64], width: usize, p: f64) -> Vec<f64> {
    let mut prefix = Vec::with_capacity(probs.len() + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &q in probs {
        acc += q;
        prefix.push(acc);
    }

    (0..probs.len() + width - 1)
        .map(|k| {
            let hi = (k + 1).min(probs.len());
            let lo = (k + 1).saturating_sub(width);
            p * (prefix[hi] - prefix[lo])
        })
        .collect()
}

impl FromIterator<(i64, f64)> for Distribution {
    /// Accumulates probabilities per outcome, dropping non-positive mass.
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        let mut probs = BTreeMap::new();
        for (value, p) in iter {
            *probs.entry(value).or_insert(0.0) += p;
        }
        probs.retain(|_, p| *p > 0.0);
        Self { probs }
    }
}

impl<'a> IntoIterator for &'a Distribution {
    type Item = (&'a i64, &'a f64);
    type IntoIter = btree_map::Iter<'a, i64, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.probs.iter()
    }
}
