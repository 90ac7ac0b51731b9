// ABOUTME: Parsed form of a dice notation expression.
// ABOUTME: A signed multiset of die sizes plus a flat modifier, e.g. "2d6 - d4 + 3".

use crate::dist::Distribution;
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A parsed dice expression.
///
/// Each entry of `dice` is one die: `6` adds a d6, `-4` subtracts a d4.
/// The order of entries carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ParsedExpression {
    dice: Vec<i64>,
    flat: i64,
}

impl ParsedExpression {
    /// Build an expression from signed die sizes and a flat modifier.
    ///
    /// Fails if any die has zero faces.
    pub fn new(dice: Vec<i64>, flat: i64) -> Result<Self> {
        if dice.contains(&0) {
            return Err(Error::InvalidDiceSides(0));
        }
        Ok(Self { dice, flat })
    }

    /// A constant expression with no dice.
    pub fn flat(value: i64) -> Self {
        Self {
            dice: Vec::new(),
            flat: value,
        }
    }

    /// Signed die sizes, one entry per die.
    pub fn dice(&self) -> &[i64] {
        &self.dice
    }

    /// The flat modifier added after all dice.
    pub fn modifier(&self) -> i64 {
        self.flat
    }

    /// Number of dice, added and subtracted.
    pub fn dice_count(&self) -> usize {
        self.dice.len()
    }

    /// True if the expression has no dice.
    pub fn is_constant(&self) -> bool {
        self.dice.is_empty()
    }

    /// The same expression with every die term rolled twice.
    ///
    /// The flat modifier is not doubled.
    pub fn doubled(&self) -> Self {
        let mut dice = Vec::with_capacity(self.dice.len() * 2);
        dice.extend_from_slice(&self.dice);
        dice.extend_from_slice(&self.dice);
        Self {
            dice,
            flat: self.flat,
        }
    }

    /// Smallest achievable total.
    pub fn min_total(&self) -> i64 {
        self.dice
            .iter()
            .map(|&d| if d > 0 { 1 } else { d })
            .sum::<i64>()
            + self.flat
    }

    /// Largest achievable total.
    pub fn max_total(&self) -> i64 {
        self.dice
            .iter()
            .map(|&d| if d > 0 { d } else { -1 })
            .sum::<i64>()
            + self.flat
    }

    /// Distribution of the total with every die fair.
    pub fn distribution(&self) -> Distribution {
        self.distribution_with(Distribution::uniform_die)
    }

    /// Distribution of the total, building each die's own distribution with
    /// `die` (called with the signed die size).
    pub fn distribution_with(&self, die: impl Fn(i64) -> Distribution) -> Distribution {
        let mut per_die: BTreeMap<i64, Distribution> = BTreeMap::new();
        let mut total = Distribution::point_mass(0);
        for &sides in &self.dice {
            let part = per_die.entry(sides).or_insert_with(|| die(sides));
            total = total.convolve(part);
        }
        total.shift(self.flat)
    }

    /// Groups consecutive equal dice into (count, signed sides) pairs.
    fn groups(&self) -> Vec<(usize, i64)> {
        let mut groups: Vec<(usize, i64)> = Vec::new();
        for &die in &self.dice {
            match groups.last_mut() {
                Some((count, sides)) if *sides == die => *count += 1,
                _ => groups.push((1, die)),
            }
        }
        groups
    }
}

impl FromStr for ParsedExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::parser::parse(s)
    }
}

impl fmt::Display for ParsedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (count, sides) in self.groups() {
            match (first, sides < 0) {
                (true, false) => {}
                (true, true) => write!(f, "-")?,
                (false, false) => write!(f, " + ")?,
                (false, true) => write!(f, " - ")?,
            }
            write!(f, "{}d{}", count, sides.abs())?;
            first = false;
        }

        if first {
            write!(f, "{}", self.flat)
        } else if self.flat > 0 {
            write!(f, " + {}", self.flat)
        } else if self.flat < 0 {
            write!(f, " - {}", -self.flat)
        } else {
            Ok(())
        }
    }
}
