// ABOUTME: Distribution of the effective d20 roll under advantage rules.
// ABOUTME: Closed forms for plain rolls, enumeration when the luck reroll is active.

use crate::dist::Distribution;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

/// Faces on the attack die.
pub const D20: i64 = 20;

/// How many d20 are rolled and which one is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvantageMode {
    /// Roll two, keep the lower.
    Disadvantage,
    /// Roll one.
    #[default]
    Normal,
    /// Roll two, keep the higher.
    Advantage,
    /// Roll three, keep the highest.
    SuperAdvantage,
}

impl AdvantageMode {
    pub const ALL: [AdvantageMode; 4] = [
        AdvantageMode::Disadvantage,
        AdvantageMode::Normal,
        AdvantageMode::Advantage,
        AdvantageMode::SuperAdvantage,
    ];

    /// Number of d20 rolled.
    pub fn dice_count(self) -> usize {
        match self {
            AdvantageMode::Normal => 1,
            AdvantageMode::Disadvantage | AdvantageMode::Advantage => 2,
            AdvantageMode::SuperAdvantage => 3,
        }
    }

    /// Picks the kept value out of two rolled values.
    pub fn keep(self, a: i64, b: i64) -> i64 {
        match self {
            AdvantageMode::Disadvantage => a.min(b),
            AdvantageMode::Normal | AdvantageMode::Advantage | AdvantageMode::SuperAdvantage => {
                a.max(b)
            }
        }
    }

    /// Numeric code: -1 disadvantage, 0 normal, 1 advantage, 2 super advantage.
    pub fn code(self) -> i8 {
        match self {
            AdvantageMode::Disadvantage => -1,
            AdvantageMode::Normal => 0,
            AdvantageMode::Advantage => 1,
            AdvantageMode::SuperAdvantage => 2,
        }
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            AdvantageMode::Disadvantage => "Disadvantage",
            AdvantageMode::Normal => "Normal",
            AdvantageMode::Advantage => "Advantage",
            AdvantageMode::SuperAdvantage => "Super Advantage",
        }
    }

    fn index(self) -> usize {
        (self.code() + 1) as usize
    }
}

impl TryFrom<i8> for AdvantageMode {
    type Error = Error;

    fn try_from(code: i8) -> Result<Self> {
        match code {
            -1 => Ok(AdvantageMode::Disadvantage),
            0 => Ok(AdvantageMode::Normal),
            1 => Ok(AdvantageMode::Advantage),
            2 => Ok(AdvantageMode::SuperAdvantage),
            _ => Err(Error::UnknownAdvantageMode(code.to_string())),
        }
    }
}

impl FromStr for AdvantageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i8>() {
            return AdvantageMode::try_from(code);
        }
        let normalized: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "disadvantage" | "dis" => Ok(AdvantageMode::Disadvantage),
            "normal" | "none" => Ok(AdvantageMode::Normal),
            "advantage" | "adv" => Ok(AdvantageMode::Advantage),
            "superadvantage" | "super" => Ok(AdvantageMode::SuperAdvantage),
            _ => Err(Error::UnknownAdvantageMode(s.to_string())),
        }
    }
}

impl fmt::Display for AdvantageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// P(kept d20 = face) without any reroll.
pub fn closed_form(mode: AdvantageMode, face: i64) -> f64 {
    let x = face as f64;
    match mode {
        AdvantageMode::Normal => 1.0 / 20.0,
        AdvantageMode::Advantage => (2.0 * x - 1.0) / 400.0,
        AdvantageMode::Disadvantage => (41.0 - 2.0 * x) / 400.0,
        AdvantageMode::SuperAdvantage => (x.powi(3) - (x - 1.0).powi(3)) / 8000.0,
    }
}

/// Distribution of one d20, optionally rerolled once on a natural 1.
pub fn single_die(luck: bool) -> Distribution {
    let plain = Distribution::uniform_die(D20);
    if !luck {
        return plain;
    }
    let p = 1.0 / D20 as f64;
    plain
        .iter()
        .flat_map(|(face, pf)| {
            if face == 1 {
                // The first 1 is replaced by a fresh roll.
                plain
                    .iter()
                    .map(|(reroll, pr)| (reroll, pf * pr))
                    .collect::<Vec<_>>()
            } else {
                vec![(face, p)]
            }
        })
        .collect()
}

/// Kept value of `mode.dice_count()` independent dice, by enumerating every
/// combination of faces.
pub fn enumerate(mode: AdvantageMode, per_die: &Distribution) -> Distribution {
    let mut kept = per_die.clone();
    for _ in 1..mode.dice_count() {
        kept = kept
            .iter()
            .flat_map(move |(a, pa)| {
                per_die
                    .iter()
                    .map(move |(b, pb)| (mode.keep(a, b), pa * pb))
            })
            .collect();
    }
    kept
}

fn compute(mode: AdvantageMode, luck: bool) -> Distribution {
    if luck {
        // Each die is rerolled on its own before the kept one is picked.
        enumerate(mode, &single_die(true))
    } else {
        (1..=D20).map(|face| (face, closed_form(mode, face))).collect()
    }
}

fn tables() -> &'static [Distribution] {
    static TABLES: OnceLock<Vec<Distribution>> = OnceLock::new();
    TABLES.get_or_init(|| {
        debug!("building d20 tables");
        AdvantageMode::ALL
            .iter()
            .flat_map(|&mode| [compute(mode, false), compute(mode, true)])
            .collect()
    })
}

/// Distribution of the effective d20 for the given mode.
///
/// Computed once per (mode, luck) pair and shared afterwards.
pub fn table(mode: AdvantageMode, luck: bool) -> &'static Distribution {
    &tables()[mode.index() * 2 + usize::from(luck)]
}

/// Owned copy of [`table`].
pub fn d20_distribution(mode: AdvantageMode, luck: bool) -> Distribution {
    table(mode, luck).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::EPSILON;

    #[test]
    fn test_normal_is_uniform() {
        let dist = d20_distribution(AdvantageMode::Normal, false);
        assert_eq!(dist.len(), 20);
        for face in 1..=20 {
            assert_eq!(dist.get(face), 0.05);
        }
    }

    #[test]
    fn test_advantage_closed_form() {
        let dist = d20_distribution(AdvantageMode::Advantage, false);
        for x in 1..=20 {
            assert!((dist.get(x) - (2 * x - 1) as f64 / 400.0).abs() < EPSILON);
        }
        assert!(dist.is_normalized());
    }

    #[test]
    fn test_disadvantage_closed_form() {
        let dist = d20_distribution(AdvantageMode::Disadvantage, false);
        for x in 1..=20 {
            assert!((dist.get(x) - (41 - 2 * x) as f64 / 400.0).abs() < EPSILON);
        }
        assert!(dist.is_normalized());
    }

    #[test]
    fn test_super_advantage_normalized() {
        let dist = d20_distribution(AdvantageMode::SuperAdvantage, false);
        assert!(dist.is_normalized());
        assert!((dist.get(20) - 1141.0 / 8000.0).abs() < EPSILON);
    }

    #[test]
    fn test_enumeration_matches_closed_forms() {
        let plain = single_die(false);
        for mode in AdvantageMode::ALL {
            let enumerated = enumerate(mode, &plain);
            assert!(
                enumerated.approx_eq(table(mode, false), EPSILON),
                "{mode} disagrees"
            );
        }
    }

    #[test]
    fn test_luck_single_die() {
        let die = single_die(true);
        assert!(die.is_normalized());
        assert!((die.get(1) - 1.0 / 400.0).abs() < EPSILON);
        assert!((die.get(2) - 21.0 / 400.0).abs() < EPSILON);
    }

    #[test]
    fn test_luck_tables() {
        for mode in AdvantageMode::ALL {
            let lucky = table(mode, true);
            let plain = table(mode, false);
            assert!(lucky.is_normalized(), "{mode} with luck not normalized");
            assert_eq!(lucky.len(), 20);
            assert!(lucky.get(1) < plain.get(1));
            assert!(lucky.mean() > plain.mean());
        }
    }

    #[test]
    fn test_luck_disadvantage_per_die() {
        // Keeping the lower die, a 1 on either die after its reroll is kept.
        let dist = table(AdvantageMode::Disadvantage, true);
        let p1 = 1.0 / 400.0;
        let expected = 1.0 - (1.0 - p1) * (1.0 - p1);
        assert!((dist.get(1) - expected).abs() < EPSILON);
    }

    #[test]
    fn test_mode_codes_round_trip() {
        for mode in AdvantageMode::ALL {
            assert_eq!(AdvantageMode::try_from(mode.code()).unwrap(), mode);
        }
        assert!(matches!(
            AdvantageMode::try_from(3),
            Err(Error::UnknownAdvantageMode(_))
        ));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(
            "Super Advantage".parse::<AdvantageMode>().unwrap(),
            AdvantageMode::SuperAdvantage
        );
        assert_eq!("adv".parse::<AdvantageMode>().unwrap(), AdvantageMode::Advantage);
        assert_eq!("-1".parse::<AdvantageMode>().unwrap(), AdvantageMode::Disadvantage);
        assert!("sideways".parse::<AdvantageMode>().is_err());
    }
}
