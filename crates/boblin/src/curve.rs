// ABOUTME: Expected damage as a function of the target's defense.
// ABOUTME: Normal hits need the total to reach the defense; critical hits always land.

use crate::attack::{to_hit_distribution_with, AttackConfig, ToHit};
use crate::config::{CurveWindow, Limits};
use crate::damage::{damage_distributions_with, DamageConfig};
use crate::dist::Distribution;
use crate::error::Result;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Defense values the curve covers for a given to-hit band.
///
/// Starts at `min_defense` and runs `margin` past the highest non-critical
/// total, but never beyond `cap`. An empty band covers only `min_defense`.
pub fn defense_range(band: &Distribution, window: &CurveWindow) -> RangeInclusive<i64> {
    let lower = window.min_defense;
    let upper = band
        .max()
        .map_or(lower, |max| (max + window.margin).max(lower))
        .min(window.cap);
    lower..=upper
}

/// Expected damage per attack for every defense in the window.
///
/// `E(t) = avg_normal * P(total >= t) + avg_critical * P(crit)`.
pub fn expected_damage_curve(
    band: &Distribution,
    crit_hit: f64,
    avg_normal: f64,
    avg_critical: f64,
    window: &CurveWindow,
) -> BTreeMap<i64, f64> {
    let crit_damage = avg_critical * crit_hit;
    defense_range(band, window)
        .map(|defense| (defense, avg_normal * band.at_least(defense) + crit_damage))
        .collect()
}

/// Expected damage curve for an attack and its damage roll, with the default
/// [`Limits`].
pub fn expected_damage_vs_defense(
    attack: &AttackConfig,
    damage: &DamageConfig,
    window: &CurveWindow,
) -> Result<BTreeMap<i64, f64>> {
    expected_damage_vs_defense_with(attack, damage, window, &Limits::default())
}

pub fn expected_damage_vs_defense_with(
    attack: &AttackConfig,
    damage: &DamageConfig,
    window: &CurveWindow,
    limits: &Limits,
) -> Result<BTreeMap<i64, f64>> {
    let ToHit { band, crit_hit, .. } = to_hit_distribution_with(attack, limits)?;
    let damage = damage_distributions_with(damage, limits)?;
    Ok(expected_damage_curve(
        &band,
        crit_hit,
        damage.normal_mean(),
        damage.critical_mean(),
        window,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ParsedExpression;
    use crate::d20::AdvantageMode;
    use crate::dist::EPSILON;
    use proptest::prelude::*;

    #[test]
    fn test_window_bounds() {
        let attack = AttackConfig::parse("5").unwrap();
        let damage = DamageConfig::parse("1d8 + 3").unwrap();
        let curve =
            expected_damage_vs_defense(&attack, &damage, &CurveWindow::default()).unwrap();
        // Highest non-critical total is 24, plus a margin of 2.
        assert_eq!(curve.keys().next(), Some(&8));
        assert_eq!(curve.keys().next_back(), Some(&26));
    }

    #[test]
    fn test_cap() {
        let attack = AttackConfig::parse("30").unwrap();
        let damage = DamageConfig::parse("1d8").unwrap();
        let curve =
            expected_damage_vs_defense(&attack, &damage, &CurveWindow::default()).unwrap();
        assert_eq!(curve.keys().next_back(), Some(&30));
    }

    #[test]
    fn test_expected_values() {
        let attack = AttackConfig::parse("5").unwrap();
        let damage = DamageConfig::parse("2d6").unwrap();
        let curve =
            expected_damage_vs_defense(&attack, &damage, &CurveWindow::default()).unwrap();
        // Defense 15 needs a natural 10..=19 for a normal hit (0.5), plus crits.
        assert!((curve[&15] - (7.0 * 0.5 + 14.0 * 0.05)).abs() < EPSILON);
        // Past every normal total only crits deal damage.
        assert!((curve[&26] - 14.0 * 0.05).abs() < EPSILON);
    }

    #[test]
    fn test_empty_band() {
        let attack = AttackConfig::parse("2")
            .unwrap()
            .with_crit_threshold(2)
            .unwrap();
        let damage = DamageConfig::parse("1d6").unwrap();
        let curve =
            expected_damage_vs_defense(&attack, &damage, &CurveWindow::default()).unwrap();
        assert_eq!(curve.len(), 1);
        assert!((curve[&8] - 7.0 * 0.95).abs() < EPSILON);
    }

    #[test]
    fn test_low_totals_keep_min_defense() {
        let band: Distribution = [(3, 0.9)].into_iter().collect();
        let range = defense_range(&band, &CurveWindow::default());
        assert_eq!(range, 8..=8);
    }

    proptest! {
        #[test]
        fn prop_curve_is_non_increasing(
            to_hit in -5i64..15,
            sides in 1i64..12,
            count in 1usize..4,
            flat in 0i64..6,
            code in -1i8..=2,
            crit in 2i64..=20,
            luck in any::<bool>(),
            reroll_low in any::<bool>(),
        ) {
            let attack = AttackConfig::new(ParsedExpression::flat(to_hit))
                .with_advantage(AdvantageMode::try_from(code).unwrap())
                .with_luck(luck)
                .with_crit_threshold(crit)
                .unwrap();
            let dice = vec![sides; count];
            let damage = DamageConfig::new(ParsedExpression::new(dice, flat).unwrap())
                .with_reroll_low(reroll_low);
            let curve =
                expected_damage_vs_defense(&attack, &damage, &CurveWindow::default()).unwrap();
            let values: Vec<f64> = curve.values().copied().collect();
            for pair in values.windows(2) {
                prop_assert!(pair[0] + EPSILON >= pair[1]);
            }
        }
    }
}
