// ABOUTME: Calculation settings, their validation, and computation limits.
// ABOUTME: A typed table of user-editable fields plus the defaults a new calculation starts from.

use crate::ast::ParsedExpression;
use crate::attack::{validate_crit_threshold, AttackConfig, MAX_CRIT_THRESHOLD};
use crate::d20::AdvantageMode;
use crate::damage::DamageConfig;
use crate::error::{Error, Result};
use crate::parser;
use crate::report::Calculation;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bounds on how much work a single request may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Most dice in one expression, counting the doubled critical roll.
    pub max_dice: usize,
    /// Most faces on any single die.
    pub max_faces: usize,
    /// Most distinct totals an expression may produce.
    pub max_support: usize,
    /// Most multiply-adds the convolutions may take, summed over the dice
    /// as running support times faces.
    pub max_work: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_dice: 100,
            max_faces: 1000,
            max_support: 10_000,
            max_work: 20_000_000,
        }
    }
}

impl Limits {
    /// Rejects expressions whose distribution would be too costly to build.
    pub fn check(&self, expr: &ParsedExpression) -> Result<()> {
        let result = self.check_inner(expr);
        if let Err(ref e) = result {
            warn!(expr = %expr, "{e}");
        }
        result
    }

    fn check_inner(&self, expr: &ParsedExpression) -> Result<()> {
        if expr.dice_count() > self.max_dice {
            return Err(Error::ComputationOverflow {
                what: "dice count",
                value: expr.dice_count(),
                limit: self.max_dice,
            });
        }

        let faces = expr
            .dice()
            .iter()
            .map(|d| d.unsigned_abs() as usize)
            .max()
            .unwrap_or(0);
        if faces > self.max_faces {
            return Err(Error::ComputationOverflow {
                what: "die faces",
                value: faces,
                limit: self.max_faces,
            });
        }

        let support = (expr.max_total() - expr.min_total() + 1) as usize;
        if support > self.max_support {
            return Err(Error::ComputationOverflow {
                what: "support size",
                value: support,
                limit: self.max_support,
            });
        }

        let work = estimated_work(expr);
        if work > self.max_work {
            return Err(Error::ComputationOverflow {
                what: "estimated work",
                value: work,
                limit: self.max_work,
            });
        }
        Ok(())
    }
}

/// Cost of folding the dice in order, each die scanned once per total
/// reached so far.
fn estimated_work(expr: &ParsedExpression) -> usize {
    let mut support = 1usize;
    let mut work = 0usize;
    for &sides in expr.dice() {
        let faces = usize::try_from(sides.unsigned_abs()).unwrap_or(usize::MAX);
        work = work.saturating_add(support.saturating_mul(faces));
        support = support.saturating_add(faces.saturating_sub(1));
    }
    work
}

/// Range of defense values the expected damage curve is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveWindow {
    /// First defense value.
    pub min_defense: i64,
    /// How far past the highest non-critical total to keep going.
    pub margin: i64,
    /// Last defense value, whatever the totals.
    pub cap: i64,
}

impl Default for CurveWindow {
    fn default() -> Self {
        Self {
            min_defense: 8,
            margin: 2,
            cap: 30,
        }
    }
}

/// How a setting is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// Picked from a fixed set of options.
    Choice,
    /// Typed in and validated.
    Text,
    /// Switched on and off.
    Flag,
}

/// Names every user-editable setting of a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    Advantage,
    ToHitRoll,
    DamageRoll,
    CritThreshold,
    RerollLow,
    Luck,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::Advantage,
        SettingKey::ToHitRoll,
        SettingKey::DamageRoll,
        SettingKey::CritThreshold,
        SettingKey::RerollLow,
        SettingKey::Luck,
    ];

    pub fn kind(self) -> SettingKind {
        match self {
            SettingKey::Advantage => SettingKind::Choice,
            SettingKey::ToHitRoll | SettingKey::DamageRoll | SettingKey::CritThreshold => {
                SettingKind::Text
            }
            SettingKey::RerollLow | SettingKey::Luck => SettingKind::Flag,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            SettingKey::Advantage => "Roll type",
            SettingKey::ToHitRoll => "To-Hit",
            SettingKey::DamageRoll => "Damage",
            SettingKey::CritThreshold => "Crit",
            SettingKey::RerollLow => "Reroll low",
            SettingKey::Luck => "Luck",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SettingKey::Advantage => "Roll type",
            SettingKey::ToHitRoll => "To-hit modifier",
            SettingKey::DamageRoll => "Damage roll",
            SettingKey::CritThreshold => "Critical hit on",
            SettingKey::RerollLow => "Reroll 1s and 2s on damage dice",
            SettingKey::Luck => "Reroll natural 1s on the d20",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SettingKey::Advantage => {
                "Normal rolls 1d20. Disadvantage rolls 2d20 and keeps the lower. \
                 Advantage rolls 2d20 and keeps the higher. \
                 Super Advantage rolls 3d20 and keeps the highest."
            }
            SettingKey::ToHitRoll => {
                "Bonuses to the attack roll, without the d20. Examples: 5, 1d4 + 7, 2d6 - d4 + 3"
            }
            SettingKey::DamageRoll => {
                "Damage dealt on a hit. Examples: 2d6 + 4, 1d8 + 2d6 + 3, d10 + 5 - d4"
            }
            SettingKey::CritThreshold => "Lowest natural d20 roll that scores a critical hit.",
            SettingKey::RerollLow => "Damage dice showing 1 or 2 are rerolled once.",
            SettingKey::Luck => "Each d20 showing a natural 1 is rerolled once.",
        }
    }

    /// Validates user input for this setting.
    pub fn parse_value(self, text: &str) -> Result<Setting> {
        let text = text.trim();
        match self {
            SettingKey::Advantage => Ok(Setting::Advantage(text.parse()?)),
            SettingKey::ToHitRoll => {
                parser::parse(text)?;
                Ok(Setting::ToHitRoll(text.to_string()))
            }
            SettingKey::DamageRoll => {
                parser::parse(text)?;
                Ok(Setting::DamageRoll(text.to_string()))
            }
            SettingKey::CritThreshold => {
                let value: i64 = text.parse().map_err(|_| Error::Expected {
                    expected: "a whole number".to_string(),
                    found: text.to_string(),
                })?;
                Ok(Setting::CritThreshold(validate_crit_threshold(value)?))
            }
            SettingKey::RerollLow => Ok(Setting::RerollLow(parse_flag(text)?)),
            SettingKey::Luck => Ok(Setting::Luck(parse_flag(text)?)),
        }
    }
}

fn parse_flag(text: &str) -> Result<bool> {
    match text.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidFlag(text.to_string())),
    }
}

/// A validated value for one setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    Advantage(AdvantageMode),
    ToHitRoll(String),
    DamageRoll(String),
    CritThreshold(i64),
    RerollLow(bool),
    Luck(bool),
}

impl Setting {
    pub fn key(&self) -> SettingKey {
        match self {
            Setting::Advantage(_) => SettingKey::Advantage,
            Setting::ToHitRoll(_) => SettingKey::ToHitRoll,
            Setting::DamageRoll(_) => SettingKey::DamageRoll,
            Setting::CritThreshold(_) => SettingKey::CritThreshold,
            Setting::RerollLow(_) => SettingKey::RerollLow,
            Setting::Luck(_) => SettingKey::Luck,
        }
    }
}

/// A calculation being put together, field by field.
///
/// Roll fields hold the text as entered; an empty roll means "not set".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub advantage: AdvantageMode,
    pub to_hit_roll: String,
    pub damage_roll: String,
    pub crit_threshold: i64,
    pub reroll_low: bool,
    pub luck: bool,
    pub window: CurveWindow,
    pub limits: Limits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            advantage: AdvantageMode::Normal,
            to_hit_roll: String::new(),
            damage_roll: String::new(),
            crit_threshold: MAX_CRIT_THRESHOLD,
            reroll_low: false,
            luck: false,
            window: CurveWindow::default(),
            limits: Limits::default(),
        }
    }
}

impl Settings {
    /// Stores a setting, validating it again so hand-built values cannot
    /// slip past the checks in [`SettingKey::parse_value`].
    pub fn apply(&mut self, setting: Setting) -> Result<()> {
        match setting {
            Setting::Advantage(mode) => self.advantage = mode,
            Setting::ToHitRoll(text) => {
                parser::parse(&text)?;
                self.to_hit_roll = text;
            }
            Setting::DamageRoll(text) => {
                parser::parse(&text)?;
                self.damage_roll = text;
            }
            Setting::CritThreshold(value) => {
                self.crit_threshold = validate_crit_threshold(value)?;
            }
            Setting::RerollLow(on) => self.reroll_low = on,
            Setting::Luck(on) => self.luck = on,
        }
        Ok(())
    }

    /// Parses `text` for `key` and stores it.
    pub fn set(&mut self, key: SettingKey, text: &str) -> Result<()> {
        let setting = key.parse_value(text)?;
        self.apply(setting)
    }

    /// Flips a flag setting and returns its new value.
    pub fn toggle(&mut self, key: SettingKey) -> Result<bool> {
        let flag = match key {
            SettingKey::RerollLow => &mut self.reroll_low,
            SettingKey::Luck => &mut self.luck,
            _ => return Err(Error::InvalidFlag(key.short_name().to_string())),
        };
        *flag = !*flag;
        Ok(*flag)
    }

    /// The value of a setting as shown to a user.
    pub fn display_value(&self, key: SettingKey) -> String {
        fn roll(text: &str) -> String {
            if text.is_empty() {
                "not set".to_string()
            } else {
                text.to_string()
            }
        }
        fn flag(on: bool) -> String {
            (if on { "on" } else { "off" }).to_string()
        }

        match key {
            SettingKey::Advantage => self.advantage.name().to_string(),
            SettingKey::ToHitRoll => roll(&self.to_hit_roll),
            SettingKey::DamageRoll => roll(&self.damage_roll),
            SettingKey::CritThreshold if self.crit_threshold == MAX_CRIT_THRESHOLD => {
                self.crit_threshold.to_string()
            }
            SettingKey::CritThreshold => {
                format!("{} - {}", self.crit_threshold, MAX_CRIT_THRESHOLD)
            }
            SettingKey::RerollLow => flag(self.reroll_low),
            SettingKey::Luck => flag(self.luck),
        }
    }

    /// Turns the settings into a calculation.
    ///
    /// The to-hit roll is required; without a damage roll only the to-hit
    /// side is computed.
    pub fn build(&self) -> Result<Calculation> {
        if self.to_hit_roll.trim().is_empty() {
            return Err(Error::MissingSetting("to-hit roll"));
        }

        let attack = AttackConfig::parse(&self.to_hit_roll)?
            .with_advantage(self.advantage)
            .with_luck(self.luck)
            .with_crit_threshold(self.crit_threshold)?;

        let mut calculation = Calculation::new(attack)
            .with_window(self.window)
            .with_limits(self.limits);

        if !self.damage_roll.trim().is_empty() {
            let damage = DamageConfig::parse(&self.damage_roll)?.with_reroll_low(self.reroll_low);
            calculation = calculation.with_damage(damage);
        }

        Ok(calculation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.advantage, AdvantageMode::Normal);
        assert_eq!(settings.crit_threshold, 20);
        assert!(!settings.reroll_low);
        assert!(!settings.luck);
        assert_eq!(settings.display_value(SettingKey::ToHitRoll), "not set");
        assert_eq!(settings.display_value(SettingKey::CritThreshold), "20");
    }

    #[test]
    fn test_parse_crit_threshold() {
        assert_eq!(
            SettingKey::CritThreshold.parse_value("19").unwrap(),
            Setting::CritThreshold(19)
        );
        assert!(matches!(
            SettingKey::CritThreshold.parse_value("1"),
            Err(Error::InvalidCritThreshold(1))
        ));
        assert!(matches!(
            SettingKey::CritThreshold.parse_value("21"),
            Err(Error::InvalidCritThreshold(21))
        ));
        assert!(SettingKey::CritThreshold.parse_value("x").is_err());
    }

    #[test]
    fn test_parse_rolls() {
        assert_eq!(
            SettingKey::ToHitRoll.parse_value(" 1d4 + 7 ").unwrap(),
            Setting::ToHitRoll("1d4 + 7".to_string())
        );
        assert!(SettingKey::DamageRoll.parse_value("2d6 +").is_err());
    }

    #[test]
    fn test_parse_flags_and_modes() {
        assert_eq!(
            SettingKey::Luck.parse_value("yes").unwrap(),
            Setting::Luck(true)
        );
        assert!(matches!(
            SettingKey::RerollLow.parse_value("maybe"),
            Err(Error::InvalidFlag(_))
        ));
        assert_eq!(
            SettingKey::Advantage.parse_value("2").unwrap(),
            Setting::Advantage(AdvantageMode::SuperAdvantage)
        );
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(settings.apply(Setting::ToHitRoll("1d".to_string())).is_err());
        assert!(settings.apply(Setting::CritThreshold(0)).is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_toggle() {
        let mut settings = Settings::default();
        assert!(settings.toggle(SettingKey::RerollLow).unwrap());
        assert_eq!(settings.display_value(SettingKey::RerollLow), "on");
        assert!(!settings.toggle(SettingKey::RerollLow).unwrap());
        assert!(settings.toggle(SettingKey::CritThreshold).is_err());
    }

    #[test]
    fn test_display_values() {
        let mut settings = Settings::default();
        settings.set(SettingKey::CritThreshold, "19").unwrap();
        settings.set(SettingKey::Advantage, "super advantage").unwrap();
        assert_eq!(settings.display_value(SettingKey::CritThreshold), "19 - 20");
        assert_eq!(
            settings.display_value(SettingKey::Advantage),
            "Super Advantage"
        );
    }

    #[test]
    fn test_build_requires_to_hit() {
        assert!(matches!(
            Settings::default().build(),
            Err(Error::MissingSetting(_))
        ));
    }

    #[test]
    fn test_build() {
        let mut settings = Settings::default();
        settings.set(SettingKey::ToHitRoll, "7 + 1d4 - 5 + 1").unwrap();
        settings.set(SettingKey::DamageRoll, "2d6 + 2d8 + 10 + 4 + 1").unwrap();
        settings.set(SettingKey::Advantage, "advantage").unwrap();
        settings.toggle(SettingKey::RerollLow).unwrap();

        let calculation = settings.build().unwrap();
        assert_eq!(calculation.attack.to_hit().dice(), &[4]);
        assert_eq!(calculation.attack.to_hit().modifier(), 3);
        assert_eq!(calculation.attack.advantage(), AdvantageMode::Advantage);

        let damage = calculation.damage.unwrap();
        assert_eq!(damage.damage().dice(), &[6, 6, 8, 8]);
        assert_eq!(damage.damage().modifier(), 15);
        assert!(damage.reroll_low());
    }

    #[test]
    fn test_settings_from_json() {
        let settings: Settings =
            serde_json::from_str(r#"{"to_hit_roll": "5", "advantage": "super_advantage"}"#)
                .unwrap();
        assert_eq!(settings.advantage, AdvantageMode::SuperAdvantage);
        assert_eq!(settings.crit_threshold, 20);
        assert_eq!(settings.window, CurveWindow::default());
    }

    #[test]
    fn test_limits() {
        let limits = Limits::default();
        assert!(limits.check(&parser::parse("10d6 + 4").unwrap()).is_ok());
        assert!(matches!(
            limits.check(&parser::parse("1d5000").unwrap()),
            Err(Error::ComputationOverflow {
                what: "die faces",
                ..
            })
        ));
        assert!(matches!(
            limits.check(&parser::parse("101d4").unwrap()),
            Err(Error::ComputationOverflow {
                what: "dice count",
                ..
            })
        ));
        assert!(matches!(
            limits.check(&parser::parse("20d1000").unwrap()),
            Err(Error::ComputationOverflow {
                what: "support size",
                ..
            })
        ));
        assert!(matches!(
            limits.check(&parser::parse("10d1000").unwrap()),
            Err(Error::ComputationOverflow {
                what: "estimated work",
                ..
            })
        ));
    }

    #[test]
    fn test_estimated_work() {
        assert_eq!(estimated_work(&parser::parse("5").unwrap()), 0);
        // 1 * 6, then 6 * 6.
        assert_eq!(estimated_work(&parser::parse("2d6").unwrap()), 42);
        assert_eq!(estimated_work(&parser::parse("d6 - d4").unwrap()), 30);
    }

    #[test]
    fn test_largest_default_damage_is_fast() {
        use crate::damage::damage_distributions;
        use std::time::{Duration, Instant};

        // Doubled on a crit to 6d1000, just under the work bound.
        let config = DamageConfig::parse("3d1000").unwrap().with_reroll_low(true);
        let start = Instant::now();
        let damage = damage_distributions(&config).unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(damage.critical.max(), Some(6000));

        let config = DamageConfig::parse("5d999").unwrap();
        assert!(matches!(
            damage_distributions(&config),
            Err(Error::ComputationOverflow {
                what: "estimated work",
                ..
            })
        ));
    }
}
