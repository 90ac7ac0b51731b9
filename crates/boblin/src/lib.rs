// ABOUTME: Core library for exact d20 attack roll probabilities.
// ABOUTME: Parses dice notation and computes to-hit, critical, damage and expected damage distributions.

//! # Boblin
//!
//! Exact probability distributions for tabletop d20 attack rolls.
//!
//! ## Quick Start
//!
//! ```
//! use boblin::{AdvantageMode, AttackConfig, CurveWindow, DamageConfig};
//!
//! let attack = AttackConfig::parse("1d4 + 5")
//!     .unwrap()
//!     .with_advantage(AdvantageMode::Advantage);
//! let damage = DamageConfig::parse("2d6 + 3").unwrap();
//!
//! let to_hit = boblin::to_hit_distribution(&attack).unwrap();
//! println!("crit chance: {:.4}", to_hit.crit_hit);
//!
//! let curve = boblin::expected_damage_vs_defense(&attack, &damage, &CurveWindow::default())
//!     .unwrap();
//! println!("expected damage against defense 15: {:.2}", curve[&15]);
//! ```
//!
//! ## Supported Notation
//!
//! - Dice: `1d20`, `d8`, `2d6`
//! - Flat modifiers: `5`, `-2`
//! - Sums and differences: `2d6 + 1d4 - 2`, `-1d4 + 3`

pub mod ast;
pub mod attack;
pub mod config;
pub mod curve;
pub mod d20;
pub mod damage;
pub mod dist;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod report;
pub mod roller;
pub mod sim;

pub use ast::ParsedExpression;
pub use attack::{to_hit_distribution, AttackConfig, RollOutcome, ToHit};
pub use config::{CurveWindow, Limits, Setting, SettingKey, SettingKind, Settings};
pub use curve::expected_damage_vs_defense;
pub use d20::{d20_distribution, AdvantageMode};
pub use damage::{damage_distributions, DamageConfig, DamageDistributions};
pub use dist::Distribution;
pub use error::{Error, ErrorKind, Result};
pub use report::{Calculation, DamageReport, Report};
pub use roller::{roll_attack, AttackRoll, FastRng, Rng};
pub use sim::{simulate, simulate_seeded, SimResult};

/// Parse a dice expression into its dice and flat modifier.
///
/// # Examples
///
/// ```
/// let expr = boblin::parse("2d6 - d4 + 3").unwrap();
/// assert_eq!(expr.dice(), &[6, 6, -4]);
/// assert_eq!(expr.modifier(), 3);
/// ```
pub fn parse(input: &str) -> Result<ParsedExpression> {
    parser::parse(input)
}

/// Parse a dice expression and return the distribution of its total.
///
/// # Examples
///
/// ```
/// let dist = boblin::distribution("2d6").unwrap();
/// assert!((dist.get(7) - 6.0 / 36.0).abs() < 1e-9);
/// ```
pub fn distribution(input: &str) -> Result<Distribution> {
    let expr = parser::parse(input)?;
    Limits::default().check(&expr)?;
    Ok(expr.distribution())
}
