// ABOUTME: Command-line interface for the boblin attack roll calculator.
// ABOUTME: Prints exact to-hit, damage and expected damage tables, or simulates attacks.

use boblin::{
    AdvantageMode, Calculation, Distribution, Report, Setting, SettingKey, Settings, SimResult,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "boblin")]
#[command(about = "Exact hit, crit and damage odds for d20 attack rolls")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the distribution of a dice expression
    Parse {
        /// Dice expression (e.g., "2d6 + 3", "1d8 - d4")
        expression: String,

        /// Reroll 1s and 2s once
        #[arg(long)]
        reroll_low: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective d20 roll
    D20 {
        /// Roll type: normal, advantage, disadvantage, super (or -1..2)
        #[arg(short, long, default_value = "normal", allow_hyphen_values = true)]
        mode: AdvantageMode,

        /// Reroll natural 1s once
        #[arg(long)]
        luck: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute to-hit, damage and expected damage for an attack
    Attack {
        #[command(flatten)]
        calc: CalcArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Simulate attacks to check the exact numbers
    Sim {
        #[command(flatten)]
        calc: CalcArgs,

        /// Number of trials to run
        #[arg(short, long, default_value = "10000")]
        n: usize,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the calculation settings and their current values
    Settings {
        #[command(flatten)]
        calc: CalcArgs,
    },
}

#[derive(Args)]
struct CalcArgs {
    /// To-hit modifier, without the d20 (e.g., "1d4 + 7")
    #[arg(short, long, allow_hyphen_values = true)]
    to_hit: Option<String>,

    /// Damage roll (e.g., "2d6 + 4")
    #[arg(short, long, allow_hyphen_values = true)]
    damage: Option<String>,

    /// Roll type: normal, advantage, disadvantage, super (or -1..2)
    #[arg(short, long, allow_hyphen_values = true)]
    mode: Option<String>,

    /// Lowest natural roll that crits
    #[arg(short, long)]
    crit: Option<String>,

    /// Reroll natural 1s on the d20 (--luck=false turns it off)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    luck: Option<bool>,

    /// Reroll 1s and 2s on damage dice (--reroll-low=false turns it off)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    reroll_low: Option<bool>,

    /// JSON settings file; flags given here override it
    #[arg(long)]
    config: Option<PathBuf>,
}

impl CalcArgs {
    fn settings(&self) -> Result<Settings, Box<dyn std::error::Error>> {
        let mut settings = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let settings: Settings = serde_json::from_str(&text)?;
                debug!(path = %path.display(), "loaded settings");
                settings
            }
            None => Settings::default(),
        };

        let texts = [
            (SettingKey::ToHitRoll, &self.to_hit),
            (SettingKey::DamageRoll, &self.damage),
            (SettingKey::Advantage, &self.mode),
            (SettingKey::CritThreshold, &self.crit),
        ];
        for (key, text) in texts {
            if let Some(text) = text {
                settings.set(key, text)?;
            }
        }
        if let Some(on) = self.luck {
            settings.apply(Setting::Luck(on))?;
        }
        if let Some(on) = self.reroll_low {
            settings.apply(Setting::RerollLow(on))?;
        }
        Ok(settings)
    }

    fn calculation(&self) -> Result<Calculation, Box<dyn std::error::Error>> {
        Ok(self.settings()?.build()?)
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boblin=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Parse {
            expression,
            reroll_low,
            json,
        } => {
            let expr = boblin::parse(&expression)?;
            boblin::Limits::default().check(&expr)?;
            let dist = expr.distribution_with(|sides| {
                boblin::damage::die_distribution(sides, reroll_low)
            });
            if json {
                print_json(&serde_json::json!({
                    "expression": expr,
                    "distribution": dist,
                    "mean": dist.mean(),
                    "std_dev": dist.std_dev(),
                }))?;
            } else {
                println!("{}", expr);
                println!();
                print_histogram(&dist);
                println!();
                println!("mean: {:.2}, std: {:.2}", dist.mean(), dist.std_dev());
            }
        }
        Commands::D20 { mode, luck, json } => {
            let dist = boblin::d20_distribution(mode, luck);
            if json {
                print_json(&dist)?;
            } else {
                let luck = if luck { ", luck" } else { "" };
                println!("{}{}", mode, luck);
                println!();
                print_histogram(&dist);
                println!();
                println!("mean: {:.2}", dist.mean());
            }
        }
        Commands::Attack { calc, json } => {
            let report = calc.calculation()?.report()?;
            if json {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
        }
        Commands::Sim {
            calc,
            n,
            seed,
            json,
        } => {
            let calculation = calc.calculation()?;
            let result = match seed {
                Some(seed) => boblin::simulate_seeded(&calculation, n, seed)?,
                None => boblin::simulate(&calculation, n)?,
            };
            if json {
                print_sim_json(&result)?;
            } else {
                print_sim_histogram(&calculation, &result);
            }
        }
        Commands::Settings { calc } => {
            let settings = calc.settings()?;
            for key in SettingKey::ALL {
                println!("{:>10}: {}", key.short_name(), settings.display_value(key));
                println!("            {}: {}", key.display_name(), key.description());
            }
        }
    }
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn bar(p: f64, max: f64) -> String {
    let max_bar_width = 40;
    let width = if max > 0.0 {
        (p / max * max_bar_width as f64) as usize
    } else {
        0
    };
    "█".repeat(width)
}

fn print_histogram(dist: &Distribution) {
    let max = dist.iter().map(|(_, p)| p).fold(0.0, f64::max);
    for (value, p) in dist.iter() {
        println!("{:>8}: {:40} {:5.1}%", value, bar(p, max), p * 100.0);
    }
}

fn print_reverse_cdf(dist: &Distribution) {
    for (value, p) in dist.survival() {
        println!("{:>8}: {:40} {:5.1}%", value, bar(p, 1.0), p * 100.0);
    }
}

fn print_report(report: &Report) {
    let attack = &report.attack;
    println!(
        "d20 ({}{}) + {}, crit on {}+",
        attack.advantage(),
        if attack.luck() { ", luck" } else { "" },
        attack.to_hit(),
        attack.crit_threshold()
    );
    println!();
    println!("To hit (chance of rolling at least):");
    let series = report.to_hit.series();
    let max = series.iter().map(|(_, p, _)| *p).fold(0.0, f64::max);
    for (outcome, p, at_least) in series {
        println!(
            "{:>8}: {:40} {:5.1}%  {:5.1}%",
            outcome.to_string(),
            bar(p, max),
            p * 100.0,
            at_least * 100.0
        );
    }

    let Some(damage) = &report.damage else {
        return;
    };

    println!();
    println!(
        "Damage {}{} (at least):",
        damage.config.damage(),
        if damage.config.reroll_low() {
            ", reroll low"
        } else {
            ""
        }
    );
    print_reverse_cdf(&damage.distributions.normal);
    println!();
    println!("Critical damage (at least):");
    print_reverse_cdf(&damage.distributions.critical);
    println!();
    println!(
        "mean damage: {:.2}, mean critical damage: {:.2}",
        damage.normal_mean, damage.critical_mean
    );
    println!();
    println!("Expected damage per attack by defense:");
    let max = damage.expected_damage.values().copied().fold(0.0, f64::max);
    for (defense, expected) in &damage.expected_damage {
        println!("{:>8}: {:40} {:6.2}", defense, bar(*expected, max), expected);
    }
}

fn print_sim_json(result: &SimResult) -> Result<(), serde_json::Error> {
    use serde_json::json;

    let to_hit = result.to_hit();
    let output = json!({
        "n": result.n,
        "crit_miss": to_hit.crit_miss,
        "crit_hit": to_hit.crit_hit,
        "band": to_hit.band,
        "normal_damage": result.normal_damage(),
        "critical_damage": result.critical_damage(),
    });

    print_json(&output)
}

fn print_sim_histogram(calculation: &Calculation, result: &SimResult) {
    println!("d20 + {} (n={})", calculation.attack.to_hit(), result.n);
    println!();

    let totals = result.sorted_totals();
    let max_count = totals.iter().map(|(_, c)| *c).max().unwrap_or(1);
    let n = result.n.max(1) as f64;

    let pct = |count: usize| count as f64 / n * 100.0;
    let line = |label: String, count: usize| {
        println!(
            "{:>8}: {:40} {:5.1}%",
            label,
            bar(count as f64, max_count as f64),
            pct(count)
        );
    };

    line("CritMiss".to_string(), result.crit_miss);
    for (value, count) in totals {
        line(value.to_string(), count);
    }
    line("CritHit".to_string(), result.crit_hit);

    if calculation.damage.is_some() {
        println!();
        println!(
            "mean damage: {:.2}, mean critical damage: {:.2}",
            result.normal_damage().mean(),
            result.critical_damage().mean()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(args: &[&str]) -> Settings {
        let cli = Cli::try_parse_from(["boblin", "settings"].iter().chain(args).copied()).unwrap();
        match cli.command {
            Commands::Settings { calc } => calc.settings().unwrap(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_bare_flags_turn_on() {
        let enabled = settings(&["--luck", "--reroll-low"]);
        assert!(enabled.luck);
        assert!(enabled.reroll_low);

        let defaults = settings(&[]);
        assert!(!defaults.luck);
        assert!(!defaults.reroll_low);
    }

    #[test]
    fn test_flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("boblin-cli-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"to_hit_roll": "1d4 + 5", "luck": true, "reroll_low": true}"#,
        )
        .unwrap();
        let config = path.to_str().unwrap();

        let kept = settings(&["--config", config]);
        assert!(kept.luck);
        assert!(kept.reroll_low);
        assert_eq!(kept.to_hit_roll, "1d4 + 5");

        let overridden = settings(&[
            "--config",
            config,
            "--luck=false",
            "--reroll-low=false",
            "--to-hit",
            "3",
        ]);
        assert!(!overridden.luck);
        assert!(!overridden.reroll_low);
        assert_eq!(overridden.to_hit_roll, "3");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_luck_rejects_non_bool() {
        assert!(Cli::try_parse_from(["boblin", "settings", "--luck=maybe"]).is_err());
    }
}
