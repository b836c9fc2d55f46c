//! Command implementations for the age-grade CLI.
//!
//! Provides subcommands for building the age-grade table cache, grading a
//! single result and analyzing club results across sources.

use ag_utils::dates::parse_date;
use chrono::NaiveDate;
use clap::Subcommand;
use log::info;
use std::path::PathBuf;

pub mod analyze;
pub mod grade;
pub mod report;
pub mod sources;
pub mod table;

use analyze::{AnalyzeConfig, AnalyzeFiles};

const DEFAULT_CACHE: &str = "agegrade-table.json.gz";

fn date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the age-grade table from the Men and Women sheets and cache it
    Table {
        /// Men's sheet exported as CSV
        #[arg(long)]
        men: PathBuf,

        /// Women's sheet exported as CSV
        #[arg(long)]
        women: PathBuf,

        /// Table cache to write
        #[arg(long, env = "AGEGRADE_CACHE", default_value = DEFAULT_CACHE)]
        cache: PathBuf,
    },

    /// Validate a table cache built elsewhere and install it
    InstallCache {
        /// Cache file to install
        #[arg(long)]
        from: PathBuf,

        /// Where to install it
        #[arg(long, env = "AGEGRADE_CACHE", default_value = DEFAULT_CACHE)]
        cache: PathBuf,
    },

    /// Age grade a single result
    Grade {
        /// Age on race day
        #[arg(long, allow_negative_numbers = true)]
        age: i32,

        /// M or F
        #[arg(long)]
        gender: String,

        /// Race distance in miles
        #[arg(long)]
        miles: f64,

        /// Finish time, [[h:]m:]s
        #[arg(long)]
        time: String,

        #[arg(long, env = "AGEGRADE_CACHE", default_value = DEFAULT_CACHE)]
        cache: PathBuf,
    },

    /// Analyze age-graded results per runner and write summary and detail reports
    Analyze {
        /// Club results CSV
        #[arg(short = 'c', long)]
        club: Option<PathBuf>,

        /// Athlinks results CSV
        #[arg(short = 'a', long)]
        athlinks: Option<PathBuf>,

        /// UltraSignup results CSV
        #[arg(short = 'u', long)]
        ultrasignup: Option<PathBuf>,

        /// RunningAHEAD results CSV
        #[arg(short = 'r', long)]
        runningahead: Option<PathBuf>,

        /// Summary report to write
        #[arg(long)]
        summary: PathBuf,

        /// Detail report to write
        #[arg(long)]
        detail: PathBuf,

        /// Drop results graded below this percentage
        #[arg(long, default_value_t = 25.0)]
        min_age_grade: f64,

        /// Minimum races in the last year to be summarized
        #[arg(long, default_value_t = 3)]
        min_races: usize,

        /// Minimum races for a trend line
        #[arg(long, default_value_t = 5)]
        min_trend: usize,

        /// Ignore results before this date
        #[arg(short = 'b', long, value_parser = date_arg)]
        begin: Option<NaiveDate>,

        /// Ignore results after this date
        #[arg(short = 'e', long, value_parser = date_arg)]
        end: Option<NaiveDate>,

        #[arg(long, env = "AGEGRADE_CACHE", default_value = DEFAULT_CACHE)]
        cache: PathBuf,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Table { men, women, cache } => {
            table::run_table(&men, &women, &cache)?;
            info!("table cache written to {}", cache.display());
            Ok(())
        }
        Command::InstallCache { from, cache } => {
            table::run_install_cache(&from, &cache)?;
            Ok(())
        }
        Command::Grade {
            age,
            gender,
            miles,
            time,
            cache,
        } => {
            let table = table::load_table(&cache)?;
            let (_, line) = grade::run_grade(&table, age, &gender, miles, &time)?;
            println!("{}", line);
            Ok(())
        }
        Command::Analyze {
            club,
            athlinks,
            ultrasignup,
            runningahead,
            summary,
            detail,
            min_age_grade,
            min_races,
            min_trend,
            begin,
            end,
            cache,
        } => {
            let table = table::load_table(&cache)?;
            let files = AnalyzeFiles {
                club,
                athlinks,
                ultrasignup,
                runningahead,
                summary,
                detail,
            };
            let config = AnalyzeConfig {
                min_age_grade,
                min_races,
                min_trend,
                begin,
                end,
                ..AnalyzeConfig::default()
            };
            analyze::run_analyze(&table, &files, config)?;
            Ok(())
        }
    }
}
