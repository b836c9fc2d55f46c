//! Per-runner summary and detail records.

use crate::{
    buckets::{DistanceBucket, OVERALL, TREND_BUCKETS},
    observation::Observation,
    series::{Runner, RunnerSeries},
    trend::mean,
};
use ag_table::Gender;
use ag_utils::{
    dates::format_date,
    distance::meters_to_miles,
    times::render_time,
};
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, fmt};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryOptions {
    /// Fewest results in a bucket before a trend is reported for it.
    pub min_trend: usize,
    /// Year the "one year" average and the runner's age refer to.
    pub reference_year: i32,
    /// First year counted in `races_by_year`; the runner's first result year
    /// when unset.
    pub first_year: Option<i32>,
}

/// Races per calendar year, every year of the range present. Written to CSV
/// as `2019:4;2020:0;2021:6`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RacesByYear(pub BTreeMap<i32, usize>);

impl RacesByYear {
    pub fn count(&self, year: i32) -> Option<usize> {
        self.0.get(&year).copied()
    }

    fn tally(observations: &[&Observation], first_year: i32, last_year: i32) -> Self {
        let mut counts: BTreeMap<i32, usize> =
            (first_year..=last_year).map(|year| (year, 0)).collect();
        for obs in observations {
            if let Some(count) = counts.get_mut(&obs.date.year()) {
                *count += 1;
            }
        }
        RacesByYear(counts)
    }
}

impl fmt::Display for RacesByYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (year, count)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}:{}", year, count)?;
        }
        Ok(())
    }
}

impl Serialize for RacesByYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One runner, one distance bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub bucket: String,
    pub race_count: usize,
    pub age_grade_mean: f64,
    pub one_year_age_grade: Option<f64>,
    pub trend_slope: Option<f64>,
    pub trend_stderr: Option<f64>,
    pub r_squared: Option<f64>,
    pub p_value: Option<f64>,
    /// Filled on the `overall` row only.
    pub races_by_year: RacesByYear,
}

/// One graded result, flattened for the detail report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub name: String,
    pub dob: String,
    pub gender: Gender,
    pub race: String,
    pub date: String,
    pub loc: String,
    pub dist: f64,
    pub time: f64,
    pub ag: Option<f64>,
    pub source: String,
    pub fuzzyage: String,
    pub distmiles: f64,
    pub distkm: f64,
    pub rendertime: String,
}

/// "pat q. runner" -> "Pat Q. Runner"
pub fn display_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

impl DetailRow {
    pub fn from_observation(runner: &Runner, observation: &Observation) -> Self {
        DetailRow {
            name: display_name(&runner.name),
            dob: format_date(&runner.date_of_birth),
            gender: runner.gender,
            race: observation.race_name.clone(),
            date: format_date(&observation.date),
            loc: observation.location.clone(),
            dist: observation.distance_meters,
            time: observation.time_seconds,
            ag: observation.age_grade_percent,
            source: observation.source.to_string(),
            fuzzyage: if observation.fuzzy_age { "Y" } else { "" }.to_string(),
            distmiles: meters_to_miles(observation.distance_meters),
            distkm: observation.distance_meters / 1000.0,
            rendertime: render_time(observation.time_seconds),
        }
    }
}

/// Detail rows for every result in the series.
pub fn detail_rows(series: &RunnerSeries) -> Vec<DetailRow> {
    series
        .observations()
        .iter()
        .map(|obs| DetailRow::from_observation(series.runner(), obs))
        .collect()
}

fn summarize_bucket(
    series: &RunnerSeries,
    bucket: &str,
    observations: &[&Observation],
    age: i32,
    options: &SummaryOptions,
) -> SummaryRow {
    let one_year: Vec<f64> = observations
        .iter()
        .filter(|obs| obs.date.year() == options.reference_year)
        .filter_map(|obs| obs.age_grade_percent)
        .collect();
    let trend = if observations.len() >= options.min_trend {
        series.trend(Some(observations))
    } else {
        None
    };

    SummaryRow {
        name: display_name(&series.runner().name),
        age,
        gender: series.runner().gender,
        bucket: bucket.to_string(),
        race_count: observations.len(),
        age_grade_mean: series.mean_age_grade(Some(observations)),
        one_year_age_grade: (!one_year.is_empty()).then(|| mean(&one_year)),
        trend_slope: trend.map(|t| t.slope),
        trend_stderr: trend.map(|t| t.standard_error),
        r_squared: trend.map(|t| t.r_squared()),
        p_value: trend.map(|t| t.p_value),
        races_by_year: RacesByYear::default(),
    }
}

/// Summarize a graded series: an `overall` row carrying the per-year race
/// counts, then one row for each distance bucket holding at least `min_trend`
/// results.
pub fn summarize(series: &mut RunnerSeries, options: &SummaryOptions) -> Vec<SummaryRow> {
    let age = match NaiveDate::from_ymd_opt(options.reference_year, 1, 1) {
        Some(jan1) => series.runner().age_on(&jan1),
        None => 0,
    };

    let mut rows = Vec::with_capacity(TREND_BUCKETS.len() + 1);
    let all: Vec<&Observation> = series.observations().iter().collect();
    let mut overall = summarize_bucket(series, OVERALL, &all, age, options);
    let first_year = options
        .first_year
        .or_else(|| all.iter().map(|obs| obs.date.year()).min());
    if let Some(first_year) = first_year {
        overall.races_by_year = RacesByYear::tally(&all, first_year, options.reference_year);
    }
    rows.push(overall);

    for DistanceBucket {
        label,
        min_meters,
        max_meters,
    } in TREND_BUCKETS
    {
        let in_bucket = series.in_distance_range(min_meters, max_meters);
        if in_bucket.len() < options.min_trend {
            continue;
        }
        rows.push(summarize_bucket(series, label, &in_bucket, age, options));
    }

    series.mark_summarized();
    rows
}
