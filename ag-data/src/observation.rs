use ag_utils::distance::meters_to_miles;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a result came from. Each source carries a default deduplication
/// priority; lower wins when the same race shows up in several sources.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Club,
    UltraSignup,
    Athlinks,
    RunningAhead,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::Club,
        Source::UltraSignup,
        Source::Athlinks,
        Source::RunningAhead,
    ];

    /// Club results are the most trusted, RunningAHEAD logs the least.
    pub fn priority(&self) -> u32 {
        match self {
            Source::Club => 1,
            Source::UltraSignup => 2,
            Source::Athlinks => 3,
            Source::RunningAhead => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Club => "club",
            Source::UltraSignup => "ultrasignup",
            Source::Athlinks => "athlinks",
            Source::RunningAhead => "runningahead",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One race result in a runner's series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub distance_meters: f64,
    pub time_seconds: f64,
    /// Filled in by [`crate::series::RunnerSeries::crunch`].
    pub age_grade_percent: Option<f64>,
    pub race_name: String,
    pub location: String,
    pub source: Source,
    /// Age was inferred from an age group rather than known exactly.
    pub fuzzy_age: bool,
    /// Lower is more trusted.
    pub priority: u32,
}

impl Observation {
    pub fn new(date: NaiveDate, distance_meters: f64, time_seconds: f64, source: Source) -> Self {
        Observation {
            date,
            distance_meters,
            time_seconds,
            age_grade_percent: None,
            race_name: String::new(),
            location: String::new(),
            source,
            fuzzy_age: false,
            priority: source.priority(),
        }
    }

    pub fn with_race(mut self, race_name: &str) -> Self {
        self.race_name = race_name.to_string();
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }

    pub fn with_fuzzy_age(mut self, fuzzy_age: bool) -> Self {
        self.fuzzy_age = fuzzy_age;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn distance_miles(&self) -> f64 {
        meters_to_miles(self.distance_meters)
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} meters {} secs",
            self.date, self.distance_meters, self.time_seconds
        )?;
        if let Some(ag) = self.age_grade_percent {
            write!(f, ", age grade {:.1}", ag)?;
        }
        if !self.race_name.is_empty() {
            write!(f, ", {}", self.race_name)?;
        }
        write!(f, " ({})", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_priorities_order() {
        let priorities: Vec<u32> = Source::ALL.iter().map(Source::priority).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_new_takes_source_priority() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 3).unwrap();
        let obs = Observation::new(date, 5000.0, 1200.0, Source::Athlinks);
        assert_eq!(obs.priority, 3);
        assert_eq!(obs.with_priority(7).priority, 7);
    }

    #[test]
    fn test_display() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 3).unwrap();
        let obs = Observation::new(date, 5000.0, 1200.0, Source::Club).with_race("Turkey Trot");
        assert_eq!(obs.to_string(), "2020-05-03 5000 meters 1200 secs, Turkey Trot (club)");
    }
}
