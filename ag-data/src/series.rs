use crate::{
    observation::Observation,
    trend::{linear_regression, mean, TrendLine},
};
use ag_table::{AgeGradeTable, Gender};
use ag_utils::dates::{age_on, date_ordinal};
use chrono::NaiveDate;
use log::{debug, warn};

/// Relative distance tolerance under which two same-day results are the same race.
pub const DEDUP_EPSILON: f64 = 0.1;

/// Where a series is in its finalize pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesState {
    Empty,
    Collecting,
    Deduplicated,
    Graded,
    Summarized,
}

/// Identity of the runner a series belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runner {
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
}

impl Runner {
    pub fn new(name: &str, gender: Gender, date_of_birth: NaiveDate) -> Self {
        Runner {
            name: name.to_string(),
            gender,
            date_of_birth,
        }
    }

    /// Integer age on `date`.
    pub fn age_on(&self, date: &NaiveDate) -> i32 {
        age_on(&self.date_of_birth, date)
    }
}

/// Every result collected for one runner, from every source.
#[derive(Debug, Clone)]
pub struct RunnerSeries {
    runner: Runner,
    observations: Vec<Observation>,
    state: SeriesState,
}

/// Two results are the same race when run the same day at distances within
/// `DEDUP_EPSILON` of each other, relative to the earlier (shorter) one.
fn is_same_race(previous: &Observation, next: &Observation) -> bool {
    if previous.date != next.date {
        return false;
    }
    if previous.distance_meters <= 0.0 {
        return previous.distance_meters == next.distance_meters;
    }
    ((previous.distance_meters - next.distance_meters) / previous.distance_meters).abs()
        <= DEDUP_EPSILON
}

/// The lowest priority value in a cluster; the first one seen on ties.
fn most_trusted(cluster: Vec<Observation>) -> Option<Observation> {
    cluster.into_iter().min_by_key(|obs| obs.priority)
}

impl RunnerSeries {
    pub fn new(runner: Runner) -> Self {
        RunnerSeries {
            runner,
            observations: Vec::new(),
            state: SeriesState::Empty,
        }
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn state(&self) -> SeriesState {
        self.state
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Add a result. Results without a positive time are ignored; sources are
    /// expected to drop them before they get here.
    pub fn add_stat(&mut self, observation: Observation) {
        if observation.time_seconds.is_nan() || observation.time_seconds <= 0.0 {
            debug!(
                "{}: ignoring result without a time: {}",
                self.runner.name, observation
            );
            return;
        }
        self.observations.push(observation);
        self.state = SeriesState::Collecting;
    }

    /// Remove same-race duplicates, keeping the most trusted source.
    ///
    /// Results are sorted by (date, distance). Consecutive results on the same
    /// date whose distances are within `DEDUP_EPSILON` of the previous one form
    /// a cluster, so a chain of close distances merges even if its ends are
    /// further apart. Each cluster keeps its lowest priority value.
    ///
    /// Returns the number of results removed.
    pub fn deduplicate(&mut self) -> usize {
        let before = self.observations.len();
        if before == 0 {
            return 0;
        }

        let mut sorted = std::mem::take(&mut self.observations);
        sorted.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.distance_meters.total_cmp(&b.distance_meters))
        });

        let mut deduped: Vec<Observation> = Vec::with_capacity(before);
        let mut cluster: Vec<Observation> = Vec::new();
        for obs in sorted {
            let same_race = cluster
                .last()
                .is_some_and(|previous| is_same_race(previous, &obs));
            if !same_race {
                deduped.extend(most_trusted(std::mem::take(&mut cluster)));
            }
            cluster.push(obs);
        }
        deduped.extend(most_trusted(cluster));

        let removed = before - deduped.len();
        if removed > 0 {
            debug!(
                "{} duplicate points removed, runner {}",
                removed, self.runner.name
            );
        }
        self.observations = deduped;
        self.state = SeriesState::Deduplicated;
        removed
    }

    /// Age grade every result against `table`.
    ///
    /// Age is the runner's integer age on race day. Results the table cannot
    /// grade (age or distance outside the table) are dropped with a warning so
    /// one bad record does not spoil the series. Returns the number dropped.
    pub fn crunch(&mut self, table: &AgeGradeTable) -> usize {
        let runner = &self.runner;
        let before = self.observations.len();
        self.observations.retain_mut(|obs| {
            let age = runner.age_on(&obs.date);
            match table.age_grade(age, runner.gender, obs.distance_miles(), obs.time_seconds) {
                Ok(result) => {
                    obs.age_grade_percent = Some(result.percent);
                    true
                }
                Err(e) => {
                    warn!("{}: cannot age grade {}: {}", runner.name, obs, e);
                    false
                }
            }
        });
        if !self.observations.is_empty() {
            self.state = SeriesState::Graded;
        }
        before - self.observations.len()
    }

    /// Keep only the results matching `predicate`. Returns the number removed.
    pub fn filter<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Observation) -> bool,
    {
        let before = self.observations.len();
        self.observations.retain(|obs| predicate(obs));
        before - self.observations.len()
    }

    /// Remove one result equal to `observation`. Missing results are logged,
    /// not an error. Returns whether anything was removed.
    pub fn del_stat(&mut self, observation: &Observation) -> bool {
        match self.observations.iter().position(|obs| obs == observation) {
            Some(index) => {
                self.observations.remove(index);
                true
            }
            None => {
                warn!(
                    "del_stat: {} has no result {}",
                    self.runner.name, observation
                );
                false
            }
        }
    }

    /// Graded results whose distance lies in `[min_meters, max_meters]`.
    pub fn in_distance_range(&self, min_meters: f64, max_meters: f64) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|obs| obs.distance_meters >= min_meters && obs.distance_meters <= max_meters)
            .collect()
    }

    /// Results run in calendar `year`.
    pub fn in_year(&self, year: i32) -> Vec<&Observation> {
        use chrono::Datelike;
        self.observations
            .iter()
            .filter(|obs| obs.date.year() == year)
            .collect()
    }

    fn subset<'a>(&'a self, subset: Option<&[&'a Observation]>) -> Vec<&'a Observation> {
        match subset {
            Some(observations) => observations.to_vec(),
            None => self.observations.iter().collect(),
        }
    }

    /// Least-squares trend of age grade against date (percent per day) over
    /// `subset`, or the whole series. `None` until there are two graded
    /// results on different dates.
    pub fn trend(&self, subset: Option<&[&Observation]>) -> Option<TrendLine> {
        let points: Vec<(f64, f64)> = self
            .subset(subset)
            .iter()
            .filter_map(|obs| {
                obs.age_grade_percent
                    .map(|ag| (date_ordinal(&obs.date), ag))
            })
            .collect();
        linear_regression(&points)
    }

    /// Mean age grade over `subset`, or the whole series. NaN when empty.
    pub fn mean_age_grade(&self, subset: Option<&[&Observation]>) -> f64 {
        let grades: Vec<f64> = self
            .subset(subset)
            .iter()
            .filter_map(|obs| obs.age_grade_percent)
            .collect();
        mean(&grades)
    }

    pub(crate) fn mark_summarized(&mut self) {
        if self.state == SeriesState::Graded {
            self.state = SeriesState::Summarized;
        }
    }
}
