//! Club age-grade analysis across result sources.

use crate::{
    report::{write_detail, write_summary},
    sources::{ResultFile, ResultRecord},
};
use ag_data::{
    detail_rows, summarize, DetailRow, Observation, Runner, RunnerSeries, Source,
    SummaryOptions, SummaryRow,
};
use ag_table::AgeGradeTable;
use anyhow::bail;
use chrono::{Datelike, Local, NaiveDate};
use log::{debug, info};
use std::{collections::BTreeMap, path::PathBuf};

/// Thresholds for which runners and results make it into the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeConfig {
    /// Results graded below this are dropped before summarizing.
    pub min_age_grade: f64,
    /// Fewest results in the last year for a runner to be summarized.
    pub min_races: usize,
    /// Fewest results in a bucket for a trend line.
    pub min_trend: usize,
    /// Runners younger than this on January 1 of the last year are skipped.
    pub min_runner_age: i32,
    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        AnalyzeConfig {
            min_age_grade: 25.0,
            min_races: 3,
            min_trend: 5,
            min_runner_age: 14,
            begin: None,
            end: None,
        }
    }
}

impl AnalyzeConfig {
    /// The year "last year" statistics refer to: the end date's year, or the
    /// current year when the range is open.
    pub fn last_year(&self) -> i32 {
        self.end
            .map(|end| end.year())
            .unwrap_or_else(|| Local::now().year())
    }

    fn in_range(&self, date: &NaiveDate) -> bool {
        self.begin.map_or(true, |begin| *date >= begin) && self.end.map_or(true, |end| *date <= end)
    }
}

#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub details: Vec<DetailRow>,
    pub summaries: Vec<SummaryRow>,
    pub runners_summarized: usize,
}

/// Collects results by runner, then grades and summarizes each runner.
pub struct Analyzer<'t> {
    table: &'t AgeGradeTable,
    config: AnalyzeConfig,
    runners: BTreeMap<String, RunnerSeries>,
}

impl<'t> Analyzer<'t> {
    pub fn new(table: &'t AgeGradeTable, config: AnalyzeConfig) -> Self {
        Analyzer {
            table,
            config,
            runners: BTreeMap::new(),
        }
    }

    pub fn runner_count(&self) -> usize {
        self.runners.len()
    }

    /// Add one result. The first record seen for a runner fixes their gender
    /// and date of birth. Returns whether the result was kept.
    pub fn add_record(&mut self, record: &ResultRecord) -> bool {
        if !self.config.in_range(&record.date) {
            return false;
        }
        let series = self
            .runners
            .entry(record.runner_key())
            .or_insert_with(|| {
                RunnerSeries::new(Runner::new(&record.runner_key(), record.gender, record.dob))
            });
        series.add_stat(record.to_observation());
        true
    }

    /// Add every result from `records`. Returns the number kept.
    pub fn collect<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = ResultRecord>,
    {
        records
            .into_iter()
            .filter(|record| self.add_record(record))
            .count()
    }

    fn analyze_runner(&self, series: &mut RunnerSeries, report: &mut AnalysisReport) {
        let config = &self.config;
        let last_year = config.last_year();

        series.deduplicate();
        series.crunch(self.table);
        report.details.extend(detail_rows(series));

        let age = NaiveDate::from_ymd_opt(last_year, 1, 1)
            .map(|jan1| series.runner().age_on(&jan1))
            .unwrap_or_default();
        if age < config.min_runner_age {
            debug!("{}: age {} too young to summarize", series.runner().name, age);
            return;
        }

        let min_age_grade = config.min_age_grade;
        series.filter(|obs: &Observation| {
            obs.age_grade_percent
                .is_some_and(|percent| percent >= min_age_grade)
        });
        let races_last_year = series.in_year(last_year).len();
        if races_last_year < config.min_races {
            debug!(
                "{}: {} races in {}, need {}",
                series.runner().name,
                races_last_year,
                last_year,
                config.min_races
            );
            return;
        }

        let options = SummaryOptions {
            min_trend: config.min_trend,
            reference_year: last_year,
            first_year: config.begin.map(|begin| begin.year()),
        };
        report.summaries.extend(summarize(series, &options));
        report.runners_summarized += 1;
    }

    /// Grade every runner and build the report, runners in name order.
    pub fn finish(mut self) -> AnalysisReport {
        let mut report = AnalysisReport::default();
        let mut runners = std::mem::take(&mut self.runners);
        for series in runners.values_mut() {
            self.analyze_runner(series, &mut report);
        }
        info!(
            "{} of {} runners summarized, {} graded results",
            report.runners_summarized,
            runners.len(),
            report.details.len()
        );
        report
    }
}

/// Input files per source, with output paths.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeFiles {
    pub club: Option<PathBuf>,
    pub athlinks: Option<PathBuf>,
    pub ultrasignup: Option<PathBuf>,
    pub runningahead: Option<PathBuf>,
    pub summary: PathBuf,
    pub detail: PathBuf,
}

impl AnalyzeFiles {
    fn sources(&self) -> Vec<(Source, &PathBuf)> {
        [
            (Source::Club, &self.club),
            (Source::Athlinks, &self.athlinks),
            (Source::UltraSignup, &self.ultrasignup),
            (Source::RunningAhead, &self.runningahead),
        ]
        .into_iter()
        .filter_map(|(source, path)| path.as_ref().map(|path| (source, path)))
        .collect()
    }
}

pub fn run_analyze(
    table: &AgeGradeTable,
    files: &AnalyzeFiles,
    config: AnalyzeConfig,
) -> anyhow::Result<AnalysisReport> {
    let sources = files.sources();
    if sources.is_empty() {
        bail!("at least one of --club, --athlinks, --ultrasignup or --runningahead is required");
    }

    let mut analyzer = Analyzer::new(table, config);
    for (source, path) in sources {
        let mut results = ResultFile::open(path, source)?;
        let kept = analyzer.collect(results.by_ref());
        info!(
            "{}: {} results kept, {} rows skipped",
            source,
            kept,
            results.skipped()
        );
    }
    info!("collected results for {} runners", analyzer.runner_count());

    let report = analyzer.finish();
    let details = write_detail(&files.detail, &report.details)?;
    info!("wrote {} detail rows to {}", details, files.detail.display());
    let summaries = write_summary(&files.summary, &report.summaries)?;
    info!("wrote {} summary rows to {}", summaries, files.summary.display());
    Ok(report)
}
