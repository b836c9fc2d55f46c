//! Readers for the per-source result files.
//!
//! Every source exports a CSV with a header row. Column names differ in case
//! between sources (`dob` vs `DOB`) and some sources carry extra columns, so
//! columns are located by name, ignoring case. Rows that cannot be parsed are
//! logged and skipped; the reader never fails after it has been opened.

use ag_data::{buckets::plausible_age_grade, Observation, Source};
use ag_table::Gender;
use ag_utils::{
    dates::parse_date,
    distance::{km_to_meters, miles_to_meters},
    times::parse_race_time,
};
use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use log::{debug, info, warn};
use std::{fs::File, path::Path};

/// One result as read from a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub name: String,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub race: String,
    pub date: NaiveDate,
    pub location: String,
    pub distance_meters: f64,
    pub time_seconds: f64,
    pub fuzzy_age: bool,
    pub source: Source,
}

impl ResultRecord {
    /// Runners are matched across sources by lower-cased name.
    pub fn runner_key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn to_observation(&self) -> Observation {
        Observation::new(self.date, self.distance_meters, self.time_seconds, self.source)
            .with_race(&self.race)
            .with_location(&self.location)
            .with_fuzzy_age(self.fuzzy_age)
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    name: usize,
    dob: usize,
    gender: usize,
    race: usize,
    date: usize,
    time: usize,
    km: Option<usize>,
    miles: Option<usize>,
    loc: Option<usize>,
    ag: Option<usize>,
    fuzzy_age: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> anyhow::Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| find(name).ok_or_else(|| anyhow!("missing column {}", name));

        let columns = Columns {
            name: require("name")?,
            dob: require("dob")?,
            gender: require("gender")?,
            race: require("race")?,
            date: require("date")?,
            time: require("time")?,
            km: find("km"),
            miles: find("miles"),
            loc: find("loc"),
            ag: find("ag"),
            fuzzy_age: find("fuzzyage"),
        };
        if columns.km.is_none() && columns.miles.is_none() {
            bail!("missing column km (or miles)");
        }
        Ok(columns)
    }
}

fn field<'r>(record: &'r StringRecord, index: usize, name: &str) -> anyhow::Result<&'r str> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| anyhow!("short row, no {}", name))
}

fn optional_field(record: &StringRecord, index: Option<usize>) -> Option<&str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Iterator over the results in one source file.
pub struct ResultFile {
    source: Source,
    columns: Columns,
    records: StringRecordsIntoIter<File>,
    row: usize,
    skipped: usize,
}

impl ResultFile {
    pub fn open(path: &Path, source: Source) -> anyhow::Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("cannot open {} results {}", source, path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("cannot read header of {}", path.display()))?
            .clone();
        let columns = Columns::from_headers(&headers)
            .with_context(|| format!("{} is not a {} result file", path.display(), source))?;
        info!("reading {} results from {}", source, path.display());
        Ok(ResultFile {
            source,
            columns,
            records: reader.into_records(),
            row: 1,
            skipped: 0,
        })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Rows skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// `Ok(None)` for rows that parse but should not be analyzed.
    fn parse(&self, record: &StringRecord) -> anyhow::Result<Option<ResultRecord>> {
        let columns = &self.columns;
        let name = field(record, columns.name, "name")?;
        if name.is_empty() {
            bail!("empty name");
        }
        let gender: Gender = field(record, columns.gender, "gender")?
            .chars()
            .next()
            .ok_or_else(|| anyhow!("empty gender"))?
            .to_string()
            .parse()?;
        let dob = parse_date(field(record, columns.dob, "dob")?).context("bad dob")?;
        let date = parse_date(field(record, columns.date, "date")?).context("bad date")?;
        let time_seconds =
            parse_race_time(field(record, columns.time, "time")?).context("bad time")?;

        let distance_meters = match (
            optional_field(record, columns.km),
            optional_field(record, columns.miles),
        ) {
            (Some(km), _) => km_to_meters(km.parse::<f64>().context("bad km")?),
            (None, Some(miles)) => miles_to_meters(miles.parse::<f64>().context("bad miles")?),
            (None, None) => bail!("no distance"),
        };

        if time_seconds <= 0.0 {
            return Ok(None);
        }
        if let Some(ag) = optional_field(record, columns.ag) {
            let ag: f64 = ag.parse().context("bad ag")?;
            if !plausible_age_grade(ag) {
                debug!("{}: implausible age grade {} on {}", name, ag, date);
                return Ok(None);
            }
        }

        Ok(Some(ResultRecord {
            name: name.to_string(),
            gender,
            dob,
            race: field(record, columns.race, "race")?.to_string(),
            date,
            location: optional_field(record, columns.loc)
                .unwrap_or_default()
                .to_string(),
            distance_meters,
            time_seconds,
            fuzzy_age: optional_field(record, columns.fuzzy_age)
                .is_some_and(|flag| flag.eq_ignore_ascii_case("y")),
            source: self.source,
        }))
    }
}

impl Iterator for ResultFile {
    type Item = ResultRecord;

    fn next(&mut self) -> Option<ResultRecord> {
        while let Some(record) = self.records.next() {
            self.row += 1;
            let parsed = record
                .map_err(anyhow::Error::from)
                .and_then(|record| self.parse(&record));
            match parsed {
                Ok(Some(result)) => return Some(result),
                Ok(None) => self.skipped += 1,
                Err(e) => {
                    warn!("{} row {}: skipping: {:#}", self.source, self.row, e);
                    self.skipped += 1;
                }
            }
        }
        None
    }
}
