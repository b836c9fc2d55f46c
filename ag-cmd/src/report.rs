//! CSV report writers.

use ag_data::{DetailRow, SummaryRow};
use anyhow::Context;
use csv::WriterBuilder;
use serde::Serialize;
use std::path::Path;

pub const SUMMARY_HEADER: [&str; 12] = [
    "name",
    "age",
    "gender",
    "bucket",
    "race_count",
    "age_grade_mean",
    "one_year_age_grade",
    "trend_slope",
    "trend_stderr",
    "r_squared",
    "p_value",
    "races_by_year",
];

pub const DETAIL_HEADER: [&str; 14] = [
    "name",
    "dob",
    "gender",
    "race",
    "date",
    "loc",
    "dist",
    "time",
    "ag",
    "source",
    "fuzzyage",
    "distmiles",
    "distkm",
    "rendertime",
];

/// Write `rows` under `header`. The header is written even when there are no
/// rows. Returns the number of rows written.
fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> anyhow::Result<usize> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    writer.write_record(header)?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("cannot write {}", path.display()))?;
    }
    writer.flush()?;
    Ok(rows.len())
}

pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> anyhow::Result<usize> {
    write_rows(path, &SUMMARY_HEADER, rows)
}

pub fn write_detail(path: &Path, rows: &[DetailRow]) -> anyhow::Result<usize> {
    write_rows(path, &DETAIL_HEADER, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_data::RacesByYear;
    use ag_table::Gender;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_summary_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        assert_eq!(write_summary(&path, &[]).unwrap(), 0);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), SUMMARY_HEADER.join(","));
    }

    #[test]
    fn test_summary_row_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let row = SummaryRow {
            name: "Pat Runner".to_string(),
            age: 45,
            gender: Gender::Female,
            bucket: "overall".to_string(),
            race_count: 3,
            age_grade_mean: 70.5,
            one_year_age_grade: None,
            trend_slope: None,
            trend_stderr: None,
            r_squared: None,
            p_value: None,
            races_by_year: RacesByYear(BTreeMap::from([(2020, 1), (2021, 2)])),
        };
        write_summary(&path, &[row]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "Pat Runner,45,F,overall,3,70.5,,,,,,2020:1;2021:2");
    }
}
