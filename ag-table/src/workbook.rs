//! One-time ingestion of the age-grade workbook.
//!
//! The workbook has one sheet per gender (`Men`, `Women`), each exported to CSV.
//! The header row carries a `dist(km)` column, an `OC` (open standard, seconds)
//! column, and one column per integer age; any other header is ignored.
//!
//! # Example sheet
//! ```text
//! event,dist(km),OC,5,6,...,99
//! High Jump,0.0,2.45,1.0,1.0,...,1.0
//! 5 km,5.0,779,0.7423,0.7705,...,0.2
//! ```

use crate::{
    error::{AgeGradeError, Result},
    gender::Gender,
    table::{AgeGradeTable, GenderTable, TableRow},
};
use csv::ReaderBuilder;
use log::{debug, info};
use std::{collections::HashMap, fs, path::Path};

pub const DISTANCE_COLUMN: &str = "dist(km)";
pub const OPEN_STANDARD_COLUMN: &str = "OC";

/// Sheets of the age-grade workbook, as CSV text keyed by sheet name.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: HashMap<String, String>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: &str, csv_text: impl Into<String>) -> Self {
        self.sheets.insert(name.to_string(), csv_text.into());
        self
    }

    pub fn sheet(&self, name: &str) -> Option<&str> {
        self.sheets.get(name).map(String::as_str)
    }

    /// Read the `Men` and `Women` sheets from their exported CSV files.
    pub fn from_csv_files(men: &Path, women: &Path) -> Result<Self> {
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|e| {
                AgeGradeError::Format(format!("cannot read sheet {}: {}", path.display(), e))
            })
        };
        Ok(Workbook::new()
            .with_sheet(Gender::Male.sheet_name(), read(men)?)
            .with_sheet(Gender::Female.sheet_name(), read(women)?))
    }

    /// Read `Men.csv` and `Women.csv` from a directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Self::from_csv_files(&dir.join("Men.csv"), &dir.join("Women.csv"))
    }
}

/// Map an age column header ("5", "5.0") to its integer age. Fractional
/// headers are not age columns.
fn header_age(header: &str) -> Option<u32> {
    let value = header.trim().parse::<f64>().ok()?;
    let integral = value.fract() == 0.0 && value <= f64::from(u32::MAX);
    if value.is_finite() && value >= 0.0 && integral {
        Some(value as u32)
    } else {
        None
    }
}

fn parse_cell(sheet: &str, line: usize, column: &str, cell: &str) -> Result<f64> {
    cell.trim().parse::<f64>().map_err(|_| {
        AgeGradeError::Format(format!(
            "{} line {}: column {:?} is not a number: {:?}",
            sheet, line, column, cell
        ))
    })
}

/// Parse one gender's sheet into its distance rows.
pub fn parse_sheet(sheet: &str, csv_text: &str) -> Result<GenderTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| AgeGradeError::Format(format!("{}: unreadable header: {}", sheet, e)))?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| AgeGradeError::Format(format!("{}: missing column {:?}", sheet, name)))
    };
    let distance_index = column(DISTANCE_COLUMN)?;
    let open_standard_index = column(OPEN_STANDARD_COLUMN)?;
    let age_columns: Vec<(usize, u32)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| header_age(h).map(|age| (i, age)))
        .collect();

    let mut table = GenderTable::new();
    let mut skipped = 0u32;
    for (i, result) in rdr.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = result
            .map_err(|e| AgeGradeError::Format(format!("{} line {}: {}", sheet, line, e)))?;
        let km = parse_cell(
            sheet,
            line,
            DISTANCE_COLUMN,
            record.get(distance_index).unwrap_or(""),
        )?;
        if !km.is_finite() || km < 0.0 {
            return Err(AgeGradeError::Format(format!(
                "{} line {}: distance must be a non-negative number of km, got {}",
                sheet, line, km
            )));
        }
        // field events have no distance
        if km == 0.0 {
            skipped += 1;
            continue;
        }
        let open_standard = parse_cell(
            sheet,
            line,
            OPEN_STANDARD_COLUMN,
            record.get(open_standard_index).unwrap_or(""),
        )?;
        let mut row = TableRow::new(open_standard);
        for (index, age) in &age_columns {
            let cell = record.get(*index).unwrap_or("").trim();
            if cell.is_empty() {
                continue;
            }
            let factor = parse_cell(sheet, line, &headers[*index], cell)?;
            if factor <= 0.0 {
                debug!("{} line {}: ignoring factor {} for age {}", sheet, line, factor, age);
                continue;
            }
            row = row.with_factor(*age, factor);
        }
        table.insert((km * 1000.0).round() as u32, row);
    }
    info!(
        "{}: loaded {} distances, skipped {} non-running events",
        sheet,
        table.len(),
        skipped
    );
    Ok(table)
}

impl AgeGradeTable {
    /// Build the table from the workbook's `Women` and `Men` sheets.
    pub fn build_from_source(workbook: &Workbook) -> Result<Self> {
        let load = |gender: Gender| {
            let name = gender.sheet_name();
            let sheet = workbook
                .sheet(name)
                .ok_or_else(|| AgeGradeError::Format(format!("workbook has no {} sheet", name)))?;
            parse_sheet(name, sheet)
        };
        AgeGradeTable::new(load(Gender::Female)?, load(Gender::Male)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEN: &str = "event,isRoad,dist(km),OC,29,30.0,31
High Jump,0,0.0,2.45,1.0,1.0,1.0
5 km,1,5.0,780,0.86,0.85,0.84
10 km,1,10.0,1650,0.83,0.82,0.81
";

    const WOMEN: &str = "event,isRoad,dist(km),OC,29,30.0,31
5 km,1,5.0,870,0.89,0.88,
H. Mar,1,21.1,3912,0.87,0.86,0.85
";

    fn workbook() -> Workbook {
        Workbook::new().with_sheet("Men", MEN).with_sheet("Women", WOMEN)
    }

    #[test]
    fn test_build_from_source() {
        let table = AgeGradeTable::build_from_source(&workbook()).unwrap();
        let men = table.gender_table(Gender::Male);
        assert_eq!(men.len(), 2);
        let row = &men.rows()[&5000];
        assert_eq!(row.open_standard, 780.0);
        assert_eq!(row.factor(30), Some(0.85));
        assert_eq!(row.factors.len(), 3);

        let women = table.gender_table(Gender::Female);
        assert_eq!(women.distance_range(), Some((5000, 21100)));
        // empty cell leaves the age out of that row
        assert_eq!(women.rows()[&5000].factor(31), None);
        assert_eq!(women.rows()[&21100].factor(31), Some(0.85));
    }

    #[test]
    fn test_field_events_skipped() {
        let table = AgeGradeTable::build_from_source(&workbook()).unwrap();
        assert!(!table.gender_table(Gender::Male).rows().contains_key(&0));
    }

    #[test]
    fn test_missing_sheet() {
        let err = AgeGradeTable::build_from_source(&Workbook::new().with_sheet("Men", MEN))
            .unwrap_err();
        assert!(matches!(err, AgeGradeError::Format(_)));
    }

    #[test]
    fn test_missing_open_standard_column() {
        let sheet = "dist(km),30\n5.0,0.85\n10.0,0.82\n";
        let err = parse_sheet("Men", sheet).unwrap_err();
        assert!(matches!(err, AgeGradeError::Format(ref m) if m.contains("OC")));
    }

    #[test]
    fn test_bad_cell() {
        let sheet = "dist(km),OC,30\n5.0,fast,0.85\n";
        assert!(matches!(
            parse_sheet("Men", sheet),
            Err(AgeGradeError::Format(_))
        ));
    }

    #[test]
    fn test_header_age() {
        assert_eq!(header_age("5"), Some(5));
        assert_eq!(header_age("42.0"), Some(42));
        assert_eq!(header_age("30.5"), None);
        assert_eq!(header_age("-3"), None);
        assert_eq!(header_age("OC"), None);
        assert_eq!(header_age("dist(km)"), None);
    }

    #[test]
    fn test_fractional_header_ignored() {
        let sheet = "dist(km),OC,30,30.5\n5.0,780,0.85,0.10\n10.0,1650,0.82,0.10\n";
        let table = parse_sheet("Men", sheet).unwrap();
        let row = &table.rows()[&5000];
        assert_eq!(row.factor(30), Some(0.85));
        assert_eq!(row.factors.len(), 1);
    }

    #[test]
    fn test_bad_distance_rejected() {
        for km in ["-5.0", "NaN", "inf"] {
            let sheet = format!("dist(km),OC,30\n{},780,0.85\n10.0,1650,0.82\n", km);
            let err = parse_sheet("Men", &sheet).unwrap_err();
            assert!(matches!(err, AgeGradeError::Format(ref m) if m.contains("line 2")));
        }
    }

    #[test]
    fn test_fixture_workbook() {
        let workbook = Workbook::new()
            .with_sheet("Men", include_str!("../../fixtures/agegrade/Men.csv"))
            .with_sheet("Women", include_str!("../../fixtures/agegrade/Women.csv"));
        let table = AgeGradeTable::build_from_source(&workbook).unwrap();
        let men = table.gender_table(Gender::Male);
        assert_eq!(men.distance_range(), Some((1609, 200000)));
        assert!(men.rows().contains_key(&42200));
        assert!(men.rows().contains_key(&21100));
        let marathon = table.age_grade(50, Gender::Male, 26.2, 3.5 * 3600.0).unwrap();
        assert!(marathon.percent > 50.0 && marathon.percent < 80.0);
    }
}
