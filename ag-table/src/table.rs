use crate::{
    error::{AgeGradeError, Result},
    gender::Gender,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Youngest age with a factor column in the table.
pub const MIN_AGE: i32 = 5;
/// Oldest age with a factor column in the table.
pub const MAX_AGE: i32 = 99;

/// Meters per mile used when converting query distances. The two standard
/// road distances in `KNOWN_DISTANCES` bypass this conversion.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Race distances (miles) that map onto the table's canonical rows (meters)
/// rather than a literal conversion.
const KNOWN_DISTANCES: [(f64, f64); 2] = [(26.2, 42200.0), (13.1, 21100.0)];

/// One distance row of the table: the open standard plus a factor per age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Open-class standard time for the distance, in seconds.
    pub open_standard: f64,
    /// Age (years) -> age-grade factor.
    pub factors: BTreeMap<u32, f64>,
}

impl TableRow {
    pub fn new(open_standard: f64) -> Self {
        TableRow {
            open_standard,
            factors: BTreeMap::new(),
        }
    }

    pub fn with_factor(mut self, age: u32, factor: f64) -> Self {
        self.factors.insert(age, factor);
        self
    }

    pub fn factor(&self, age: u32) -> Option<f64> {
        self.factors.get(&age).copied()
    }
}

/// All distance rows for one gender, keyed by distance in meters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenderTable {
    rows: BTreeMap<u32, TableRow>,
}

impl GenderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, replacing any row already at that distance.
    pub fn insert(&mut self, distance_meters: u32, row: TableRow) {
        if self.rows.insert(distance_meters, row).is_some() {
            debug!("replaced age grade row at {} meters", distance_meters);
        }
    }

    pub fn rows(&self) -> &BTreeMap<u32, TableRow> {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shortest and longest tabulated distances, in meters.
    pub fn distance_range(&self) -> Option<(u32, u32)> {
        let first = self.rows.keys().next()?;
        let last = self.rows.keys().next_back()?;
        Some((*first, *last))
    }

    /// The tabulated rows `x0 <= distance <= x1`. An exact hit returns the same
    /// row twice.
    fn bracket(&self, distance_meters: f64) -> Option<((u32, &TableRow), (u32, &TableRow))> {
        if !distance_meters.is_finite() || distance_meters < 0.0 {
            return None;
        }
        let (x0, r0) = self
            .rows
            .range(..=distance_meters.floor() as u32)
            .next_back()?;
        let (x1, r1) = self.rows.range(distance_meters.ceil() as u32..).next()?;
        Some(((*x0, r0), (*x1, r1)))
    }
}

/// Result of an age-grade query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeGradeResult {
    /// Age-graded performance, percent of the age standard. Not clamped.
    pub percent: f64,
    /// Age-graded equivalent time, seconds.
    pub graded_time: f64,
    /// Interpolated age-grade factor.
    pub factor: f64,
}

/// Age-grade factors and open standards for both genders.
///
/// Built once from the workbook (see [`AgeGradeTable::build_from_source`]) or
/// from the cache (see [`AgeGradeTable::build_from_cache`]) and never mutated
/// afterwards; share it by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGradeTable {
    women: GenderTable,
    men: GenderTable,
}

impl AgeGradeTable {
    /// Assemble a table, checking each gender has at least two distances to
    /// interpolate between.
    pub fn new(women: GenderTable, men: GenderTable) -> Result<Self> {
        let table = AgeGradeTable { women, men };
        table.validate()?;
        Ok(table)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for gender in Gender::ALL {
            let rows = self.gender_table(gender).len();
            if rows < 2 {
                return Err(AgeGradeError::Format(format!(
                    "{} needs at least two distances, found {}",
                    gender.sheet_name(),
                    rows
                )));
            }
        }
        Ok(())
    }

    pub fn gender_table(&self, gender: Gender) -> &GenderTable {
        match gender {
            Gender::Female => &self.women,
            Gender::Male => &self.men,
        }
    }

    /// Convert a query distance in miles to the table's meters.
    ///
    /// Conversions landing within a micrometer of a whole meter snap to it, so
    /// a distance that started out as tabulated meters hits its row exactly.
    pub fn distance_meters(distance_miles: f64) -> f64 {
        if let Some((_, meters)) = KNOWN_DISTANCES
            .iter()
            .find(|(miles, _)| (distance_miles - miles).abs() < 1e-9)
        {
            return *meters;
        }
        let meters = distance_miles * METERS_PER_MILE;
        if (meters - meters.round()).abs() < 1e-6 {
            meters.round()
        } else {
            meters
        }
    }

    /// Age grade a result.
    ///
    /// `age` must be an integer 5..=99 and match a table column exactly; no
    /// interpolation across ages. The factor and the open standard are each
    /// interpolated linearly over distance between the bracketing rows.
    pub fn age_grade(
        &self,
        age: i32,
        gender: Gender,
        distance_miles: f64,
        time_seconds: f64,
    ) -> Result<AgeGradeResult> {
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(AgeGradeError::InvalidParameter(format!(
                "age must be an integer between {} and {} inclusive, got {}",
                MIN_AGE, MAX_AGE, age
            )));
        }
        if !time_seconds.is_finite() || time_seconds <= 0.0 {
            return Err(AgeGradeError::InvalidParameter(format!(
                "time must be a positive number of seconds, got {}",
                time_seconds
            )));
        }

        let table = self.gender_table(gender);
        let distance = Self::distance_meters(distance_miles);
        let (min_meters, max_meters) = table.distance_range().ok_or_else(|| {
            AgeGradeError::Format(format!("no rows for {}", gender.sheet_name()))
        })?;
        if !distance.is_finite()
            || distance < f64::from(min_meters)
            || distance > f64::from(max_meters)
        {
            return Err(AgeGradeError::InvalidParameter(format!(
                "distance must be between {:.3} and {:.1} miles, got {}",
                f64::from(min_meters) / METERS_PER_MILE,
                f64::from(max_meters) / METERS_PER_MILE,
                distance_miles
            )));
        }

        let ((x0, row0), (x1, row1)) = table.bracket(distance).ok_or_else(|| {
            AgeGradeError::InvalidParameter(format!("no rows bracket {} meters", distance))
        })?;
        let age_column = age as u32;
        let missing_factor = |x: u32| {
            AgeGradeError::Format(format!(
                "{} row {} meters has no factor for age {}",
                gender.sheet_name(),
                x,
                age
            ))
        };
        let f0 = row0.factor(age_column).ok_or_else(|| missing_factor(x0))?;
        let f1 = row1.factor(age_column).ok_or_else(|| missing_factor(x1))?;

        let t = if x1 == x0 {
            0.0
        } else {
            (distance - f64::from(x0)) / f64::from(x1 - x0)
        };
        let factor = f0 + (f1 - f0) * t;
        let open_standard = row0.open_standard + (row1.open_standard - row0.open_standard) * t;

        Ok(AgeGradeResult {
            percent: 100.0 * (open_standard / factor) / time_seconds,
            graded_time: time_seconds * factor,
            factor,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Two-row men's table plus a women's table, ages 5..=99 everywhere.
    pub(crate) fn sample_table() -> AgeGradeTable {
        let mut men = GenderTable::new();
        let mut women = GenderTable::new();
        let mut m5k = TableRow::new(780.0);
        let mut m10k = TableRow::new(1650.0);
        let mut w5k = TableRow::new(870.0);
        let mut w10k = TableRow::new(1800.0);
        for age in (MIN_AGE as u32)..=(MAX_AGE as u32) {
            let drop = 0.003 * f64::from(age.saturating_sub(30));
            m5k = m5k.with_factor(age, 0.85 - drop);
            m10k = m10k.with_factor(age, 0.82 - drop);
            w5k = w5k.with_factor(age, 0.88 - drop);
            w10k = w10k.with_factor(age, 0.86 - drop);
        }
        men.insert(5000, m5k);
        men.insert(10000, m10k);
        women.insert(5000, w5k);
        women.insert(10000, w10k);
        AgeGradeTable::new(women, men).unwrap()
    }

    #[test]
    fn test_ten_k_boundary() {
        let table = sample_table();
        let result = table.age_grade(30, Gender::Male, 6.2137, 2000.0).unwrap();
        assert!((result.factor - 0.82).abs() < 1e-4);
    }

    #[test]
    fn test_exact_row_uses_raw_values() {
        let table = sample_table();
        let miles = 5000.0 / METERS_PER_MILE;
        let result = table.age_grade(30, Gender::Male, miles, 1000.0).unwrap();
        assert!((result.factor - 0.85).abs() < 1e-9);
        let expected_percent = 100.0 * (780.0 / 0.85) / 1000.0;
        assert!((result.percent - expected_percent).abs() < 1e-6);
        assert!((result.graded_time - 850.0).abs() < 1e-6);
    }

    #[test]
    fn test_midpoint_interpolation() {
        let table = sample_table();
        let miles = 7500.0 / METERS_PER_MILE;
        let result = table.age_grade(30, Gender::Male, miles, 1200.0).unwrap();
        assert!((result.factor - 0.835).abs() < 1e-9);
        let open_standard = 1215.0;
        assert!((result.percent - 100.0 * (open_standard / 0.835) / 1200.0).abs() < 1e-6);
    }

    #[test]
    fn test_age_out_of_range() {
        let table = sample_table();
        for age in [105, 100, 4, 0, -1] {
            let err = table.age_grade(age, Gender::Male, 26.2, 15000.0).unwrap_err();
            assert!(matches!(err, AgeGradeError::InvalidParameter(_)));
        }
    }

    #[test]
    fn test_distance_out_of_range() {
        let table = sample_table();
        let err = table.age_grade(40, Gender::Female, 1.0, 400.0).unwrap_err();
        assert!(matches!(err, AgeGradeError::InvalidParameter(_)));
        let err = table.age_grade(40, Gender::Female, 26.2, 15000.0).unwrap_err();
        assert!(matches!(err, AgeGradeError::InvalidParameter(_)));
    }

    #[test]
    fn test_non_positive_time_rejected() {
        let table = sample_table();
        let err = table.age_grade(40, Gender::Male, 5.0, 0.0).unwrap_err();
        assert!(matches!(err, AgeGradeError::InvalidParameter(_)));
    }

    #[test]
    fn test_known_distances() {
        assert_eq!(AgeGradeTable::distance_meters(26.2), 42200.0);
        assert_eq!(AgeGradeTable::distance_meters(13.1), 21100.0);
        assert!((AgeGradeTable::distance_meters(1.0) - 1609.344).abs() < 1e-9);
    }

    #[test]
    fn test_missing_age_factor_is_format_error() {
        let mut men = GenderTable::new();
        men.insert(5000, TableRow::new(780.0).with_factor(30, 0.85));
        men.insert(10000, TableRow::new(1650.0).with_factor(30, 0.82));
        let table = AgeGradeTable::new(men.clone(), men).unwrap();
        let err = table.age_grade(31, Gender::Male, 5.0, 2000.0).unwrap_err();
        assert!(matches!(err, AgeGradeError::Format(_)));
    }

    #[test]
    fn test_single_distance_rejected() {
        let mut men = GenderTable::new();
        men.insert(5000, TableRow::new(780.0).with_factor(30, 0.85));
        let err = AgeGradeTable::new(men.clone(), men).unwrap_err();
        assert!(matches!(err, AgeGradeError::Format(_)));
    }

    proptest! {
        #[test]
        fn prop_rejects_ages_outside_table(age in prop_oneof![i32::MIN..MIN_AGE, (MAX_AGE + 1)..i32::MAX]) {
            let table = sample_table();
            let result = table.age_grade(age, Gender::Female, 5.0, 1800.0);
            prop_assert!(matches!(result, Err(AgeGradeError::InvalidParameter(_))));
        }

        #[test]
        fn prop_interpolation_stays_between_rows(meters in 5000.0f64..10000.0, age in MIN_AGE..=MAX_AGE) {
            let table = sample_table();
            let result = table
                .age_grade(age, Gender::Male, meters / METERS_PER_MILE, 1500.0)
                .unwrap();
            let rows = table.gender_table(Gender::Male).rows();
            let f0 = rows[&5000].factor(age as u32).unwrap();
            let f1 = rows[&10000].factor(age as u32).unwrap();
            let (lo, hi) = (f0.min(f1), f0.max(f1));
            prop_assert!(result.factor >= lo - 1e-9 && result.factor <= hi + 1e-9);
            let open_standard = result.percent * result.factor * 1500.0 / 100.0;
            prop_assert!(open_standard >= 780.0 - 1e-6 && open_standard <= 1650.0 + 1e-6);
        }

        #[test]
        fn prop_exact_at_tabulated_points(age in MIN_AGE..=MAX_AGE, time in 600.0f64..4000.0) {
            let table = sample_table();
            let rows = table.gender_table(Gender::Female).rows();
            for (meters, row) in rows {
                let miles = f64::from(*meters) / METERS_PER_MILE;
                let result = table.age_grade(age, Gender::Female, miles, time).unwrap();
                let factor = row.factor(age as u32).unwrap();
                prop_assert!((result.factor - factor).abs() < 1e-9);
                let expected = 100.0 * (row.open_standard / factor) / time;
                prop_assert!((result.percent - expected).abs() < 1e-6);
            }
        }
    }
}
