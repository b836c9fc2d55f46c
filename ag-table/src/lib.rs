//! Age-grade factor table.
//!
//! Holds, per gender, the open standard and the age factors for each tabulated
//! distance, and answers "what percentage of the age standard did this result
//! achieve" by linear interpolation over distance at an exact age.
//!
//! # Usage
//!
//! ```rust
//! use ag_table::{AgeGradeTable, Gender, Workbook};
//!
//! let men = "dist(km),OC,40\n5.0,780,0.92\n10.0,1650,0.91\n";
//! let women = "dist(km),OC,40\n5.0,870,0.91\n10.0,1800,0.90\n";
//! let workbook = Workbook::new().with_sheet("Men", men).with_sheet("Women", women);
//! let table = AgeGradeTable::build_from_source(&workbook).unwrap();
//!
//! let result = table.age_grade(40, Gender::Male, 4.0, 1600.0).unwrap();
//! assert!(result.percent > 70.0 && result.percent < 71.0);
//! ```

pub mod cache;
pub mod error;
pub mod gender;
pub mod table;
pub mod workbook;

pub use error::{AgeGradeError, Result};
pub use gender::Gender;
pub use table::{AgeGradeResult, AgeGradeTable, GenderTable, TableRow, MAX_AGE, MIN_AGE};
pub use workbook::Workbook;
