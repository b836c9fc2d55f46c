use thiserror::Error;

/// Errors raised while building or querying the age-grade table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgeGradeError {
    /// Caller error: bad gender, age outside 5..=99, distance outside the table.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The cached table is missing or unreadable; rebuild it from the workbook.
    #[error("age grade configuration error: {0} (rebuild the table from the workbook)")]
    Configuration(String),
    /// The workbook (or a table row) does not have the expected shape.
    #[error("age grade table format error: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, AgeGradeError>;
