use crate::error::{AgeGradeError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Gender as used by the age-grade tables: one sheet per gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "M")]
    Male,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Female, Gender::Male];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "F",
            Gender::Male => "M",
        }
    }

    /// Workbook sheet holding this gender's factors.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Gender::Female => "Women",
            Gender::Male => "Men",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = AgeGradeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "M" | "m" => Ok(Gender::Male),
            "F" | "f" => Ok(Gender::Female),
            other => Err(AgeGradeError::InvalidParameter(format!(
                "gender must be M or F, got {:?}",
                other
            ))),
        }
    }
}
