//! Shared utility functions for the age-grade crates.

/// Date utility functions
pub mod dates {
    use chrono::{Datelike, NaiveDate};

    /// Date format used by every result file and report: "YYYY-MM-DD"
    pub const DATE_FORMAT: &str = "%Y-%m-%d";

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)?)
    }

    /// Integer age in years on `date` for someone born on `dob`.
    ///
    /// The birthday itself counts: a runner born 1980-05-03 is 40 on 2020-05-03
    /// and 39 on 2020-05-02. No fractional ages.
    pub fn age_on(dob: &NaiveDate, date: &NaiveDate) -> i32 {
        let before_birthday = (date.month(), date.day()) < (dob.month(), dob.day());
        date.year() - dob.year() - i32::from(before_birthday)
    }

    /// Days since 0001-01-01, used as the numeric axis for date regressions.
    pub fn date_ordinal(date: &NaiveDate) -> f64 {
        f64::from(date.num_days_from_ce())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_age_on() {
            let dob = NaiveDate::from_ymd_opt(1980, 5, 3).unwrap();
            let birthday = NaiveDate::from_ymd_opt(2020, 5, 3).unwrap();
            let day_before = NaiveDate::from_ymd_opt(2020, 5, 2).unwrap();
            let new_year = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
            assert_eq!(age_on(&dob, &birthday), 40);
            assert_eq!(age_on(&dob, &day_before), 39);
            assert_eq!(age_on(&dob, &new_year), 40);
        }

        #[test]
        fn test_leap_day_birthday() {
            let dob = NaiveDate::from_ymd_opt(2000, 2, 29).unwrap();
            let feb28 = NaiveDate::from_ymd_opt(2021, 2, 28).unwrap();
            let mar1 = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
            assert_eq!(age_on(&dob, &feb28), 20);
            assert_eq!(age_on(&dob, &mar1), 21);
        }

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2023-06-15");
            let parsed = parse_date(&formatted).unwrap();
            assert_eq!(parsed, date);
            assert!(parse_date("06/15/2023").is_err());
        }

        #[test]
        fn test_date_ordinal_is_days() {
            let a = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            let b = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
            assert_eq!(date_ordinal(&b) - date_ordinal(&a), 30.0);
        }
    }
}

/// Race time parsing and rendering
pub mod times {
    use anyhow::{anyhow, bail};

    /// Parse a race time of the form `[[h:]m:]s[.fff]` into seconds.
    ///
    /// Some exports drop the leading zero (":45" for forty-five seconds), so an
    /// empty leading field is read as zero.
    pub fn parse_race_time(s: &str) -> anyhow::Result<f64> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            bail!("empty race time");
        }
        let fields: Vec<&str> = trimmed.split(':').collect();
        if fields.len() > 3 {
            bail!("too many fields in race time {:?}", trimmed);
        }
        let mut seconds = 0.0;
        for field in &fields {
            let value = if field.is_empty() {
                0.0
            } else {
                field
                    .parse::<f64>()
                    .map_err(|_| anyhow!("invalid race time {:?}", trimmed))?
            };
            if value < 0.0 {
                bail!("negative field in race time {:?}", trimmed);
            }
            seconds = seconds * 60.0 + value;
        }
        Ok(seconds)
    }

    /// Render seconds as "h:mm:ss", rounding to the nearest second.
    pub fn render_time(seconds: f64) -> String {
        let total = seconds.round().max(0.0) as u64;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let secs = total % 60;
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    }

}

/// Distance conversions
pub mod distance {
    /// Meters in a statute mile.
    pub const METERS_PER_MILE: f64 = 1609.344;

    pub fn meters_to_miles(meters: f64) -> f64 {
        meters / METERS_PER_MILE
    }

    pub fn miles_to_meters(miles: f64) -> f64 {
        miles * METERS_PER_MILE
    }

    pub fn km_to_meters(km: f64) -> f64 {
        km * 1000.0
    }

}
