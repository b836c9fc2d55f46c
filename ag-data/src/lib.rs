//! Result aggregation for age-grade analysis.
//!
//! Collects one runner's results from several sources, removes the duplicates
//! the sources share, grades each result against an [`ag_table::AgeGradeTable`]
//! and fits trend lines per distance bucket.

pub mod observation;
pub mod series;
pub mod summary;
pub mod trend;

/// Distance buckets used for per-distance trends.
pub mod buckets {
    /// Label of the bucket holding every result.
    pub const OVERALL: &str = "overall";

    /// Inclusive distance range in meters.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct DistanceBucket {
        pub label: &'static str,
        pub min_meters: f64,
        pub max_meters: f64,
    }

    impl DistanceBucket {
        pub fn contains(&self, meters: f64) -> bool {
            meters >= self.min_meters && meters <= self.max_meters
        }
    }

    pub const TREND_BUCKETS: [DistanceBucket; 4] = [
        DistanceBucket {
            label: "<5K",
            min_meters: 0.0,
            max_meters: 4999.99,
        },
        DistanceBucket {
            label: "5K - <HM",
            min_meters: 5000.0,
            max_meters: 21097.5,
        },
        DistanceBucket {
            label: "HM - Mara",
            min_meters: 21097.51,
            max_meters: 42194.99,
        },
        DistanceBucket {
            label: "Ultra",
            min_meters: 42195.0,
            max_meters: 200000.0,
        },
    ];

    /// Bucket label for a distance, if any bucket holds it.
    pub fn bucket_for(meters: f64) -> Option<&'static str> {
        TREND_BUCKETS
            .iter()
            .find(|bucket| bucket.contains(meters))
            .map(|bucket| bucket.label)
    }

    /// Age grades outside [15, 100) are almost always data entry errors.
    pub fn plausible_age_grade(percent: f64) -> bool {
        (15.0..100.0).contains(&percent)
    }

}

pub use observation::{Observation, Source};
pub use series::{Runner, RunnerSeries, SeriesState, DEDUP_EPSILON};
pub use summary::{detail_rows, summarize, DetailRow, RacesByYear, SummaryOptions, SummaryRow};
pub use trend::{linear_regression, mean, TrendLine};
