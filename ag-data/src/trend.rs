//! Least-squares trend lines and simple descriptive statistics.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Regression line over (x, y) points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient.
    pub correlation: f64,
    /// Two-sided p-value for the null hypothesis that the slope is zero.
    pub p_value: f64,
    /// Standard error of the slope.
    pub standard_error: f64,
}

impl TrendLine {
    pub fn r_squared(&self) -> f64 {
        self.correlation * self.correlation
    }

    pub fn value_at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Ordinary least-squares fit of y against x.
///
/// Returns `None` with fewer than two points or when every x is the same.
/// With exactly two points the fit is exact: the standard error is zero and
/// the p-value is 0 (or 1 when both y are equal).
pub fn linear_regression(points: &[(f64, f64)]) -> Option<TrendLine> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let count = n as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / count;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / count;

    let mut ss_x = 0.0;
    let mut ss_y = 0.0;
    let mut ss_xy = 0.0;
    for (x, y) in points {
        let dx = x - x_mean;
        let dy = y - y_mean;
        ss_x += dx * dx;
        ss_y += dy * dy;
        ss_xy += dx * dy;
    }
    if ss_x == 0.0 {
        return None;
    }

    let correlation = if ss_y == 0.0 {
        0.0
    } else {
        (ss_xy / (ss_x * ss_y).sqrt()).clamp(-1.0, 1.0)
    };
    let slope = ss_xy / ss_x;
    let intercept = y_mean - slope * x_mean;

    let (p_value, standard_error) = if n == 2 {
        let p_value = if points[0].1 == points[1].1 { 1.0 } else { 0.0 };
        (p_value, 0.0)
    } else {
        let df = count - 2.0;
        let r2 = correlation * correlation;
        let t = correlation * (df / ((1.0 - correlation) * (1.0 + correlation) + 1e-20)).sqrt();
        let p_value = student_t_two_sided(t, df);
        let standard_error = ((1.0 - r2) * ss_y / ss_x / df).max(0.0).sqrt();
        (p_value, standard_error)
    };

    Some(TrendLine {
        slope,
        intercept,
        correlation,
        p_value,
        standard_error,
    })
}

/// P(|T| >= |t|) for Student's t with `df` degrees of freedom.
fn student_t_two_sided(t: f64, df: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, df) {
        Ok(distribution) => (2.0 * distribution.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}
