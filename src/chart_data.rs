//! Prepare per-vehicle chart data from an already filtered, date-sorted
//! frame: time-series points, distribution value sets, and scatter pairs.
//! Pure view-model transform; rendering is the widgets' job.

use color_eyre::Result;
use polars::prelude::*;

use crate::loader::{has_column, CONSUMPTION, DATE, DISTANCE, REFUELED};

/// Bin count the histograms use unless configured otherwise.
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// Chart-ready views of one vehicle's rows. Absent source columns leave the
/// corresponding slot `None`/empty rather than failing.
pub struct VehicleCharts {
    /// (epoch microseconds, liters refueled) in the input row order.
    pub time_series: Vec<(f64, f64)>,
    /// Non-null finite values per distribution slot, in input order.
    pub refueled: Option<Vec<f64>>,
    pub distance: Option<Vec<f64>>,
    pub consumption: Option<Vec<f64>>,
    /// (distance, refueled) pairs where both are present.
    pub scatter: Vec<(f64, f64)>,
}

impl VehicleCharts {
    /// Build all chart slots from one vehicle's rows. The input must already
    /// be filtered to a single vehicle and sorted ascending by date.
    pub fn build(df: &DataFrame) -> Result<VehicleCharts> {
        let time_series = if has_column(df, REFUELED) {
            let dates = df.column(DATE)?.cast(&DataType::Int64)?;
            let dates = dates.i64()?;
            let refueled = df.column(REFUELED)?.f64()?;
            let mut points = Vec::with_capacity(df.height());
            for i in 0..df.height() {
                if let (Some(x), Some(y)) = (dates.get(i), refueled.get(i)) {
                    if y.is_finite() {
                        points.push((x as f64, y));
                    }
                }
            }
            points
        } else {
            Vec::new()
        };

        let refueled = distribution_values(df, REFUELED)?;
        let distance = distribution_values(df, DISTANCE)?;
        let consumption = distribution_values(df, CONSUMPTION)?;

        let scatter = if has_column(df, DISTANCE) && has_column(df, REFUELED) {
            let xs = df.column(DISTANCE)?.f64()?;
            let ys = df.column(REFUELED)?.f64()?;
            let mut points = Vec::with_capacity(df.height());
            for i in 0..df.height() {
                if let (Some(x), Some(y)) = (xs.get(i), ys.get(i)) {
                    if x.is_finite() && y.is_finite() {
                        points.push((x, y));
                    }
                }
            }
            points
        } else {
            Vec::new()
        };

        Ok(VehicleCharts {
            time_series,
            refueled,
            distance,
            consumption,
            scatter,
        })
    }
}

fn distribution_values(df: &DataFrame, column: &str) -> Result<Option<Vec<f64>>> {
    if !has_column(df, column) {
        return Ok(None);
    }
    let values = df.column(column)?.f64()?;
    Ok(Some(
        values.iter().flatten().filter(|v| v.is_finite()).collect(),
    ))
}

/// Equal-width histogram over the observed min/max of `values`.
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }
}

/// Bucket `values` into `bins` equal-width bins spanning the observed
/// min/max. `None` for empty input or a zero bin count. A degenerate range
/// (all values equal) lands everything in the first bin.
pub fn bin(values: &[f64], bins: usize) -> Option<Histogram> {
    if values.is_empty() || bins == 0 {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let mut counts = vec![0; bins];
    for &v in values {
        let bin = if range > 0.0 {
            ((((v - min) / range) * bins as f64) as usize).min(bins - 1)
        } else {
            0
        };
        counts[bin] += 1;
    }
    Some(Histogram { min, max, counts })
}
