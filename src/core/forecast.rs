//! Price forecasting over a single asset's history.
//!
//! The model is an additive decomposition: a least-squares linear trend on
//! the day index plus a mean weekday residual for seasonality. Confidence
//! bounds come from the residual standard deviation and widen with the
//! forecast horizon.

use crate::core::market::PriceSeries;
use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

/// Minimum history length for a stable fit.
pub const MIN_OBSERVATIONS: usize = 20;

pub const DEFAULT_HORIZON_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

/// A forecast either produces exactly the requested number of rows or an
/// explanation of why none could be made. Short histories are a routine
/// condition, not an error.
#[derive(Debug, Clone)]
pub enum ForecastOutcome {
    Available(Vec<ForecastPoint>),
    Unavailable { reason: String },
}

pub trait Forecaster: Send + Sync {
    /// Projects `days` future rows continuing day-by-day from the last
    /// historical date. Input dates must be strictly increasing with no
    /// duplicates.
    fn forecast(&self, series: &PriceSeries, days: u32) -> Result<ForecastOutcome>;
}

pub struct TrendSeasonalModel {
    confidence_z: f64,
}

impl TrendSeasonalModel {
    pub fn new(confidence_z: f64) -> Self {
        Self { confidence_z }
    }
}

impl Default for TrendSeasonalModel {
    fn default() -> Self {
        // 95% band
        Self::new(1.96)
    }
}

impl Forecaster for TrendSeasonalModel {
    fn forecast(&self, series: &PriceSeries, days: u32) -> Result<ForecastOutcome> {
        let points = series.points();
        for window in points.windows(2) {
            if window[1].0 <= window[0].0 {
                bail!(
                    "Price history dates must be strictly increasing ({} then {})",
                    window[0].0,
                    window[1].0
                );
            }
        }

        let n = points.len();
        if n < MIN_OBSERVATIONS {
            debug!("Forecast unavailable: {n} observations");
            return Ok(ForecastOutcome::Unavailable {
                reason: format!("needs at least {MIN_OBSERVATIONS} price observations, got {n}"),
            });
        }

        let first_date = points[0].0;
        let last_date = points[n - 1].0;

        // Linear trend on the day offset from the first observation.
        let xs: Vec<f64> = points
            .iter()
            .map(|(d, _)| (*d - first_date).num_days() as f64)
            .collect();
        let ys: Vec<f64> = points.iter().map(|(_, p)| *p).collect();

        let x_mean = xs.iter().sum::<f64>() / n as f64;
        let y_mean = ys.iter().sum::<f64>() / n as f64;
        let sxx: f64 = xs.iter().map(|x| (x - x_mean) * (x - x_mean)).sum();
        let sxy: f64 = xs
            .iter()
            .zip(ys.iter())
            .map(|(x, y)| (x - x_mean) * (y - y_mean))
            .sum();
        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        // Mean trend residual per weekday as the seasonal component.
        let mut weekday_sum = [0.0f64; 7];
        let mut weekday_count = [0usize; 7];
        for ((date, _), (x, y)) in points.iter().zip(xs.iter().zip(ys.iter())) {
            let residual = y - (intercept + slope * x);
            let weekday = date.weekday().num_days_from_monday() as usize;
            weekday_sum[weekday] += residual;
            weekday_count[weekday] += 1;
        }
        let seasonal: Vec<f64> = (0..7)
            .map(|w| {
                if weekday_count[w] > 0 {
                    weekday_sum[w] / weekday_count[w] as f64
                } else {
                    0.0
                }
            })
            .collect();

        // Residual spread after removing trend and seasonality.
        let deseasonalized: Vec<f64> = points
            .iter()
            .zip(xs.iter().zip(ys.iter()))
            .map(|((date, _), (x, y))| {
                let weekday = date.weekday().num_days_from_monday() as usize;
                y - (intercept + slope * x) - seasonal[weekday]
            })
            .collect();
        let resid_mean = deseasonalized.iter().sum::<f64>() / n as f64;
        let sigma = (deseasonalized
            .iter()
            .map(|r| (r - resid_mean) * (r - resid_mean))
            .sum::<f64>()
            / (n - 1) as f64)
            .sqrt();

        let mut forecast = Vec::with_capacity(days as usize);
        for step in 1..=i64::from(days) {
            let date = last_date + Duration::days(step);
            let x = (date - first_date).num_days() as f64;
            let weekday = date.weekday().num_days_from_monday() as usize;
            let predicted = intercept + slope * x + seasonal[weekday];
            let half_width =
                self.confidence_z * sigma * (1.0 + step as f64 / n as f64).sqrt();
            forecast.push(ForecastPoint {
                date,
                predicted,
                lower: predicted - half_width,
                upper: predicted + half_width,
            });
        }

        Ok(ForecastOutcome::Available(forecast))
    }
}
