//! Market data abstractions and price series types

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Ordered sequence of (date, adjusted close) observations for one ticker.
///
/// Dates are strictly increasing and unique; gaps for non-trading days are
/// expected and must be aligned across tickers before any cross-asset
/// computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Builds a series from raw observations, sorting by date and discarding
    /// duplicate dates (first observation wins).
    pub fn from_points(mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|(date, _)| *date);
        points.dedup_by_key(|(date, _)| *date);
        Self { points }
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_price(&self) -> Option<f64> {
        self.points.first().map(|(_, p)| *p)
    }

    pub fn last_price(&self) -> Option<f64> {
        self.points.last().map(|(_, p)| *p)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }

    /// Simple daily returns: `price[t] / price[t-1] - 1`.
    ///
    /// The first observation has no prior value and is dropped rather than
    /// zero-filled.
    pub fn daily_returns(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .windows(2)
            .map(|w| (w[1].0, w[1].1 / w[0].1 - 1.0))
            .collect()
    }

    /// Total return over the series window, as a percentage.
    pub fn total_return_pct(&self) -> Option<f64> {
        let first = self.first_price()?;
        let last = self.last_price()?;
        if first == 0.0 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }

    /// Mean of the trailing `window` observations, `None` when the series is
    /// shorter than the window.
    pub fn moving_average(&self, window: usize) -> Option<f64> {
        if window == 0 || self.points.len() < window {
            return None;
        }
        let tail = &self.points[self.points.len() - window..];
        Some(tail.iter().map(|(_, p)| p).sum::<f64>() / window as f64)
    }
}

/// Inner join of two date-indexed value series. Only dates present in both
/// sides survive; dates unique to either side are discarded.
pub fn align(a: &[(NaiveDate, f64)], b: &[(NaiveDate, f64)]) -> (Vec<f64>, Vec<f64>) {
    let index: HashMap<NaiveDate, f64> = b.iter().copied().collect();
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (date, value) in a {
        if let Some(other) = index.get(date) {
            left.push(*value);
            right.push(*other);
        }
    }
    (left, right)
}

/// Price histories for a set of tickers over a common fetch window.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    series: BTreeMap<String, PriceSeries>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self {
            series: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, ticker: &str, series: PriceSeries) {
        self.series.insert(ticker.to_string(), series);
    }

    pub fn get(&self, ticker: &str) -> Option<&PriceSeries> {
        self.series.get(ticker)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PriceSeries)> {
        self.series.iter()
    }

    pub fn tickers(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn latest_price(&self, ticker: &str) -> Option<f64> {
        self.series.get(ticker).and_then(|s| s.last_price())
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Historical adjusted close prices over a trailing window.
    async fn history(&self, symbol: &str, window_days: u32) -> Result<PriceSeries>;

    /// Sector classification for a ticker, "Unknown" when unclassified.
    async fn sector(&self, symbol: &str) -> Result<String>;
}

/// Fetches price history for each ticker concurrently.
///
/// A failed or empty fetch degrades to a missing table entry; it never fails
/// the whole table. Progress is reported through `update`.
pub async fn fetch_price_table(
    provider: &dyn MarketDataProvider,
    tickers: &[String],
    window_days: u32,
    update: &(dyn Fn() + Sync),
) -> PriceTable {
    let futures = tickers.iter().map(|ticker| async move {
        let result = provider.history(ticker, window_days).await;
        update();
        (ticker.clone(), result)
    });

    let mut table = PriceTable::new();
    for (ticker, result) in join_all(futures).await {
        match result {
            Ok(series) if !series.is_empty() => table.insert(&ticker, series),
            Ok(_) => debug!("Empty price history for {ticker}"),
            Err(e) => debug!("Price history fetch failed for {ticker}: {e}"),
        }
    }
    table
}

/// Fetches sector classification for each ticker concurrently. Lookups are
/// independent and read-only, so the fan-out is safe to parallelize.
pub async fn fetch_sectors(
    provider: &dyn MarketDataProvider,
    tickers: &[String],
) -> HashMap<String, String> {
    let futures = tickers.iter().map(|ticker| async move {
        let sector = provider.sector(ticker).await.unwrap_or_else(|e| {
            debug!("Sector lookup failed for {ticker}: {e}");
            "Unknown".to_string()
        });
        (ticker.clone(), sector)
    });

    join_all(futures).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn series(points: &[(&str, f64)]) -> PriceSeries {
        PriceSeries::from_points(points.iter().map(|(d, p)| (date(d), *p)).collect())
    }

    #[test]
    fn test_from_points_sorts_and_dedups() {
        let s = series(&[
            ("2024-01-03", 3.0),
            ("2024-01-01", 1.0),
            ("2024-01-01", 9.0),
            ("2024-01-02", 2.0),
        ]);
        assert_eq!(
            s.points(),
            &[
                (date("2024-01-01"), 1.0),
                (date("2024-01-02"), 2.0),
                (date("2024-01-03"), 3.0)
            ]
        );
    }

    #[test]
    fn test_daily_returns_drops_first_observation() {
        let s = series(&[
            ("2024-01-01", 100.0),
            ("2024-01-02", 110.0),
            ("2024-01-03", 99.0),
        ]);
        let returns = s.daily_returns();
        assert_eq!(returns.len(), 2);
        assert_eq!(returns[0].0, date("2024-01-02"));
        assert!((returns[0].1 - 0.10).abs() < 1e-12);
        assert!((returns[1].1 - (99.0 / 110.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_daily_returns_on_short_series() {
        assert!(series(&[("2024-01-01", 100.0)]).daily_returns().is_empty());
        assert!(PriceSeries::new().daily_returns().is_empty());
    }

    #[test]
    fn test_align_inner_join_discards_unmatched_dates() {
        let a = [
            (date("2024-01-01"), 1.0),
            (date("2024-01-02"), 2.0),
            (date("2024-01-04"), 4.0),
        ];
        // Holiday gap on the 2nd for the benchmark side.
        let b = [
            (date("2024-01-01"), 10.0),
            (date("2024-01-03"), 30.0),
            (date("2024-01-04"), 40.0),
        ];
        let (left, right) = align(&a, &b);
        assert_eq!(left, vec![1.0, 4.0]);
        assert_eq!(right, vec![10.0, 40.0]);
    }

    #[test]
    fn test_total_return_pct() {
        let s = series(&[("2024-01-01", 100.0), ("2024-06-01", 150.0)]);
        assert!((s.total_return_pct().unwrap() - 50.0).abs() < 1e-12);
        assert!(PriceSeries::new().total_return_pct().is_none());
    }

    #[test]
    fn test_moving_average() {
        let s = series(&[
            ("2024-01-01", 1.0),
            ("2024-01-02", 2.0),
            ("2024-01-03", 3.0),
            ("2024-01-04", 4.0),
        ]);
        assert_eq!(s.moving_average(2), Some(3.5));
        assert_eq!(s.moving_average(4), Some(2.5));
        assert_eq!(s.moving_average(5), None);
    }

    struct StubProvider;

    #[async_trait]
    impl MarketDataProvider for StubProvider {
        async fn history(&self, symbol: &str, _window_days: u32) -> Result<PriceSeries> {
            match symbol {
                "GOOD" => Ok(series(&[("2024-01-01", 10.0), ("2024-01-02", 11.0)])),
                "EMPTY" => Ok(PriceSeries::new()),
                _ => anyhow::bail!("no data"),
            }
        }

        async fn sector(&self, symbol: &str) -> Result<String> {
            match symbol {
                "GOOD" => Ok("Technology".to_string()),
                _ => anyhow::bail!("no profile"),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_price_table_degrades_per_ticker() {
        let tickers = vec![
            "GOOD".to_string(),
            "EMPTY".to_string(),
            "BROKEN".to_string(),
        ];
        let table = fetch_price_table(&StubProvider, &tickers, 365, &|| ()).await;
        assert_eq!(table.tickers(), vec!["GOOD".to_string()]);
        assert_eq!(table.latest_price("GOOD"), Some(11.0));
        assert!(table.get("EMPTY").is_none());
        assert!(table.get("BROKEN").is_none());
    }

    #[tokio::test]
    async fn test_fetch_sectors_falls_back_to_unknown() {
        let tickers = vec!["GOOD".to_string(), "BROKEN".to_string()];
        let sectors = fetch_sectors(&StubProvider, &tickers).await;
        assert_eq!(sectors.get("GOOD").map(String::as_str), Some("Technology"));
        assert_eq!(sectors.get("BROKEN").map(String::as_str), Some("Unknown"));
    }
}
