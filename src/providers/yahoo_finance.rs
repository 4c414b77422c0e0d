use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::{debug, instrument};

use crate::core::market::{MarketDataProvider, PriceSeries};
use crate::providers::util::with_retry;

/// A slow provider degrades to an empty result upstream; never hang a
/// dashboard render on a single fetch.
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);

// YahooMarketProvider implements MarketDataProvider against the chart and
// quoteSummary endpoints.
pub struct YahooMarketProvider {
    base_url: String,
}

impl YahooMarketProvider {
    pub fn new(base_url: &str) -> Self {
        YahooMarketProvider {
            base_url: base_url.to_string(),
        }
    }

    fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .user_agent("finboard/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?)
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct AdjClose {
    adjclose: Option<Vec<Option<f64>>>,
}

impl ChartItem {
    /// Adjusted close when the endpoint provides it, raw close otherwise
    /// (indices and crypto carry no adjusted series).
    fn closes(&self) -> Option<&Vec<Option<f64>>> {
        let indicators = self.indicators.as_ref()?;
        indicators
            .adjclose
            .as_ref()
            .and_then(|a| a.first())
            .and_then(|a| a.adjclose.as_ref())
            .or_else(|| indicators.quote.first().and_then(|q| q.close.as_ref()))
    }
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(alias = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryItem>>,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryItem {
    #[serde(alias = "assetProfile")]
    asset_profile: Option<AssetProfile>,
}

#[derive(Deserialize, Debug)]
struct AssetProfile {
    sector: Option<String>,
}

#[async_trait]
impl MarketDataProvider for YahooMarketProvider {
    #[instrument(
        name = "YahooHistoryFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn history(&self, symbol: &str, window_days: u32) -> Result<PriceSeries> {
        let now = Utc::now();
        let period1 = (now - Duration::days(i64::from(window_days))).timestamp();
        let period2 = now.timestamp();
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&period1={}&period2={}",
            self.base_url, symbol, period1, period2
        );
        debug!("Requesting price history from {}", url);

        let client = self.client()?;
        let response = with_retry(|| client.get(&url).send(), 2, 250)
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        let data = response.json::<YahooChartResponse>().await?;
        let item = data
            .chart
            .result
            .as_ref()
            .and_then(|r| r.first())
            .ok_or_else(|| anyhow!("No price history found for symbol: {}", symbol))?;

        let mut points = Vec::new();
        if let (Some(timestamps), Some(closes)) = (item.timestamp.as_ref(), item.closes()) {
            for (ts, close) in timestamps.iter().zip(closes.iter()) {
                if let (Some(date), Some(price)) =
                    (Utc.timestamp_opt(*ts, 0).single(), *close)
                {
                    points.push((date.date_naive(), price));
                }
            }
        }

        debug!("Fetched {} price points for {}", points.len(), symbol);
        Ok(PriceSeries::from_points(points))
    }

    async fn sector(&self, symbol: &str) -> Result<String> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=assetProfile",
            self.base_url, symbol
        );
        debug!("Requesting sector profile from {}", url);

        // Unclassified tickers are routine; any miss degrades to "Unknown".
        let fallback = || "Unknown".to_string();

        let client = self.client()?;
        let response = match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Sector lookup HTTP {} for {}", response.status(), symbol);
                return Ok(fallback());
            }
            Err(e) => {
                debug!("Sector lookup request error for {}: {}", symbol, e);
                return Ok(fallback());
            }
        };

        let sector = match response.json::<QuoteSummaryResponse>().await {
            Ok(data) => data
                .quote_summary
                .result
                .and_then(|r| r.into_iter().next())
                .and_then(|item| item.asset_profile)
                .and_then(|profile| profile.sector)
                .unwrap_or_else(fallback),
            Err(e) => {
                debug!("Sector lookup parse error for {}: {}", symbol, e);
                fallback()
            }
        };

        Ok(sector)
    }
}
