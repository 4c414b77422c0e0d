//! Risk/return analytics over portfolio price histories.
//!
//! All metrics are kept at full precision here; rounding for display is the
//! rendering layer's concern.

use crate::core::market::{PriceSeries, PriceTable, align};
use crate::core::portfolio::Portfolio;
use std::collections::HashMap;
use tracing::debug;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Per-ticker risk/return profile relative to a benchmark.
///
/// `annual_volatility` is a decimal fraction (0.25 = 25% a year).
#[derive(Debug, Clone, PartialEq)]
pub struct RiskMetric {
    pub ticker: String,
    pub beta: f64,
    pub sharpe_ratio: f64,
    pub annual_volatility: f64,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 normalization). Requires at least 2 observations.
fn sample_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample covariance with the same normalization as [`sample_variance`], so
/// beta of a scaled benchmark comes out exact.
fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let ma = mean(a);
    let mb = mean(b);
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (a.len() - 1) as f64
}

/// Computes beta, Sharpe ratio and annualized volatility for every ticker in
/// the table against the benchmark series.
///
/// Asset and benchmark daily returns are aligned by inner join on date; days
/// missing on either side are discarded. Degenerate denominators (zero
/// market variance, zero volatility) yield a metric of exactly 0 rather than
/// an error, so outputs are always finite. Tickers with fewer than 2 aligned
/// return observations have undefined statistics and are excluded from the
/// result entirely.
pub fn compute_risk_metrics(
    table: &PriceTable,
    benchmark: &PriceSeries,
    risk_free_rate: f64,
) -> Vec<RiskMetric> {
    let bench_returns = benchmark.daily_returns();
    let mut metrics = Vec::new();

    for (ticker, series) in table.iter() {
        let returns = series.daily_returns();
        let (asset, market) = align(&returns, &bench_returns);
        if asset.len() < 2 {
            debug!(
                "Excluding {ticker} from risk metrics: {} aligned observations",
                asset.len()
            );
            continue;
        }

        let market_variance = sample_variance(&market);
        let beta = if market_variance == 0.0 {
            0.0
        } else {
            sample_covariance(&asset, &market) / market_variance
        };

        let annual_volatility = sample_variance(&asset).sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
        let sharpe_ratio = if annual_volatility == 0.0 {
            0.0
        } else {
            (mean(&asset) * TRADING_DAYS_PER_YEAR - risk_free_rate) / annual_volatility
        };

        metrics.push(RiskMetric {
            ticker: ticker.clone(),
            beta,
            sharpe_ratio,
            annual_volatility,
        });
    }

    metrics
}

/// Portfolio-level beta and Sharpe ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioRisk {
    pub beta: f64,
    pub sharpe_ratio: f64,
}

/// Equal-weighted mean of the per-ticker metrics. A value-weighted mean
/// would track the actual holdings more closely; kept unweighted to match
/// the dashboard's established behavior.
pub fn aggregate_risk(metrics: &[RiskMetric]) -> Option<PortfolioRisk> {
    if metrics.is_empty() {
        return None;
    }
    let n = metrics.len() as f64;
    Some(PortfolioRisk {
        beta: metrics.iter().map(|m| m.beta).sum::<f64>() / n,
        sharpe_ratio: metrics.iter().map(|m| m.sharpe_ratio).sum::<f64>() / n,
    })
}

/// Pairwise Pearson correlation of daily returns. Each pair is aligned by
/// inner join independently; undefined pairs (too few shared dates or zero
/// variance) read as 0. The diagonal is always 1.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

pub fn correlation_matrix(table: &PriceTable) -> CorrelationMatrix {
    let tickers = table.tickers();
    let returns: Vec<Vec<(chrono::NaiveDate, f64)>> = tickers
        .iter()
        .map(|t| table.get(t).map(|s| s.daily_returns()).unwrap_or_default())
        .collect();

    let mut values = vec![vec![0.0; tickers.len()]; tickers.len()];
    for i in 0..tickers.len() {
        values[i][i] = 1.0;
        for j in (i + 1)..tickers.len() {
            let (a, b) = align(&returns[i], &returns[j]);
            let corr = if a.len() < 2 {
                0.0
            } else {
                let denom = (sample_variance(&a) * sample_variance(&b)).sqrt();
                if denom == 0.0 {
                    0.0
                } else {
                    sample_covariance(&a, &b) / denom
                }
            };
            values[i][j] = corr;
            values[j][i] = corr;
        }
    }

    CorrelationMatrix { tickers, values }
}

/// Valuation of a single held position at the latest fetched price.
#[derive(Debug, Clone)]
pub struct PositionValue {
    pub ticker: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub cost_basis: f64,
    pub price: Option<f64>,
    pub market_value: Option<f64>,
    pub unrealized_pl: Option<f64>,
    pub return_pct: Option<f64>,
    pub weight: Option<f64>,
}

/// Whole-portfolio valuation. Totals cover only positions with a resolved
/// price; unpriced positions surface as `None` fields and render as N/A.
#[derive(Debug)]
pub struct PortfolioValuation {
    pub positions: Vec<PositionValue>,
    pub total_value: f64,
    pub total_cost: f64,
    pub total_pl: f64,
    pub total_return_pct: Option<f64>,
    pub top_performer: Option<(String, f64)>,
}

pub fn value_portfolio(portfolio: &Portfolio, table: &PriceTable) -> PortfolioValuation {
    let mut positions = Vec::new();
    let mut total_value = 0.0;
    let mut total_cost = 0.0;

    for (ticker, position) in portfolio.iter() {
        let price = table.latest_price(ticker);
        let cost_basis = position.cost_basis();
        let market_value = price.map(|p| p * position.quantity);
        let unrealized_pl = market_value.map(|v| v - cost_basis);
        let return_pct = match (unrealized_pl, cost_basis) {
            (Some(pl), cost) if cost > 0.0 => Some(pl / cost * 100.0),
            (Some(_), _) => Some(0.0),
            (None, _) => None,
        };

        if let Some(value) = market_value {
            total_value += value;
            total_cost += cost_basis;
        } else {
            debug!("No price for {ticker}; excluded from portfolio totals");
        }

        positions.push(PositionValue {
            ticker: ticker.clone(),
            quantity: position.quantity,
            avg_cost: position.avg_cost,
            cost_basis,
            price,
            market_value,
            unrealized_pl,
            return_pct,
            weight: None,
        });
    }

    if total_value > 0.0 {
        for position in &mut positions {
            position.weight = position.market_value.map(|v| v / total_value * 100.0);
        }
    }

    let total_pl = total_value - total_cost;
    let total_return_pct = (total_cost > 0.0).then(|| total_pl / total_cost * 100.0);

    let top_performer = positions
        .iter()
        .filter_map(|p| p.return_pct.map(|r| (p.ticker.clone(), r)))
        .max_by(|a, b| a.1.total_cmp(&b.1));

    PortfolioValuation {
        positions,
        total_value,
        total_cost,
        total_pl,
        total_return_pct,
        top_performer,
    }
}

/// Value-weighted allocation of the portfolio across provider sectors.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorSlice {
    pub sector: String,
    pub value: f64,
    pub weight_pct: f64,
}

pub fn sector_allocation(
    valuation: &PortfolioValuation,
    sectors: &HashMap<String, String>,
) -> Vec<SectorSlice> {
    let mut by_sector: HashMap<String, f64> = HashMap::new();
    for position in &valuation.positions {
        let Some(value) = position.market_value else {
            continue;
        };
        let sector = sectors
            .get(&position.ticker)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        *by_sector.entry(sector).or_default() += value;
    }

    let total: f64 = by_sector.values().sum();
    let mut slices: Vec<SectorSlice> = by_sector
        .into_iter()
        .map(|(sector, value)| SectorSlice {
            sector,
            value,
            weight_pct: if total > 0.0 {
                value / total * 100.0
            } else {
                0.0
            },
        })
        .collect();
    slices.sort_by(|a, b| b.value.total_cmp(&a.value));
    slices
}

/// Moving-average crossover signal: bullish when the 50-day average sits
/// above the 200-day average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendSignal {
    Bullish,
    Bearish,
    InsufficientData,
}

impl TrendSignal {
    pub fn label(&self) -> &'static str {
        match self {
            TrendSignal::Bullish => "Bullish",
            TrendSignal::Bearish => "Bearish",
            TrendSignal::InsufficientData => "Not enough data",
        }
    }
}

pub fn trend_signal(series: &PriceSeries) -> TrendSignal {
    if series.len() <= 200 {
        return TrendSignal::InsufficientData;
    }
    match (series.moving_average(50), series.moving_average(200)) {
        (Some(ma50), Some(ma200)) if ma50 > ma200 => TrendSignal::Bullish,
        (Some(_), Some(_)) => TrendSignal::Bearish,
        _ => TrendSignal::InsufficientData,
    }
}
