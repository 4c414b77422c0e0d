use super::ui;
use crate::core::auth::Session;
use crate::core::forecast::{ForecastOutcome, Forecaster, TrendSeasonalModel};
use crate::core::market::MarketDataProvider;
use crate::core::portfolio::normalize_ticker;
use crate::core::store::PortfolioStore;
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use tracing::info;

/// Projects a held ticker's price `days` into the future with confidence
/// bounds.
pub async fn run(
    market: &dyn MarketDataProvider,
    portfolios: &PortfolioStore,
    session: &Session,
    ticker: &str,
    days: u32,
    window_days: u32,
) -> Result<()> {
    let ticker = normalize_ticker(ticker)?;
    let portfolio = portfolios.get(&session.uid).await?;
    if !portfolio.contains(&ticker) {
        bail!("No position in '{ticker}'. Add it first with `finboard add`.");
    }

    info!("Forecasting {ticker} {days} days ahead");
    let series = market
        .history(&ticker, window_days)
        .await
        .with_context(|| format!("Could not fetch price history for {ticker}"))?;

    let model = TrendSeasonalModel::default();
    match model.forecast(&series, days)? {
        ForecastOutcome::Unavailable { reason } => {
            println!(
                "{}",
                ui::style_text(
                    &format!("No forecast for {ticker}: {reason}."),
                    ui::StyleType::Error
                )
            );
        }
        ForecastOutcome::Available(points) => {
            println!(
                "\n{}",
                ui::style_text(
                    &format!("{ticker} forecast, next {days} days"),
                    ui::StyleType::Title
                )
            );
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("Date"),
                ui::header_cell("Predicted"),
                ui::header_cell("Lower"),
                ui::header_cell("Upper"),
            ]);
            for point in &points {
                table.add_row(vec![
                    Cell::new(point.date.format("%Y-%m-%d").to_string()),
                    ui::format_optional_cell(Some(point.predicted), |v| format!("{v:.2}")),
                    ui::format_optional_cell(Some(point.lower), |v| format!("{v:.2}")),
                    ui::format_optional_cell(Some(point.upper), |v| format!("{v:.2}")),
                ]);
            }
            println!("{table}");
            println!(
                "{}",
                ui::style_text(
                    "Trend extrapolation with a 95% band. Not investment advice.",
                    ui::StyleType::Subtle
                )
            );
        }
    }

    Ok(())
}
