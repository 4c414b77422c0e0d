use super::ui;
use crate::core::analytics::{aggregate_risk, compute_risk_metrics, correlation_matrix};
use crate::core::auth::Session;
use crate::core::market::{MarketDataProvider, fetch_price_table};
use crate::core::store::PortfolioStore;
use anyhow::Result;
use comfy_table::Cell;
use tracing::{info, warn};

/// Risk metrics against the benchmark plus a return correlation matrix.
pub async fn run(
    market: &dyn MarketDataProvider,
    portfolios: &PortfolioStore,
    session: &Session,
    benchmark: &str,
    risk_free_rate: f64,
    window_days: u32,
) -> Result<()> {
    let portfolio = portfolios.get(&session.uid).await?;
    if portfolio.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "Your portfolio is empty. Add a holding with `finboard add`.",
                ui::StyleType::Subtle
            )
        );
        return Ok(());
    }

    let tickers = portfolio.tickers();
    info!("Analyzing {} holdings against {benchmark}", tickers.len());

    let pb = ui::new_progress_bar(tickers.len() as u64 + 1, true);
    pb.set_message("Fetching market data");
    let table = fetch_price_table(market, &tickers, window_days, &|| pb.inc(1)).await;
    let benchmark_series = market
        .history(benchmark, window_days)
        .await
        .unwrap_or_default();
    pb.finish_and_clear();

    if table.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "No price history could be fetched for any holding.",
                ui::StyleType::Error
            )
        );
        return Ok(());
    }

    if benchmark_series.is_empty() {
        warn!("No price history for benchmark {benchmark}");
        println!(
            "{}",
            ui::style_text(
                &format!("Could not fetch benchmark data for {benchmark}; skipping risk metrics."),
                ui::StyleType::Error
            )
        );
    } else {
        let metrics = compute_risk_metrics(&table, &benchmark_series, risk_free_rate);

        println!(
            "\n{}",
            ui::style_text(
                &format!("Risk metrics vs {benchmark}"),
                ui::StyleType::Title
            )
        );
        let mut metrics_table = ui::new_styled_table();
        metrics_table.set_header(vec![
            ui::header_cell("Ticker"),
            ui::header_cell("Beta"),
            ui::header_cell("Sharpe"),
            ui::header_cell("Volatility"),
            ui::header_cell("Total Return"),
        ]);
        for metric in &metrics {
            let total_return = table.get(&metric.ticker).and_then(|s| s.total_return_pct());
            metrics_table.add_row(vec![
                Cell::new(&metric.ticker),
                ui::format_optional_cell(Some(metric.beta), |b| format!("{b:.2}")),
                ui::format_optional_cell(Some(metric.sharpe_ratio), |s| format!("{s:.2}")),
                ui::format_optional_cell(Some(metric.annual_volatility), |v| {
                    format!("{:.1}%", v * 100.0)
                }),
                match total_return {
                    Some(pct) => ui::change_cell(pct),
                    None => ui::format_optional_cell(None::<f64>, |v| format!("{v:.2}")),
                },
            ]);
        }
        println!("{metrics_table}");

        let analyzed: Vec<&str> = metrics.iter().map(|m| m.ticker.as_str()).collect();
        let skipped: Vec<String> = tickers
            .iter()
            .filter(|t| !analyzed.contains(&t.as_str()))
            .cloned()
            .collect();
        if !skipped.is_empty() {
            println!(
                "{}",
                ui::style_text(
                    &format!("Not enough data to analyze: {}", skipped.join(", ")),
                    ui::StyleType::Subtle
                )
            );
        }

        if let Some(risk) = aggregate_risk(&metrics) {
            println!(
                "{} beta {:.2}, Sharpe {:.2}",
                ui::style_text("Portfolio:", ui::StyleType::TotalLabel),
                risk.beta,
                risk.sharpe_ratio
            );
        }
    }

    let matrix = correlation_matrix(&table);
    if matrix.tickers.len() > 1 {
        ui::print_separator();
        println!(
            "{}",
            ui::style_text("Return correlation", ui::StyleType::Title)
        );
        let mut corr_table = ui::new_styled_table();
        let mut header = vec![ui::header_cell("")];
        header.extend(matrix.tickers.iter().map(|t| ui::header_cell(t)));
        corr_table.set_header(header);
        for (i, ticker) in matrix.tickers.iter().enumerate() {
            let mut row = vec![ui::header_cell(ticker)];
            row.extend(
                matrix.values[i]
                    .iter()
                    .map(|v| ui::format_optional_cell(Some(*v), |c| format!("{c:.2}"))),
            );
            corr_table.add_row(row);
        }
        println!("{corr_table}");
    }

    Ok(())
}
