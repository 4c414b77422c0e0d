use super::ui;
use crate::core::analytics::{sector_allocation, trend_signal, value_portfolio};
use crate::core::auth::Session;
use crate::core::market::{MarketDataProvider, fetch_price_table, fetch_sectors};
use crate::core::store::PortfolioStore;
use anyhow::Result;
use comfy_table::Cell;
use tracing::info;

/// Net worth, per-position performance and sector allocation in one view.
pub async fn show(
    market: &dyn MarketDataProvider,
    portfolios: &PortfolioStore,
    session: &Session,
    window_days: u32,
) -> Result<()> {
    let portfolio = portfolios.get(&session.uid).await?;
    if portfolio.is_empty() {
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "Welcome, {}! Your portfolio is empty. Add a holding with `finboard add`.",
                    session.email
                ),
                ui::StyleType::Subtle
            )
        );
        return Ok(());
    }

    let tickers = portfolio.tickers();
    info!("Fetching prices for {} holdings", tickers.len());
    let pb = ui::new_progress_bar(tickers.len() as u64, true);
    pb.set_message("Fetching market data");
    let table = fetch_price_table(market, &tickers, window_days, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    let valuation = value_portfolio(&portfolio, &table);
    let sectors = fetch_sectors(market, &tickers).await;

    println!(
        "\n{}",
        ui::style_text(&format!("Portfolio of {}", session.email), ui::StyleType::Title)
    );
    println!(
        "{} {}",
        ui::style_text("Net worth:", ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{:.2}", valuation.total_value),
            ui::StyleType::TotalValue
        )
    );

    let mut holdings_table = ui::new_styled_table();
    holdings_table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Qty"),
        ui::header_cell("Avg Cost"),
        ui::header_cell("Price"),
        ui::header_cell("Value"),
        ui::header_cell("P/L"),
        ui::header_cell("Return"),
        ui::header_cell("Weight"),
        ui::header_cell("Trend"),
    ]);
    for position in &valuation.positions {
        let trend = table
            .get(&position.ticker)
            .map(trend_signal)
            .map(|s| s.label().to_string());
        holdings_table.add_row(vec![
            Cell::new(&position.ticker),
            ui::format_optional_cell(Some(position.quantity), |q| format!("{q:.2}")),
            ui::format_optional_cell(Some(position.avg_cost), |c| format!("{c:.2}")),
            ui::format_optional_cell(position.price, |p| format!("{p:.2}")),
            ui::format_optional_cell(position.market_value, |v| format!("{v:.2}")),
            ui::format_optional_cell(position.unrealized_pl, |pl| format!("{pl:.2}")),
            match position.return_pct {
                Some(pct) => ui::change_cell(pct),
                None => ui::format_optional_cell(None::<f64>, |v| format!("{v:.2}")),
            },
            ui::format_optional_cell(position.weight, |w| format!("{w:.1}%")),
            ui::format_optional_cell(trend, |t| t),
        ]);
    }
    println!("{holdings_table}");

    println!(
        "{} {} ({})",
        ui::style_text("Total P/L:", ui::StyleType::TotalLabel),
        format_args!("{:.2}", valuation.total_pl),
        valuation
            .total_return_pct
            .map_or_else(|| "N/A".to_string(), |r| format!("{r:.2}%"))
    );
    if let Some((ticker, return_pct)) = &valuation.top_performer {
        println!(
            "{} {ticker} ({return_pct:.2}%)",
            ui::style_text("Top performer:", ui::StyleType::TotalLabel)
        );
    }

    let slices = sector_allocation(&valuation, &sectors);
    if !slices.is_empty() {
        ui::print_separator();
        println!(
            "{}",
            ui::style_text("Sector allocation", ui::StyleType::Title)
        );
        let mut sector_table = ui::new_styled_table();
        sector_table.set_header(vec![
            ui::header_cell("Sector"),
            ui::header_cell("Value"),
            ui::header_cell("Weight"),
        ]);
        for slice in &slices {
            sector_table.add_row(vec![
                Cell::new(&slice.sector),
                ui::format_optional_cell(Some(slice.value), |v| format!("{v:.2}")),
                ui::format_optional_cell(Some(slice.weight_pct), |w| format!("{w:.1}%")),
            ]);
        }
        println!("{sector_table}");
    }

    Ok(())
}
