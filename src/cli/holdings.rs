use super::ui;
use crate::core::auth::Session;
use crate::core::market::MarketDataProvider;
use crate::core::portfolio::{Position, normalize_ticker};
use crate::core::store::PortfolioStore;
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use tracing::debug;

/// Adds a position, or replaces the existing one for the same ticker. The
/// ticker must resolve to retrievable market data before anything is saved.
pub async fn add(
    market: &dyn MarketDataProvider,
    portfolios: &PortfolioStore,
    session: &Session,
    ticker: &str,
    quantity: f64,
    cost: f64,
    window_days: u32,
) -> Result<()> {
    let ticker = normalize_ticker(ticker)?;
    let position = Position::new(quantity, cost)?;

    let resolvable = match market.history(&ticker, window_days).await {
        Ok(series) => !series.is_empty(),
        Err(e) => {
            debug!("Ticker validation fetch failed for {ticker}: {e}");
            false
        }
    };
    if !resolvable {
        bail!("Could not find ticker '{ticker}' on the market");
    }

    let mut portfolio = portfolios.get(&session.uid).await?;
    let replaced = portfolio.contains(&ticker);
    portfolio.upsert(ticker.clone(), position);
    portfolios
        .put(&session.uid, &portfolio)
        .await
        .context("Failed to save portfolio")?;

    let verb = if replaced { "Updated" } else { "Added" };
    println!(
        "{}",
        ui::style_text(
            &format!("{verb} {ticker} ({quantity} @ {cost:.2})"),
            ui::StyleType::TotalValue
        )
    );
    Ok(())
}

pub async fn remove(
    portfolios: &PortfolioStore,
    session: &Session,
    ticker: &str,
) -> Result<()> {
    let ticker = normalize_ticker(ticker)?;
    let mut portfolio = portfolios.get(&session.uid).await?;
    if portfolio.remove(&ticker).is_none() {
        bail!("No position in '{ticker}' to remove");
    }
    portfolios
        .put(&session.uid, &portfolio)
        .await
        .context("Failed to save portfolio")?;
    println!(
        "{}",
        ui::style_text(&format!("Removed {ticker}"), ui::StyleType::TotalValue)
    );
    Ok(())
}

pub async fn list(portfolios: &PortfolioStore, session: &Session) -> Result<()> {
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

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Quantity"),
        ui::header_cell("Avg Cost"),
        ui::header_cell("Invested"),
    ]);
    for (ticker, position) in portfolio.iter() {
        table.add_row(vec![
            Cell::new(ticker),
            ui::format_optional_cell(Some(position.quantity), |q| format!("{q:.2}")),
            ui::format_optional_cell(Some(position.avg_cost), |c| format!("{c:.2}")),
            ui::format_optional_cell(Some(position.cost_basis()), |v| format!("{v:.2}")),
        ]);
    }
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::market::PriceSeries;
    use crate::core::store::PortfolioStore;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Arc;

    struct StubMarket;

    #[async_trait]
    impl MarketDataProvider for StubMarket {
        async fn history(&self, symbol: &str, _window_days: u32) -> Result<PriceSeries> {
            match symbol {
                "AAPL" => Ok(PriceSeries::from_points(vec![
                    ("2024-01-01".parse::<NaiveDate>().unwrap(), 180.0),
                    ("2024-01-02".parse::<NaiveDate>().unwrap(), 200.0),
                ])),
                "GHOST" => Ok(PriceSeries::new()),
                _ => bail!("no data"),
            }
        }

        async fn sector(&self, _symbol: &str) -> Result<String> {
            Ok("Unknown".to_string())
        }
    }

    fn session() -> Session {
        Session {
            token: "tok".to_string(),
            uid: "u1".to_string(),
            email: "user@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_normalizes_and_persists() {
        let portfolios = PortfolioStore::new(Arc::new(MemoryStore::new()));
        add(&StubMarket, &portfolios, &session(), "aapl", 10.0, 150.0, 365)
            .await
            .unwrap();

        let portfolio = portfolios.get("u1").await.unwrap();
        let position = portfolio.get("AAPL").unwrap();
        assert_eq!(position.quantity, 10.0);
        assert_eq!(position.avg_cost, 150.0);
    }

    #[tokio::test]
    async fn test_add_rejects_unresolvable_ticker() {
        let portfolios = PortfolioStore::new(Arc::new(MemoryStore::new()));
        for ticker in ["GHOST", "NOPE"] {
            let result = add(&StubMarket, &portfolios, &session(), ticker, 1.0, 1.0, 365).await;
            assert!(result.is_err());
            assert!(
                result
                    .unwrap_err()
                    .to_string()
                    .contains("Could not find ticker")
            );
        }
        assert!(portfolios.get("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_quantity() {
        let portfolios = PortfolioStore::new(Arc::new(MemoryStore::new()));
        let result = add(&StubMarket, &portfolios, &session(), "AAPL", 0.0, 1.0, 365).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_remove_round_trip() {
        let portfolios = PortfolioStore::new(Arc::new(MemoryStore::new()));
        add(&StubMarket, &portfolios, &session(), "AAPL", 10.0, 150.0, 365)
            .await
            .unwrap();

        remove(&portfolios, &session(), "aapl").await.unwrap();
        assert!(portfolios.get("u1").await.unwrap().is_empty());

        let result = remove(&portfolios, &session(), "AAPL").await;
        assert!(result.is_err());
    }
}
