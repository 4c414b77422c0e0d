//! Portfolio and position types, plus the persisted document schema

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Current persisted schema version. Version 1 was a plain list of ticker
/// symbols with no quantity or cost information.
pub const SCHEMA_VERSION: u32 = 2;

/// A single holding: share count and average cost per share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: f64,
    pub avg_cost: f64,
}

impl Position {
    pub fn new(quantity: f64, avg_cost: f64) -> Result<Self> {
        if !quantity.is_finite() || quantity <= 0.0 {
            bail!("Quantity must be a positive number, got {quantity}");
        }
        if !avg_cost.is_finite() || avg_cost < 0.0 {
            bail!("Average cost must be non-negative, got {avg_cost}");
        }
        Ok(Self { quantity, avg_cost })
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.avg_cost
    }
}

/// Normalizes a user-entered ticker symbol to its canonical uppercase form.
pub fn normalize_ticker(ticker: &str) -> Result<String> {
    let normalized = ticker.trim().to_uppercase();
    if normalized.is_empty() {
        bail!("Ticker symbol must not be empty");
    }
    Ok(normalized)
}

/// Mapping from ticker to position, owned by exactly one user. Tickers are
/// unique by construction; an empty portfolio is valid and means "no
/// holdings yet".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    positions: BTreeMap<String, Position>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn tickers(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    pub fn get(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Position)> {
        self.positions.iter()
    }

    /// Inserts or replaces the position for a ticker.
    pub fn upsert(&mut self, ticker: String, position: Position) {
        self.positions.insert(ticker, position);
    }

    pub fn remove(&mut self, ticker: &str) -> Option<Position> {
        self.positions.remove(ticker)
    }
}

/// Persisted envelope for a portfolio document.
#[derive(Debug, Serialize, Deserialize)]
struct PortfolioDoc {
    version: u32,
    positions: BTreeMap<String, Position>,
}

/// Decodes a stored portfolio document, upgrading the legacy "list of
/// tickers" shape in the process.
///
/// Returns the portfolio and whether a schema upgrade happened; callers are
/// expected to write the upgraded shape back so the migration runs once.
/// This is the only place that understands the legacy format.
pub fn decode_document(raw: &[u8]) -> Result<(Portfolio, bool)> {
    if let Ok(doc) = serde_json::from_slice::<PortfolioDoc>(raw) {
        if doc.version > SCHEMA_VERSION {
            bail!(
                "Portfolio document version {} is newer than supported version {}",
                doc.version,
                SCHEMA_VERSION
            );
        }
        return Ok((
            Portfolio {
                positions: doc.positions,
            },
            false,
        ));
    }

    // Legacy shape: a bare JSON array of ticker symbols. Holdings gain a
    // nominal quantity of 1 and an unknown cost basis.
    let tickers: Vec<String> = serde_json::from_slice(raw)?;
    debug!("Upgrading legacy portfolio document with {} tickers", tickers.len());
    let mut portfolio = Portfolio::new();
    for ticker in tickers {
        let ticker = normalize_ticker(&ticker)?;
        portfolio.upsert(
            ticker,
            Position {
                quantity: 1.0,
                avg_cost: 0.0,
            },
        );
    }
    Ok((portfolio, true))
}

pub fn encode_document(portfolio: &Portfolio) -> Result<Vec<u8>> {
    let doc = PortfolioDoc {
        version: SCHEMA_VERSION,
        positions: portfolio.positions.clone(),
    };
    Ok(serde_json::to_vec(&doc)?)
}
