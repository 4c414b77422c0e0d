//! Core business logic abstractions

pub mod analytics;
pub mod auth;
pub mod config;
pub mod forecast;
pub mod log;
pub mod market;
pub mod portfolio;
pub mod store;

// Re-export main types for cleaner imports
pub use auth::{Account, IdentityProvider, Session};
pub use market::{MarketDataProvider, PriceSeries, PriceTable};
pub use portfolio::{Portfolio, Position};
pub use store::{DocumentStore, PortfolioStore, SessionStore};
