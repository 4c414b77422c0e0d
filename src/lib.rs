pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::core::config::AppConfig;
use crate::core::store::{DocumentStore, PortfolioStore, SessionStore};
use crate::providers::firebase_auth::FirebaseIdentityProvider;
use crate::providers::yahoo_finance::YahooMarketProvider;
use crate::store::disk::FjallStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Register,
    Login,
    Logout,
    Dashboard,
    Analyze,
    Forecast { ticker: String, days: u32 },
    Add { ticker: String, quantity: f64, cost: f64 },
    Remove { ticker: String },
    List,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("finboard starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let yahoo_base_url = config
        .providers
        .yahoo
        .as_ref()
        .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);
    let market = YahooMarketProvider::new(yahoo_base_url);

    let identity_config = config.providers.identity.clone().unwrap_or_default();
    let identity =
        FirebaseIdentityProvider::new(&identity_config.base_url, &identity_config.api_key);

    let store_path = config.default_data_path()?.join("store");
    let store: Arc<dyn DocumentStore> = Arc::new(
        FjallStore::open(&store_path)
            .with_context(|| format!("Failed to open data store at {}", store_path.display()))?,
    );
    let portfolios = PortfolioStore::new(store.clone());
    let sessions = SessionStore::new(store);

    match command {
        AppCommand::Register => cli::auth::register(&identity).await,
        AppCommand::Login => cli::auth::login(&identity, &sessions).await,
        AppCommand::Logout => cli::auth::logout(&sessions).await,
        AppCommand::Dashboard => {
            let session = cli::auth::require_session(&identity, &sessions).await?;
            cli::dashboard::show(&market, &portfolios, &session, config.history_window_days).await
        }
        AppCommand::Analyze => {
            let session = cli::auth::require_session(&identity, &sessions).await?;
            cli::analyze::run(
                &market,
                &portfolios,
                &session,
                &config.benchmark,
                config.risk_free_rate,
                config.history_window_days,
            )
            .await
        }
        AppCommand::Forecast { ticker, days } => {
            let session = cli::auth::require_session(&identity, &sessions).await?;
            cli::forecast::run(
                &market,
                &portfolios,
                &session,
                &ticker,
                days,
                config.history_window_days,
            )
            .await
        }
        AppCommand::Add { ticker, quantity, cost } => {
            let session = cli::auth::require_session(&identity, &sessions).await?;
            cli::holdings::add(
                &market,
                &portfolios,
                &session,
                &ticker,
                quantity,
                cost,
                config.history_window_days,
            )
            .await
        }
        AppCommand::Remove { ticker } => {
            let session = cli::auth::require_session(&identity, &sessions).await?;
            cli::holdings::remove(&portfolios, &session, &ticker).await
        }
        AppCommand::List => {
            let session = cli::auth::require_session(&identity, &sessions).await?;
            cli::holdings::list(&portfolios, &session).await
        }
    }
}
