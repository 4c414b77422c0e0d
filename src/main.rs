use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use finboard::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for finboard::AppCommand {
    fn from(cmd: Commands) -> finboard::AppCommand {
        match cmd {
            Commands::Register => finboard::AppCommand::Register,
            Commands::Login => finboard::AppCommand::Login,
            Commands::Logout => finboard::AppCommand::Logout,
            Commands::Dashboard => finboard::AppCommand::Dashboard,
            Commands::Analyze => finboard::AppCommand::Analyze,
            Commands::Forecast { ticker, days } => finboard::AppCommand::Forecast { ticker, days },
            Commands::Add {
                ticker,
                quantity,
                cost,
            } => finboard::AppCommand::Add {
                ticker,
                quantity,
                cost,
            },
            Commands::Remove { ticker } => finboard::AppCommand::Remove { ticker },
            Commands::List => finboard::AppCommand::List,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Create a new account
    Register,
    /// Sign in and store a session
    Login,
    /// Sign out and clear the stored session
    Logout,
    /// Display net worth, holdings and sector allocation
    Dashboard,
    /// Display risk metrics and return correlations
    Analyze,
    /// Project a holding's price into the future
    Forecast {
        /// Ticker symbol to forecast
        ticker: String,
        /// Days ahead to project
        #[arg(short, long, default_value_t = finboard::core::forecast::DEFAULT_HORIZON_DAYS)]
        days: u32,
    },
    /// Add or update a holding
    Add {
        /// Ticker symbol
        ticker: String,
        /// Number of units held
        quantity: f64,
        /// Average cost per unit
        cost: f64,
    },
    /// Remove a holding
    Remove {
        /// Ticker symbol
        ticker: String,
    },
    /// List holdings without fetching prices
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => finboard::cli::setup::setup(),
        Some(cmd) => finboard::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
