use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IdentityProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for IdentityProviderConfig {
    fn default() -> Self {
        IdentityProviderConfig {
            base_url: "https://identitytoolkit.googleapis.com".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
    pub identity: Option<IdentityProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
            identity: Some(IdentityProviderConfig::default()),
        }
    }
}

fn default_benchmark() -> String {
    "^GSPC".to_string()
}

fn default_risk_free_rate() -> f64 {
    0.04
}

fn default_history_window_days() -> u32 {
    365
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Benchmark index for relative risk metrics.
    #[serde(default = "default_benchmark")]
    pub benchmark: String,
    /// Annualized risk-free rate used in the Sharpe ratio.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Trailing window of price history to fetch, in calendar days.
    #[serde(default = "default_history_window_days")]
    pub history_window_days: u32,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            benchmark: default_benchmark(),
            risk_free_rate: default_risk_free_rate(),
            history_window_days: default_history_window_days(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "finboard", "finboard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "finboard", "finboard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
