use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// The root configuration structure for the entire application.
///
/// Every section falls back to its defaults, so an empty file (or none at all)
/// is a valid configuration as long as the database url is supplied when a
/// command needs the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub reporting: ReportingSettings,
    pub logging: LoggingSettings,
    pub auth: AuthSettings,
}

impl Config {
    /// Checks the values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let reporting = &self.reporting;
        if !(1..=12).contains(&reporting.fiscal_year_start_month) {
            return Err(ConfigError::ValidationError(format!(
                "reporting.fiscal_year_start_month must be between 1 and 12, got {}",
                reporting.fiscal_year_start_month
            )));
        }
        if reporting.chart_months == 0 {
            return Err(ConfigError::ValidationError(
                "reporting.chart_months must be at least 1".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError("server.port must not be 0".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed browser origins. A single `"*"` allows any origin.
    pub cors_origins: Vec<String>,
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".to_string()],
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

/// PostgreSQL pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            run_migrations: true,
        }
    }
}

impl DatabaseSettings {
    /// The connection url, or a validation error when none was configured.
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::ValidationError(
                "database.url is empty: set DATABASE_URL or LOYALTY__DATABASE__URL".to_string(),
            ));
        }
        Ok(url)
    }
}

/// How the dashboard figures are computed and rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingSettings {
    /// Calendar month (1-12) in which the fiscal year begins.
    pub fiscal_year_start_month: u32,
    pub currency_symbol: String,
    pub comparison_phrase: String,
    /// Number of trailing calendar months in the monthly chart series.
    pub chart_months: u32,
    /// Seconds between KPI pushes on the WebSocket feed. 0 disables them.
    pub push_interval_secs: u64,
}

impl Default for ReportingSettings {
    fn default() -> Self {
        Self {
            fiscal_year_start_month: 4,
            currency_symbol: "$".to_string(),
            comparison_phrase: "from last quarter".to_string(),
            chart_months: 12,
            push_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    pub filter: String,
    pub format: LogFormat,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Accepted API keys. An empty list disables authentication.
    pub api_keys: Vec<String>,
}
