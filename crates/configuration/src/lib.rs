use crate::error::ConfigError;

use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AuthSettings, Config, DatabaseSettings, LogFormat, LoggingSettings, ReportingSettings, ServerSettings,
};

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "LOYALTY";

/// Loads the application configuration.
///
/// Sources, lowest precedence first:
/// 1. built-in defaults,
/// 2. the TOML file at `path` (required) or `config.toml` (optional),
/// 3. `LOYALTY__SECTION__KEY` environment variables,
/// 4. `DATABASE_URL`, also read from a `.env` file.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Ok(env_file) = dotenvy::dotenv() {
        tracing::debug!(path = %env_file.display(), "loaded .env file");
    }

    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    build_config(file, environment(), std::env::var("DATABASE_URL").ok())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("server.cors_origins")
        .with_list_parse_key("auth.api_keys")
        .try_parsing(true)
}

fn build_config<S>(
    file: S,
    env: config::Environment,
    database_url: Option<String>,
) -> Result<Config, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let mut builder = config::Config::builder().add_source(file).add_source(env);
    if let Some(url) = database_url {
        builder = builder.set_override("database.url", url)?;
    }

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.build()?.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
