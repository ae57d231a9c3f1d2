//! Process settings.
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file
//! (`config/ledger.toml` or `--config`), `LEDGER__*` environment variables
//! (`LEDGER__SERVER__BIND=0.0.0.0:8080`), then command line flags.

use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use engine::{CacheSettings, EngineSettings, LedgerCache, ReportStrategy};
use serde::Deserialize;
use server::ServerConfig;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config/ledger.toml";
const ENV_PREFIX: &str = "LEDGER";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct App {
    /// Log level for the workspace crates.
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub report_timeout_ms: u64,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            report_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    #[default]
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub enabled: bool,
    pub report_ttl_secs: u64,
    pub budgets_ttl_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            enabled: true,
            report_ttl_secs: 30,
            budgets_ttl_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Engine {
    pub report_strategy: ReportStrategy,
    pub heartbeat_ms: u64,
    pub warning_threshold: f64,
    pub serialize_budget_checks: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            report_strategy: ReportStrategy::Grouped,
            heartbeat_ms: 400,
            warning_threshold: 80.0,
            serialize_budget_checks: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub database: Database,
    pub cache: Cache,
    pub engine: Engine,
}

#[derive(Debug, Default, Parser)]
#[command(name = "ledger", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the listen address (e.g. 0.0.0.0:3000).
    #[arg(long)]
    bind: Option<String>,
    /// Override the log level.
    #[arg(long)]
    level: Option<String>,
    /// Use a SQLite file instead of the configured database.
    #[arg(long)]
    sqlite: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, SettingsError> {
        Self::load(Args::parse())
    }

    fn load(args: Args) -> Result<Self, SettingsError> {
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let builder = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        let mut settings = Self::from_builder(builder)?;

        if let Some(bind) = args.bind {
            settings.server.bind = bind;
        }
        if let Some(level) = args.level {
            settings.app.level = level;
        }
        if let Some(path) = args.sqlite {
            settings.database = Database::Sqlite(path);
        }

        settings.validate()?;
        Ok(settings)
    }

    fn from_builder(builder: config::ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.server.report_timeout_ms == 0 {
            return Err(SettingsError::Invalid(
                "server.report_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.engine.heartbeat_ms == 0 {
            return Err(SettingsError::Invalid(
                "engine.heartbeat_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.engine.warning_threshold > 0.0 && self.engine.warning_threshold <= 100.0) {
            return Err(SettingsError::Invalid(format!(
                "engine.warning_threshold must be within (0, 100], got {}",
                self.engine.warning_threshold
            )));
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            report_strategy: self.engine.report_strategy,
            heartbeat_interval: Duration::from_millis(self.engine.heartbeat_ms),
            warning_threshold: self.engine.warning_threshold,
            serialize_budget_checks: self.engine.serialize_budget_checks,
        }
    }

    pub fn ledger_cache(&self) -> LedgerCache {
        if !self.cache.enabled {
            return LedgerCache::disabled();
        }
        LedgerCache::in_memory(CacheSettings {
            report_ttl: Duration::from_secs(self.cache.report_ttl_secs),
            budgets_ttl: Duration::from_secs(self.cache.budgets_ttl_secs),
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind: self.server.bind.clone(),
            report_timeout: Duration::from_millis(self.server.report_timeout_ms),
        }
    }
}
