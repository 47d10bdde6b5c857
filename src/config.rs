use crate::services::attendance::AttendancePeriod;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::env;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config/dlob";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub billing: BillingConfig,
    pub attendance: AttendanceConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origin: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            run_migrations: true,
        }
    }
}

/// Supabase signs access tokens with the project's JWT secret (HS256).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub audience: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            audience: "authenticated".to_string(),
        }
    }
}

/// Fee table in the smallest currency unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub session_fee: i64,
    pub shuttlecock_price: i64,
    pub daily_reversal_fee: i64,
    pub four_saturday_fee: i64,
    pub five_saturday_fee: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            session_fee: 18_000,
            shuttlecock_price: 12_000,
            daily_reversal_fee: 23_000,
            four_saturday_fee: 40_000,
            five_saturday_fee: 45_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttendancePeriodKind {
    #[default]
    CurrentMonth,
    TrailingMonths,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    pub period: AttendancePeriodKind,
    pub trailing_months: u32,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            period: AttendancePeriodKind::CurrentMonth,
            trailing_months: 3,
        }
    }
}

impl AttendanceConfig {
    pub fn period(&self) -> AttendancePeriod {
        match self.period {
            AttendancePeriodKind::CurrentMonth => AttendancePeriod::CurrentMonth,
            AttendancePeriodKind::TrailingMonths => {
                AttendancePeriod::TrailingMonths(self.trailing_months.max(1))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: None,
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Loads `config/dlob.toml` (or `$DLOB_CONFIG`) and `DLOB__*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("DLOB_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let builder = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("DLOB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config = Self::from_builder(builder)?;

        // Supabase tooling exports these names; accept them when the prefixed ones are absent.
        if config.database.url.is_empty() {
            if let Ok(url) = env::var("DATABASE_URL") {
                config.database.url = url;
            }
        }
        if config.auth.jwt_secret.is_empty() {
            if let Ok(secret) = env::var("SUPABASE_JWT_SECRET") {
                config.auth.jwt_secret = secret;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize::<AppConfig>()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::Missing("database.url"));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("auth.jwt_secret"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sources_fall_back_to_defaults() {
        let config = AppConfig::from_builder(Config::builder()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.billing.session_fee, 18_000);
        assert_eq!(config.billing.four_saturday_fee, 40_000);
        assert_eq!(config.billing.five_saturday_fee, 45_000);
        assert_eq!(config.attendance.period(), AttendancePeriod::CurrentMonth);
        assert_eq!(config.auth.audience, "authenticated");
    }

    #[test]
    fn overrides_replace_single_fields() {
        let builder = Config::builder()
            .set_override("billing.session_fee", 20_000)
            .unwrap()
            .set_override("attendance.period", "trailing_months")
            .unwrap();
        let config = AppConfig::from_builder(builder).unwrap();

        assert_eq!(config.billing.session_fee, 20_000);
        assert_eq!(config.billing.shuttlecock_price, 12_000);
        assert_eq!(config.attendance.period(), AttendancePeriod::TrailingMonths(3));
    }

    #[test]
    fn validate_reports_missing_database_url() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("database.url"))
        ));
    }
}
