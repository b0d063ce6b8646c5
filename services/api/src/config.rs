//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use crop_health_core::AlertSettings;
use cron::Schedule;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// The trigger used when `ALERT_SCHEDULE` is unset: every six hours, on the hour.
pub const DEFAULT_ALERT_SCHEDULE: &str = "0 */6 * * *";

/// Twilio's REST API root, used when `TWILIO_API_BASE` is unset.
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the HTTP mail provider used for email alerts.
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender: String,
}

/// Twilio credentials for the optional SMS channel.
#[derive(Clone, Debug)]
pub struct SmsConfig {
    /// Base URL of the Twilio REST API, without a trailing slash.
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub cors_origin: String,
    pub alert_schedule: Schedule,
    pub alerts: AlertSettings,
    pub mail: MailConfig,
    /// `Some` only when `ALERT_SMS_ENABLED` is true.
    pub sms: Option<SmsConfig>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", &or_default("BIND_ADDRESS", "0.0.0.0:3000"))?;
        let database_url = required("DATABASE_URL")?;
        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", &or_default("DB_MAX_CONNECTIONS", "5"))?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = or_default("CORS_ORIGIN", "http://localhost:5173");

        // --- Load Alert Job Settings ---
        let alert_schedule = parse_schedule(&or_default("ALERT_SCHEDULE", DEFAULT_ALERT_SCHEDULE))?;

        let window_hours: i64 = parse_var("ALERT_WINDOW_HOURS", &or_default("ALERT_WINDOW_HOURS", "24"))?;
        if window_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "ALERT_WINDOW_HOURS".to_string(),
                "must be a positive number of hours".to_string(),
            ));
        }
        let min_cluster_size = parse_var("ALERT_MIN_CLUSTER_SIZE", &or_default("ALERT_MIN_CLUSTER_SIZE", "2"))?;
        let max_concurrent_sends: usize =
            parse_var("ALERT_MAX_CONCURRENT_SENDS", &or_default("ALERT_MAX_CONCURRENT_SENDS", "8"))?;
        if max_concurrent_sends == 0 {
            return Err(ConfigError::InvalidValue(
                "ALERT_MAX_CONCURRENT_SENDS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let run_timeout_secs: u64 =
            parse_var("ALERT_RUN_TIMEOUT_SECS", &or_default("ALERT_RUN_TIMEOUT_SECS", "1800"))?;

        let alerts = AlertSettings {
            window: chrono::Duration::hours(window_hours),
            min_cluster_size,
            max_concurrent_sends,
            run_timeout: Duration::from_secs(run_timeout_secs),
        };

        // --- Load Notification Channel Settings ---
        let mail = MailConfig {
            api_url: or_default("MAIL_API_URL", "https://api.resend.com/emails"),
            api_key: required("MAIL_API_KEY")?,
            sender: required("MAIL_SENDER")?,
        };

        let sms_enabled: bool = parse_var("ALERT_SMS_ENABLED", &or_default("ALERT_SMS_ENABLED", "false"))?;
        let sms = if sms_enabled {
            Some(SmsConfig {
                api_base: or_default("TWILIO_API_BASE", DEFAULT_TWILIO_API_BASE)
                    .trim_end_matches('/')
                    .to_string(),
                account_sid: required("TWILIO_ACCOUNT_SID")?,
                auth_token: required("TWILIO_AUTH_TOKEN")?,
                from_number: required("TWILIO_FROM_NUMBER")?,
            })
        } else {
            None
        };

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            cors_origin,
            alert_schedule,
            alerts,
            mail,
            sms,
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

/// Parses a cron expression. Classic five-field expressions get a leading
/// seconds field of `0`.
pub fn parse_schedule(expression: &str) -> Result<Schedule, ConfigError> {
    let expression = expression.trim();
    let normalized = if expression.split_whitespace().count() == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    };
    Schedule::from_str(&normalized)
        .map_err(|e| ConfigError::InvalidValue("ALERT_SCHEDULE".to_string(), e.to_string()))
}
