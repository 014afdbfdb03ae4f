use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::probation::{ChatId, DeadlineMode, PollingUnit, SweepConfig};

const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scheduler: SchedulerConfig,
    pub telegram: TelegramConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let include_targets = env::var("APP_LOG_TARGETS")
            .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                include_targets,
            },
            scheduler: SchedulerConfig::from_env()?,
            telegram: TelegramConfig::from_env(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub include_targets: bool,
}

/// Cadence and deadline policy of the probation sweep.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub volunteer_chat_id: ChatId,
    pub deadline_unit: PollingUnit,
    pub deadline_mode: DeadlineMode,
    pub seed_path: Option<PathBuf>,
}

impl SchedulerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let volunteer_chat_id = env::var("SHELTER_VOLUNTEER_CHAT_ID")
            .map_err(|_| ConfigError::MissingVar("SHELTER_VOLUNTEER_CHAT_ID"))?
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| ConfigError::InvalidVolunteerChatId)?;

        let interval_secs = env::var("SHELTER_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidSweepInterval)?;

        let deadline_unit = match env::var("SHELTER_DEADLINE_UNIT") {
            Ok(raw) => PollingUnit::parse(&raw).ok_or(ConfigError::InvalidDeadlineUnit(raw))?,
            Err(_) => PollingUnit::Day,
        };

        let deadline_mode = match env::var("SHELTER_DEADLINE_MODE") {
            Ok(raw) => DeadlineMode::parse(&raw).ok_or(ConfigError::InvalidDeadlineMode(raw))?,
            Err(_) => DeadlineMode::Window,
        };

        let seed_path = env::var("SHELTER_SEED_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            volunteer_chat_id,
            deadline_unit,
            deadline_mode,
            seed_path,
        })
    }

    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            volunteer_chat_id: self.volunteer_chat_id,
            deadline_unit: self.deadline_unit,
            deadline_mode: self.deadline_mode,
        }
    }
}

/// Bot API credentials. Without a token notifications are only logged.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_base: String,
}

impl TelegramConfig {
    fn from_env() -> Self {
        let bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        let api_base = env::var("TELEGRAM_API_BASE")
            .unwrap_or_else(|_| DEFAULT_TELEGRAM_API_BASE.to_string());
        Self {
            bot_token,
            api_base,
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingVar(&'static str),
    InvalidVolunteerChatId,
    InvalidSweepInterval,
    InvalidDeadlineUnit(String),
    InvalidDeadlineMode(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingVar(name) => write!(f, "{name} must be set"),
            ConfigError::InvalidVolunteerChatId => {
                write!(f, "SHELTER_VOLUNTEER_CHAT_ID must be a valid i64 chat id")
            }
            ConfigError::InvalidSweepInterval => {
                write!(f, "SHELTER_SWEEP_INTERVAL_SECS must be a positive integer")
            }
            ConfigError::InvalidDeadlineUnit(raw) => write!(
                f,
                "SHELTER_DEADLINE_UNIT '{raw}' is not one of minute, hour, day"
            ),
            ConfigError::InvalidDeadlineMode(raw) => write!(
                f,
                "SHELTER_DEADLINE_MODE '{raw}' is not one of window, catch-up"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
