use std::env;
use std::time::Duration;

use chrono::FixedOffset;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub swagger: SwaggerConfig,
    pub decision: DecisionConfig,
    pub mailer: MailerConfig,
    pub triage: TriageConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Gemini text-completion service used for triage decisions
#[derive(Debug, Clone)]
pub struct DecisionConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Upper bound for one decision round trip
    pub timeout: Duration,
    pub temperature: f32,
}

/// Outbound email service
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// When unset, notifications are only written to the log
    pub service_url: Option<String>,
    pub service_token: String,
    pub from_address: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Operator-provided preamble placed at the top of the system context
    pub system_prompt: String,
    /// Maximum number of prior sessions rendered into the context
    pub history_limit: i64,
    /// Local time zone of the clinic; queue days start at local midnight
    pub queue_offset: FixedOffset,
}

/// Parses a numeric variable, falling back to `default` when unset
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            decision: DecisionConfig::from_env()?,
            mailer: MailerConfig::from_env()?,
            triage: TriageConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_PORT: u16 = 3000;
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("PORT", Self::DEFAULT_PORT)?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size =
            parse_var("MAX_REQUEST_BODY_SIZE", Self::DEFAULT_MAX_REQUEST_BODY_SIZE)?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_var("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_var("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_var(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_var("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_var("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Triana API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Patient intake, triage and queue API".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl DecisionConfig {
    const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_TEMPERATURE: f32 = 0.8;

    pub fn from_env() -> Result<Self, String> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| "GEMINI_API_KEY environment variable is required".to_string())?;
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());
        let base_url =
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());
        let timeout_secs = parse_var("DECISION_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)?;
        let temperature = parse_var("DECISION_TEMPERATURE", Self::DEFAULT_TEMPERATURE)?;

        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
            temperature,
        })
    }
}

impl MailerConfig {
    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn from_env() -> Result<Self, String> {
        let service_url = env::var("MAIL_SERVICE_URL").ok().filter(|s| !s.is_empty());
        let service_token = env::var("MAIL_SERVICE_TOKEN").unwrap_or_default();
        let from_address =
            env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@triana.local".to_string());
        let timeout_secs = parse_var("NOTIFY_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            service_url,
            service_token,
            from_address,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl TriageConfig {
    const DEFAULT_HISTORY_LIMIT: i64 = 5;
    const DEFAULT_QUEUE_UTC_OFFSET_HOURS: i32 = 7; // WIB

    pub fn from_env() -> Result<Self, String> {
        let system_prompt = env::var("TRIAGE_SYSTEM_PROMPT").unwrap_or_else(|_| {
            "You are Triana, a hospital intake assistant. Ask short follow-up questions \
             about the patient's complaint and, once you have enough information, refer \
             the patient to exactly one doctor from the directory."
                .to_string()
        });
        let history_limit = parse_var("TRIAGE_HISTORY_LIMIT", Self::DEFAULT_HISTORY_LIMIT)?;
        let offset_hours =
            parse_var("QUEUE_UTC_OFFSET_HOURS", Self::DEFAULT_QUEUE_UTC_OFFSET_HOURS)?;

        Ok(Self {
            system_prompt,
            history_limit: history_limit.max(0),
            queue_offset: offset_from_hours(offset_hours)?,
        })
    }
}

/// Converts a whole-hour UTC offset into a `FixedOffset`
pub fn offset_from_hours(hours: i32) -> Result<FixedOffset, String> {
    FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| format!("QUEUE_UTC_OFFSET_HOURS out of range: {}", hours))
}
