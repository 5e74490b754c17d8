//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;

/// Placeholder values shipped in .env.example; treated the same as unset.
const STRIPE_KEY_PLACEHOLDER: &str = "sk_test_your_stripe_secret_key";
const WEBHOOK_SECRET_PLACEHOLDER: &str = "whsec_your_webhook_secret";

pub const DEFAULT_FROM_ADDRESS: &str = "noreply@vignettelab.com";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stripe: StripeConfig,
    pub email: EmailConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

/// Stripe configuration
///
/// The request timeout bounds every outbound Stripe call so a hung upstream
/// produces a clean 504 instead of a platform-level abort.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base_url: String,
    pub api_version: String,
    pub request_timeout: u64, // seconds
}

/// Transactional email (Resend) configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub resend_api_key: String,
    /// Sender and admin notification address
    pub admin_email: String,
    /// Public app URL, used to build checkout redirect URLs
    pub app_url: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            stripe: StripeConfig::from_env()?,
            email: EmailConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Validate the entire configuration; called once at startup so missing
    /// or placeholder secrets fail fast instead of on first use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.stripe.validate()?;
        self.email.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("PORT cannot be 0".to_string()));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue("HOST cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl StripeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(StripeConfig {
            secret_key: env::var("STRIPE_SECRET_KEY")
                .map_err(|_| ConfigError::MissingVariable("STRIPE_SECRET_KEY".to_string()))?,
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .map_err(|_| ConfigError::MissingVariable("STRIPE_WEBHOOK_SECRET".to_string()))?,
            api_base_url: env::var("STRIPE_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            api_version: env::var("STRIPE_API_VERSION")
                .unwrap_or_else(|_| "2026-01-28.clover".to_string()),
            request_timeout: env::var("STRIPE_REQUEST_TIMEOUT")
                .unwrap_or_else(|_| "25".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STRIPE_REQUEST_TIMEOUT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.is_empty() || self.secret_key == STRIPE_KEY_PLACEHOLDER {
            return Err(ConfigError::MissingVariable(
                "STRIPE_SECRET_KEY is not configured".to_string(),
            ));
        }

        if self.webhook_secret.is_empty() || self.webhook_secret == WEBHOOK_SECRET_PLACEHOLDER {
            return Err(ConfigError::MissingVariable(
                "STRIPE_WEBHOOK_SECRET is not configured".to_string(),
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "STRIPE_REQUEST_TIMEOUT".to_string(),
            ));
        }

        Ok(())
    }
}

impl EmailConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(EmailConfig {
            resend_api_key: env::var("RESEND_API_KEY")
                .map_err(|_| ConfigError::MissingVariable("RESEND_API_KEY".to_string()))?,
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resend_api_key.is_empty() {
            return Err(ConfigError::MissingVariable(
                "RESEND_API_KEY is not configured".to_string(),
            ));
        }

        if !self.app_url.starts_with("http://") && !self.app_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "APP_URL must be a valid URL".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether a real admin notification address has been configured
    /// (the contact form refuses to relay to the default sender).
    pub fn has_admin_address(&self) -> bool {
        !self.admin_email.is_empty() && self.admin_email != DEFAULT_FROM_ADDRESS
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
