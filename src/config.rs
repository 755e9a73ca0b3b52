use serde::Deserialize;
use validator::Validate;

/// Main configuration for the Leadline controller
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct Config {
    /// HTTP server port
    #[validate(range(min = 1024, max = 65535))]
    pub server_port: u16,

    /// Database URL (SeaORM / SQLite)
    pub database_url: String,

    /// Twilio REST API base URL (overridable for tests)
    pub twilio_api_url: String,

    /// Twilio account SID
    #[validate(length(min = 1))]
    pub twilio_account_sid: String,

    /// Twilio auth token
    #[validate(length(min = 1))]
    pub twilio_auth_token: String,

    /// Generative AI endpoint base URL (overridable for tests)
    pub ai_api_url: String,

    /// Generative AI API key
    pub ai_api_key: String,

    /// Model used for SMS replies
    pub ai_model: String,

    /// Optional shared secret required on webhook requests; unset disables
    /// the check
    pub webhook_token: Option<String>,

    /// Upper bound on the per-business greeting delay, in seconds
    #[validate(range(min = 0, max = 60))]
    pub greeting_delay_cap_secs: u64,

    /// Webhook rate limit in requests per minute. If `None`, defaults to 60.
    pub rate_limit_per_minute: Option<u32>,

    /// Log level (e.g., info, debug, trace)
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            // Core defaults
            .set_default("server_port", 8080)?
            .set_default("database_url", "sqlite://leadline.db")?
            .set_default("twilio_api_url", "https://api.twilio.com")?
            .set_default("twilio_account_sid", "")?
            .set_default("twilio_auth_token", "")?
            .set_default("ai_api_url", "https://generativelanguage.googleapis.com")?
            .set_default("ai_api_key", "")?
            .set_default("ai_model", "gemini-1.5-flash")?
            .set_default("greeting_delay_cap_secs", 5)?
            .set_default("rate_limit_per_minute", 60u32)?
            .set_default("log_level", "info")?
            // Load from ~/.leadline/config.toml (if present)
            .add_source(
                config::File::with_name(&format!(
                    "{}/.leadline/config",
                    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
                ))
                .required(false),
            )
            // Environment overrides: LEADLINE__SERVER_PORT, etc.
            .add_source(config::Environment::with_prefix("LEADLINE").separator("__"))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Returns the effective webhook rate limit (requests per minute).
    /// Defaults to 60 if not explicitly set.
    pub fn effective_rate_limit(&self) -> u32 {
        self.rate_limit_per_minute.unwrap_or(60)
    }
}
