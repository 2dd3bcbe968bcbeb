//! Configuration module for the callpilot server
//!
//! Configuration is read from environment variables, optionally layered
//! under a YAML file. When a YAML file is given its values take priority
//! over the environment, which in turn overrides the defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Parsing helpers
//!
//! # Example
//! ```rust,no_run
//! use callpilot::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//!
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::detector::DetectorConfig;
use crate::core::navigator::NavigatorConfig;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub const DEFAULT_DECISION_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_DECISION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_DECISION_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_CALL_MAX_AGE_SECONDS: u64 = 3600;

/// Server configuration
///
/// Every external integration is optional. A missing integration disables
/// the features that depend on it instead of failing startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL for provider callbacks and media streams.
    pub public_url: String,
    pub call_max_age_seconds: u64,

    // Telephony (Twilio)
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,

    // Speech-to-text
    pub deepgram_api_key: Option<String>,

    // Decision function
    pub decision_api_key: Option<String>,
    pub decision_base_url: String,
    pub decision_model: String,
    pub decision_timeout_seconds: u64,

    // Downstream status consumer
    pub status_webhook_url: Option<String>,
    pub status_webhook_secret: Option<String>,

    // Loop tuning
    pub navigator: NavigatorConfig,
    pub detector: DetectorConfig,

    // Authentication
    pub auth_api_secret: Option<String>,
    pub auth_required: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            public_url: "http://localhost:3001".to_string(),
            call_max_age_seconds: DEFAULT_CALL_MAX_AGE_SECONDS,
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_from_number: None,
            deepgram_api_key: None,
            decision_api_key: None,
            decision_base_url: DEFAULT_DECISION_BASE_URL.to_string(),
            decision_model: DEFAULT_DECISION_MODEL.to_string(),
            decision_timeout_seconds: DEFAULT_DECISION_TIMEOUT_SECONDS,
            status_webhook_url: None,
            status_webhook_secret: None,
            navigator: NavigatorConfig::default(),
            detector: DetectorConfig::default(),
            auth_api_secret: None,
            auth_required: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable fallback
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables
    /// 3. Default values
    ///
    /// The `.env` file is not read here; only real environment variables
    /// fill in what the YAML file leaves out.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_auth_required(self.auth_required, &self.auth_api_secret)?;
        validation::validate_twilio(
            &self.twilio_account_sid,
            &self.twilio_auth_token,
            &self.twilio_from_number,
        )?;
        validation::validate_public_url(&self.public_url)?;
        validation::validate_thresholds(&self.navigator, &self.detector)?;
        Ok(())
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when all Twilio credentials are present.
    pub fn has_telephony(&self) -> bool {
        self.twilio_account_sid.is_some()
            && self.twilio_auth_token.is_some()
            && self.twilio_from_number.is_some()
    }

    pub fn has_api_secret_auth(&self) -> bool {
        self.auth_api_secret.is_some()
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_secs(self.decision_timeout_seconds)
    }

    pub fn call_max_age(&self) -> Duration {
        Duration::from_secs(self.call_max_age_seconds)
    }
}
