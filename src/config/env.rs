use super::ServerConfig;
use super::merge::merge_config;

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Also loads a `.env` file from the working directory if present.
    ///
    /// # Errors
    /// Returns an error if a numeric variable is malformed or the resulting
    /// configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let _ = dotenvy::dotenv();

        let config = merge_config(None)?;
        config.validate()?;
        Ok(config)
    }
}
