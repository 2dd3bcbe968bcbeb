use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional. Anything left out falls back to the
/// environment and then to the defaults.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   public_url: "https://callpilot.example.com"
///   call_max_age_seconds: 3600
///
/// telephony:
///   account_sid: "AC..."
///   auth_token: "..."
///   from_number: "+15550001111"
///
/// providers:
///   deepgram_api_key: "your-deepgram-key"
///
/// decision:
///   api_key: "sk-..."
///   base_url: "https://api.openai.com/v1"
///   model: "gpt-4o-mini"
///   timeout_seconds: 10
///
/// status:
///   webhook_url: "https://backend.example.com/call-status"
///   webhook_secret: "signing-secret"
///
/// navigation:
///   tick_interval_ms: 3000
///   buffer_horizon_ms: 15000
///   min_transcript_chars: 10
///   debounce_ms: 2000
///   action_cooldown_ms: 2000
///   operator_threshold: 0.85
///   history_limit: 10
///   backup:
///     tick_interval_ms: 5000
///     buffer_horizon_ms: 30000
///     min_transcript_chars: 20
///     threshold: 0.7
///
/// auth:
///   required: true
///   api_secret: "your-api-secret"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub telephony: Option<TelephonyYaml>,
    pub providers: Option<ProvidersYaml>,
    pub decision: Option<DecisionYaml>,
    pub status: Option<StatusYaml>,
    pub navigation: Option<NavigationYaml>,
    pub auth: Option<AuthYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
    pub call_max_age_seconds: Option<u64>,
}

/// Twilio credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TelephonyYaml {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub deepgram_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DecisionYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StatusYaml {
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
}

/// Navigator tuning. Only configurable from YAML.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NavigationYaml {
    pub tick_interval_ms: Option<u64>,
    pub buffer_horizon_ms: Option<u64>,
    pub min_transcript_chars: Option<usize>,
    pub debounce_ms: Option<u64>,
    pub action_cooldown_ms: Option<u64>,
    pub operator_threshold: Option<f32>,
    pub history_limit: Option<usize>,
    pub backup: Option<BackupYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BackupYaml {
    pub tick_interval_ms: Option<u64>,
    pub buffer_horizon_ms: Option<u64>,
    pub min_transcript_chars: Option<usize>,
    pub threshold: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthYaml {
    pub required: Option<bool>,
    pub api_secret: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  public_url: "https://calls.example.com"

telephony:
  account_sid: "AC123"
  auth_token: "token"
  from_number: "+15550001111"

decision:
  api_key: "sk-test"
  model: "gpt-4o"

navigation:
  tick_interval_ms: 1000
  operator_threshold: 0.9
  backup:
    threshold: 0.75

auth:
  required: true
  api_secret: "secret"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(
            config.telephony.unwrap().account_sid.as_deref(),
            Some("AC123")
        );
        assert_eq!(config.decision.unwrap().model.as_deref(), Some("gpt-4o"));

        let navigation = config.navigation.unwrap();
        assert_eq!(navigation.tick_interval_ms, Some(1000));
        assert_eq!(navigation.operator_threshold, Some(0.9));
        assert_eq!(navigation.backup.unwrap().threshold, Some(0.75));
        assert_eq!(config.auth.unwrap().required, Some(true));
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("").unwrap();

        assert!(config.server.is_none());
        assert!(config.telephony.is_none());
        assert!(config.navigation.is_none());
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "server:\n  port: 3000\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(config.server.unwrap().port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let result = YamlConfig::from_file(&PathBuf::from("/nonexistent/config.yaml"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "server:\n  port: [not, a, port]\n").unwrap();

        let result = YamlConfig::from_file(&config_path);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML config")
        );
    }
}
