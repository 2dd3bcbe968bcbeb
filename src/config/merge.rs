use std::env;

use super::ServerConfig;
use super::utils::{millis, non_empty, parse_bool, parse_number};
use super::yaml::YamlConfig;
use crate::core::detector::DetectorConfig;
use crate::core::navigator::NavigatorConfig;

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
///
/// Loop tuning has no environment variables and comes from YAML only.
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();
    let defaults = ServerConfig::default();

    // YAML > ENV > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            non_empty($yaml_value)
                .or_else(|| non_empty(env::var($env_var).ok()))
                .unwrap_or_else(|| $default.to_string())
        };
    }

    // YAML > ENV
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            non_empty($yaml_value).or_else(|| non_empty(env::var($env_var).ok()))
        };
    }

    // YAML > ENV > Default, parsed
    macro_rules! get_number {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match $yaml_value {
                Some(value) => value,
                None => match non_empty(env::var($env_var).ok()) {
                    Some(raw) => parse_number($env_var, &raw)?,
                    None => $default,
                },
            }
        };
    }

    let server = yaml.server.unwrap_or_default();
    let host = get_value!("HOST", server.host, defaults.host);
    let port = get_number!("PORT", server.port, defaults.port);
    let public_url = get_value!("PUBLIC_URL", server.public_url, defaults.public_url);
    let call_max_age_seconds = get_number!(
        "CALL_MAX_AGE_SECONDS",
        server.call_max_age_seconds,
        defaults.call_max_age_seconds
    );

    let telephony = yaml.telephony.unwrap_or_default();
    let twilio_account_sid = get_optional!("TWILIO_ACCOUNT_SID", telephony.account_sid);
    let twilio_auth_token = get_optional!("TWILIO_AUTH_TOKEN", telephony.auth_token);
    let twilio_from_number = get_optional!("TWILIO_FROM_NUMBER", telephony.from_number);

    let providers = yaml.providers.unwrap_or_default();
    let deepgram_api_key = get_optional!("DEEPGRAM_API_KEY", providers.deepgram_api_key);

    let decision = yaml.decision.unwrap_or_default();
    let decision_api_key = get_optional!("DECISION_API_KEY", decision.api_key);
    let decision_base_url = get_value!(
        "DECISION_BASE_URL",
        decision.base_url,
        defaults.decision_base_url
    );
    let decision_model = get_value!("DECISION_MODEL", decision.model, defaults.decision_model);
    let decision_timeout_seconds = get_number!(
        "DECISION_TIMEOUT_SECONDS",
        decision.timeout_seconds,
        defaults.decision_timeout_seconds
    );

    let status = yaml.status.unwrap_or_default();
    let status_webhook_url = get_optional!("STATUS_WEBHOOK_URL", status.webhook_url);
    let status_webhook_secret = get_optional!("STATUS_WEBHOOK_SECRET", status.webhook_secret);

    let auth = yaml.auth.unwrap_or_default();
    let auth_api_secret = get_optional!("AUTH_API_SECRET", auth.api_secret);
    let auth_required = match auth.required {
        Some(required) => required,
        None => env::var("AUTH_REQUIRED")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(false),
    };

    let (navigator, detector) = loop_tuning(&yaml.navigation.unwrap_or_default());

    Ok(ServerConfig {
        host,
        port,
        public_url,
        call_max_age_seconds,
        twilio_account_sid,
        twilio_auth_token,
        twilio_from_number,
        deepgram_api_key,
        decision_api_key,
        decision_base_url,
        decision_model,
        decision_timeout_seconds,
        status_webhook_url,
        status_webhook_secret,
        navigator,
        detector,
        auth_api_secret,
        auth_required,
    })
}

fn loop_tuning(navigation: &super::yaml::NavigationYaml) -> (NavigatorConfig, DetectorConfig) {
    let nav_defaults = NavigatorConfig::default();
    let navigator = NavigatorConfig {
        tick_interval: navigation
            .tick_interval_ms
            .map(millis)
            .unwrap_or(nav_defaults.tick_interval),
        buffer_horizon: navigation
            .buffer_horizon_ms
            .map(millis)
            .unwrap_or(nav_defaults.buffer_horizon),
        min_transcript_chars: navigation
            .min_transcript_chars
            .unwrap_or(nav_defaults.min_transcript_chars),
        debounce: navigation
            .debounce_ms
            .map(millis)
            .unwrap_or(nav_defaults.debounce),
        action_cooldown: navigation
            .action_cooldown_ms
            .map(millis)
            .unwrap_or(nav_defaults.action_cooldown),
        operator_threshold: navigation
            .operator_threshold
            .unwrap_or(nav_defaults.operator_threshold),
        history_limit: navigation
            .history_limit
            .unwrap_or(nav_defaults.history_limit),
        context_actions: nav_defaults.context_actions,
    };

    let backup = navigation.backup.clone().unwrap_or_default();
    let det_defaults = DetectorConfig::default();
    let detector = DetectorConfig {
        tick_interval: backup
            .tick_interval_ms
            .map(millis)
            .unwrap_or(det_defaults.tick_interval),
        buffer_horizon: backup
            .buffer_horizon_ms
            .map(millis)
            .unwrap_or(det_defaults.buffer_horizon),
        min_transcript_chars: backup
            .min_transcript_chars
            .unwrap_or(det_defaults.min_transcript_chars),
        threshold: backup.threshold.unwrap_or(det_defaults.threshold),
    };

    (navigator, detector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::{DecisionYaml, ServerYaml};
    use serial_test::serial;
    use std::time::Duration;

    fn cleanup_env_vars() {
        unsafe {
            for var in [
                "HOST",
                "PORT",
                "PUBLIC_URL",
                "DECISION_MODEL",
                "DECISION_TIMEOUT_SECONDS",
                "DEEPGRAM_API_KEY",
                "AUTH_REQUIRED",
            ] {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_merge_defaults() {
        cleanup_env_vars();

        let config = merge_config(None).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.decision_model, "gpt-4o-mini");
        assert_eq!(config.navigator, NavigatorConfig::default());
        assert_eq!(config.detector, DetectorConfig::default());
    }

    #[test]
    #[serial]
    fn test_yaml_takes_priority_over_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "4000");
            env::set_var("HOST", "10.0.0.1");
            env::set_var("DECISION_MODEL", "env-model");
        }

        let yaml = YamlConfig {
            server: Some(ServerYaml {
                port: Some(5000),
                ..Default::default()
            }),
            decision: Some(DecisionYaml {
                model: Some("yaml-model".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.decision_model, "yaml-model");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_env_number() {
        cleanup_env_vars();
        unsafe {
            env::set_var("DECISION_TIMEOUT_SECONDS", "soon");
        }

        let result = merge_config(None);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("DECISION_TIMEOUT_SECONDS")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_empty_env_is_unset() {
        cleanup_env_vars();
        unsafe {
            env::set_var("DEEPGRAM_API_KEY", "");
        }

        let config = merge_config(None).unwrap();
        assert!(config.deepgram_api_key.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_navigation_tuning_from_yaml() {
        cleanup_env_vars();

        let yaml: YamlConfig = serde_yaml::from_str(
            r#"
navigation:
  tick_interval_ms: 1500
  operator_threshold: 0.9
  backup:
    min_transcript_chars: 40
"#,
        )
        .unwrap();

        let config = merge_config(Some(yaml)).unwrap();
        assert_eq!(config.navigator.tick_interval, Duration::from_millis(1500));
        assert_eq!(config.navigator.operator_threshold, 0.9);
        assert_eq!(config.navigator.debounce, Duration::from_secs(2));
        assert_eq!(config.detector.min_transcript_chars, 40);
        assert_eq!(config.detector.tick_interval, Duration::from_secs(5));
    }
}
