use crate::core::detector::DetectorConfig;
use crate::core::navigator::NavigatorConfig;

/// When auth is required an API secret must be configured.
pub fn validate_auth_required(
    auth_required: bool,
    auth_api_secret: &Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if auth_required && auth_api_secret.is_none() {
        return Err("When AUTH_REQUIRED=true, AUTH_API_SECRET must be configured".into());
    }
    Ok(())
}

/// Twilio credentials are all-or-nothing.
pub fn validate_twilio(
    account_sid: &Option<String>,
    auth_token: &Option<String>,
    from_number: &Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let present = [
        ("TWILIO_ACCOUNT_SID", account_sid.is_some()),
        ("TWILIO_AUTH_TOKEN", auth_token.is_some()),
        ("TWILIO_FROM_NUMBER", from_number.is_some()),
    ];

    if present.iter().any(|(_, set)| *set) {
        let missing: Vec<&str> = present
            .iter()
            .filter(|(_, set)| !*set)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "Incomplete Twilio configuration, missing: {}",
                missing.join(", ")
            )
            .into());
        }
    }

    Ok(())
}

pub fn validate_public_url(public_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let parsed =
        url::Url::parse(public_url).map_err(|e| format!("Invalid PUBLIC_URL '{public_url}': {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("PUBLIC_URL must use http or https, got '{other}'").into()),
    }
}

/// Thresholds are confidences and must lie in [0, 1].
pub fn validate_thresholds(
    navigator: &NavigatorConfig,
    detector: &DetectorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    for (name, value) in [
        ("navigation.operator_threshold", navigator.operator_threshold),
        ("navigation.backup.threshold", detector.threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("{name} must be between 0 and 1, got {value}").into());
        }
    }
    if navigator.tick_interval.is_zero() || detector.tick_interval.is_zero() {
        return Err("Tick intervals must be greater than zero".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_required_without_secret() {
        let result = validate_auth_required(true, &None);
        assert!(result.unwrap_err().to_string().contains("AUTH_API_SECRET"));

        assert!(validate_auth_required(true, &Some("secret".to_string())).is_ok());
        assert!(validate_auth_required(false, &None).is_ok());
    }

    #[test]
    fn test_partial_twilio_config() {
        let result = validate_twilio(&Some("AC1".to_string()), &None, &None);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("TWILIO_AUTH_TOKEN"));
        assert!(message.contains("TWILIO_FROM_NUMBER"));

        assert!(validate_twilio(&None, &None, &None).is_ok());
        assert!(
            validate_twilio(
                &Some("AC1".to_string()),
                &Some("t".to_string()),
                &Some("+15550001111".to_string())
            )
            .is_ok()
        );
    }

    #[test]
    fn test_public_url() {
        assert!(validate_public_url("https://calls.example.com").is_ok());
        assert!(validate_public_url("ftp://calls.example.com").is_err());
        assert!(validate_public_url("not a url").is_err());
    }

    #[test]
    fn test_thresholds_out_of_range() {
        let navigator = NavigatorConfig {
            operator_threshold: 1.5,
            ..NavigatorConfig::default()
        };
        let result = validate_thresholds(&navigator, &DetectorConfig::default());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("navigation.operator_threshold")
        );
    }
}
