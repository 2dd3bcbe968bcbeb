//! Phone number validation for outbound dialing and handoff.
//!
//! Numbers are normalized to E.164 (`+` followed by 8 to 15 digits). Common
//! formatting characters are stripped, and bare 10-digit North American
//! numbers get a `+1` country code.

const FORMATTING_CHARS: &[char] = &[' ', '-', '.', '(', ')'];

/// Validates a phone number and returns it in E.164 form.
///
/// # Examples
///
/// ```
/// use callpilot::utils::phone_validation::validate_phone_number;
///
/// assert_eq!(validate_phone_number("+1 (555) 010-2000").unwrap(), "+15550102000");
/// assert_eq!(validate_phone_number("5550102000").unwrap(), "+15550102000");
/// assert!(validate_phone_number("123abc").is_err());
/// ```
pub fn validate_phone_number(phone: &str) -> Result<String, String> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err("Phone number cannot be empty".to_string());
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| !FORMATTING_CHARS.contains(c))
        .collect();

    let (has_plus, digits) = match compact.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, compact.as_str()),
    };

    if let Some((i, ch)) = digits.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        return Err(format!(
            "Invalid character '{}' at position {} - only digits, formatting characters and a leading '+' are allowed",
            ch,
            i + usize::from(has_plus)
        ));
    }

    let normalized = if has_plus {
        digits.to_string()
    } else if digits.len() == 10 {
        format!("1{digits}")
    } else if digits.len() == 11 && digits.starts_with('1') {
        digits.to_string()
    } else {
        return Err(
            "Phone number must include a country code (E.164, e.g. +15550102000)".to_string(),
        );
    };

    if !(8..=15).contains(&normalized.len()) {
        return Err(format!(
            "Phone number must have 8 to 15 digits, got {}",
            normalized.len()
        ));
    }
    if normalized.starts_with('0') {
        return Err("Country code cannot start with 0".to_string());
    }

    Ok(format!("+{normalized}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_numbers() {
        assert_eq!(validate_phone_number("+15550102000").unwrap(), "+15550102000");
        assert_eq!(validate_phone_number("+44 20 7946 0958").unwrap(), "+442079460958");
        assert_eq!(validate_phone_number(" (555) 010-2000 ").unwrap(), "+15550102000");
        assert_eq!(validate_phone_number("1-555-010-2000").unwrap(), "+15550102000");
    }

    #[test]
    fn test_empty() {
        assert!(validate_phone_number("").is_err());
        assert!(validate_phone_number("   ").is_err());
        assert!(validate_phone_number("+").is_err());
    }

    #[test]
    fn test_invalid_characters() {
        let err = validate_phone_number("+1555abc2000").unwrap_err();
        assert!(err.contains("'a'"));
        assert!(validate_phone_number("+1555+0102000").is_err());
    }

    #[test]
    fn test_length_and_country_code() {
        assert!(validate_phone_number("+1234567").is_err());
        assert!(validate_phone_number("+1234567890123456").is_err());
        assert!(validate_phone_number("+0123456789").is_err());
        assert!(validate_phone_number("123456").is_err());
    }
}
