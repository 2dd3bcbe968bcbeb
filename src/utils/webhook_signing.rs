//! HMAC-SHA256 signing for outbound webhooks.
//!
//! The canonical string is `v1:{timestamp}:{event_id}:{payload}`. Receivers
//! recompute it from the `X-Callpilot-Timestamp` and `X-Callpilot-Event-Id`
//! headers plus the raw body and compare against `X-Callpilot-Signature`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Callpilot-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Callpilot-Timestamp";
pub const EVENT_ID_HEADER: &str = "X-Callpilot-Event-Id";
pub const SIGNATURE_VERSION_HEADER: &str = "X-Callpilot-Signature-Version";

/// Compute the hex HMAC over the canonical string.
pub fn compute_signature(
    secret: &str,
    timestamp: u64,
    event_id: &str,
    payload: &str,
) -> Result<String, String> {
    let canonical = format!("v1:{timestamp}:{event_id}:{payload}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| format!("HMAC initialization failed: {e}"))?;
    mac.update(canonical.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Headers to attach to a signed webhook request.
pub fn signing_headers(
    secret: &str,
    timestamp: u64,
    event_id: &str,
    payload: &str,
) -> Result<Vec<(&'static str, String)>, String> {
    let signature = compute_signature(secret, timestamp, event_id, payload)?;
    Ok(vec![
        (SIGNATURE_HEADER, format!("v1={signature}")),
        (TIMESTAMP_HEADER, timestamp.to_string()),
        (EVENT_ID_HEADER, event_id.to_string()),
        (SIGNATURE_VERSION_HEADER, "v1".to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic_hex() {
        let a = compute_signature("secret", 1700000000, "evt-1", r#"{"status":"on_hold"}"#).unwrap();
        let b = compute_signature("secret", 1700000000, "evt-1", r#"{"status":"on_hold"}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_changes_with_any_input() {
        let base = compute_signature("secret", 1, "evt", "{}").unwrap();
        assert_ne!(base, compute_signature("other", 1, "evt", "{}").unwrap());
        assert_ne!(base, compute_signature("secret", 2, "evt", "{}").unwrap());
        assert_ne!(base, compute_signature("secret", 1, "evt2", "{}").unwrap());
        assert_ne!(base, compute_signature("secret", 1, "evt", "[]").unwrap());
    }

    #[test]
    fn test_signing_headers() {
        let headers = signing_headers("secret", 42, "evt-9", "{}").unwrap();
        assert_eq!(headers[0].0, SIGNATURE_HEADER);
        assert!(headers[0].1.starts_with("v1="));
        assert_eq!(headers[1], (TIMESTAMP_HEADER, "42".to_string()));
        assert_eq!(headers[2], (EVENT_ID_HEADER, "evt-9".to_string()));
    }
}
