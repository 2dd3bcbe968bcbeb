use serde::{Deserialize, Serialize};

/// Why the call is being placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPurpose {
    StatusInquiry,
    EligibilityCheck,
    PriorAuthorization,
    Appeal,
    General,
}

impl CallPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPurpose::StatusInquiry => "status_inquiry",
            CallPurpose::EligibilityCheck => "eligibility_check",
            CallPurpose::PriorAuthorization => "prior_authorization",
            CallPurpose::Appeal => "appeal",
            CallPurpose::General => "general",
        }
    }

    /// Human readable goal used when describing the call to the decision function.
    pub fn description(&self) -> &'static str {
        match self {
            CallPurpose::StatusInquiry => "check the status of a claim",
            CallPurpose::EligibilityCheck => "verify member eligibility and benefits",
            CallPurpose::PriorAuthorization => "request or check a prior authorization",
            CallPurpose::Appeal => "file or follow up on an appeal",
            CallPurpose::General => "reach a representative for a general question",
        }
    }
}

impl std::fmt::Display for CallPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier the navigator may be asked to key in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    ProviderNpi,
    MemberId,
    ReferenceNumber,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::ProviderNpi => "provider_npi",
            IdentifierKind::MemberId => "member_id",
            IdentifierKind::ReferenceNumber => "reference_number",
        }
    }
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable per-call navigation context.
///
/// Every identifier is optional. A missing identifier is an expected state
/// and the navigator never invents a value for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub purpose: CallPurpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_npi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
}

impl CallContext {
    pub fn new(purpose: CallPurpose) -> Self {
        Self {
            purpose,
            provider_npi: None,
            member_id: None,
            reference_number: None,
        }
    }

    pub fn with_provider_npi(mut self, npi: impl Into<String>) -> Self {
        self.provider_npi = Some(npi.into());
        self
    }

    pub fn with_member_id(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    pub fn with_reference_number(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = Some(reference.into());
        self
    }

    pub fn identifier(&self, kind: IdentifierKind) -> Option<&str> {
        let value = match kind {
            IdentifierKind::ProviderNpi => self.provider_npi.as_deref(),
            IdentifierKind::MemberId => self.member_id.as_deref(),
            IdentifierKind::ReferenceNumber => self.reference_number.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    /// Keypad sequence for an identifier, or `None` when it is absent or has
    /// nothing that can be dialed.
    pub fn keypad_digits(&self, kind: IdentifierKind) -> Option<String> {
        let digits: String = self
            .identifier(kind)?
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '*' || *c == '#')
            .collect();
        (!digits.is_empty()).then_some(digits)
    }

    /// Identifiers present in this context, in a stable order.
    pub fn available_identifiers(&self) -> Vec<IdentifierKind> {
        [
            IdentifierKind::ProviderNpi,
            IdentifierKind::MemberId,
            IdentifierKind::ReferenceNumber,
        ]
        .into_iter()
        .filter(|kind| self.identifier(*kind).is_some())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_identifier_counts_as_absent() {
        let context = CallContext::new(CallPurpose::EligibilityCheck)
            .with_member_id("1234567890")
            .with_provider_npi("   ");

        assert_eq!(context.identifier(IdentifierKind::MemberId), Some("1234567890"));
        assert_eq!(context.identifier(IdentifierKind::ProviderNpi), None);
        assert_eq!(
            context.available_identifiers(),
            vec![IdentifierKind::MemberId]
        );
    }

    #[test]
    fn test_keypad_digits_strip_formatting() {
        let context = CallContext::new(CallPurpose::StatusInquiry)
            .with_reference_number("CLM-2024-0042")
            .with_member_id("ABC");

        assert_eq!(
            context.keypad_digits(IdentifierKind::ReferenceNumber),
            Some("20240042".to_string())
        );
        assert_eq!(context.keypad_digits(IdentifierKind::MemberId), None);
        assert_eq!(context.keypad_digits(IdentifierKind::ProviderNpi), None);
    }

    #[test]
    fn test_purpose_serde_names() {
        let purpose: CallPurpose = serde_json::from_str("\"prior_authorization\"").unwrap();
        assert_eq!(purpose, CallPurpose::PriorAuthorization);
        assert_eq!(
            serde_json::to_string(&CallPurpose::EligibilityCheck).unwrap(),
            "\"eligibility_check\""
        );
    }
}
