use serde::{Deserialize, Serialize};

use crate::core::call::IdentifierKind;

/// What the navigator decided to do with the current prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Press a keypad sequence, e.g. a menu option.
    PressDigit { digits: String },
    /// Key in one of the call's identifiers.
    EnterIdentifier { identifier: IdentifierKind },
    /// Prompt incomplete or unclear.
    Wait,
    /// Hold or queue language. Never dispatched.
    Hold,
    /// A human appears to be on the line.
    OperatorDetected { confidence: f32 },
}

impl ActionKind {
    /// Wire name of the action type.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::PressDigit { .. } => "press_digit",
            ActionKind::EnterIdentifier {
                identifier: IdentifierKind::ProviderNpi,
            } => "enter_npi",
            ActionKind::EnterIdentifier {
                identifier: IdentifierKind::MemberId,
            } => "enter_member_id",
            ActionKind::EnterIdentifier {
                identifier: IdentifierKind::ReferenceNumber,
            } => "enter_reference",
            ActionKind::Wait => "wait",
            ActionKind::Hold => "hold",
            ActionKind::OperatorDetected { .. } => "operator_detected",
        }
    }
}

/// An action plus the justification the decision function gave for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    pub reason: String,
}

impl Action {
    pub fn new(kind: ActionKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    pub fn wait(reason: impl Into<String>) -> Self {
        Self::new(ActionKind::Wait, reason)
    }

    pub fn press(digits: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            ActionKind::PressDigit {
                digits: digits.into(),
            },
            reason,
        )
    }

    pub fn enter(identifier: IdentifierKind, reason: impl Into<String>) -> Self {
        Self::new(ActionKind::EnterIdentifier { identifier }, reason)
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self::new(ActionKind::Hold, reason)
    }

    pub fn operator(confidence: f32, reason: impl Into<String>) -> Self {
        Self::new(ActionKind::OperatorDetected { confidence }, reason)
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Structured response expected from the decision function.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DecisionResponse {
    #[serde(alias = "type")]
    pub action: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl DecisionResponse {
    /// Convert into an [`Action`]. Anything unrecognized or incomplete becomes `Wait`.
    pub fn into_action(self) -> Action {
        let reason = self
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "no reason given".to_string());

        match self.action.trim().to_ascii_lowercase().as_str() {
            "press_digit" | "press_digits" | "press" => {
                match self.value.as_ref().and_then(keypad_value) {
                    Some(digits) => Action::press(digits, reason),
                    None => Action::wait(format!("press_digit without a usable value: {reason}")),
                }
            }
            "enter_npi" | "enter_provider_id" => Action::enter(IdentifierKind::ProviderNpi, reason),
            "enter_member_id" => Action::enter(IdentifierKind::MemberId, reason),
            "enter_reference" | "enter_reference_number" | "enter_claim_number" => {
                Action::enter(IdentifierKind::ReferenceNumber, reason)
            }
            "hold" | "on_hold" => Action::hold(reason),
            "operator_detected" | "operator" | "human_detected" => {
                match self.confidence.filter(|c| (0.0..=1.0).contains(c)) {
                    Some(confidence) => Action::operator(confidence, reason),
                    None => Action::wait(format!("operator_detected without valid confidence: {reason}")),
                }
            }
            "wait" => Action::wait(reason),
            other => Action::wait(format!("unrecognized action '{other}'")),
        }
    }
}

/// Parse raw decision-function output. Malformed output becomes `Wait`.
pub fn parse_decision(raw: &str) -> Action {
    match serde_json::from_str::<DecisionResponse>(strip_code_fence(raw)) {
        Ok(response) => response.into_action(),
        Err(e) => Action::wait(format!("unparseable decision response: {e}")),
    }
}

/// Model output sometimes wraps JSON in a markdown code fence.
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn keypad_value(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let valid = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || c == '*' || c == '#');
    valid.then_some(text)
}
