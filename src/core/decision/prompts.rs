use crate::core::call::CallContext;
use crate::core::navigator::ActionRecord;

pub(super) const NAVIGATION_SYSTEM_PROMPT: &str = r#"You are navigating an automated phone menu (IVR) on behalf of a healthcare provider office.
You receive the most recent speech heard on the call, the goal of the call, which identifiers are on file, and the actions already taken.
Choose exactly one action and answer with a single JSON object:
{"action": "<type>", "value": "<digits, only for press_digit>", "confidence": <0.0-1.0, only for operator_detected>, "reason": "<short justification>"}

Action types:
- press_digit: press a menu option. "value" holds the keypad sequence (0-9, *, #).
- enter_npi: the system asks for the provider NPI or provider identifier.
- enter_member_id: the system asks for the member, subscriber or patient ID.
- enter_reference: the system asks for a claim, reference or authorization number.
- hold: the caller is being asked to hold or is waiting in a queue.
- operator_detected: a live human is speaking (greets you, introduces themself, asks how they can help).
- wait: the prompt is incomplete, unclear, or needs no input yet.

Rules, in priority order:
1. A request for data entry takes priority over menu options heard in the same text.
2. Only choose an enter_* action when that identifier is listed as available. Otherwise choose wait.
3. Hold or queue language ("please hold", "your estimated wait time", "calls are answered in the order received") is hold, even in the middle of a menu.
4. If the prompt is cut off or you are unsure, choose wait. Never guess a menu option.
5. Do not repeat an action already taken for the same prompt.
6. operator_detected requires a confidence; recorded messages and menus are never operators."#;

pub(super) const OPERATOR_SYSTEM_PROMPT: &str = r#"You decide whether a live human representative is speaking on a phone call that has been navigating an automated menu.
Be conservative. Recorded greetings, menus, hold messages, music announcements and automated confirmations are not a human.
Signs of a human: a personal introduction, a question addressed to the caller, natural back-and-forth phrasing.
Answer with a single JSON object: {"is_operator": true|false, "confidence": <0.0-1.0>, "reason": "<short justification>"}"#;

/// User message for a navigation decision. Identifier values are never included.
pub(super) fn navigation_prompt(
    transcript: &str,
    context: &CallContext,
    recent_actions: &[ActionRecord],
) -> String {
    let available = context.available_identifiers();
    let identifiers = if available.is_empty() {
        "none".to_string()
    } else {
        available
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let history = if recent_actions.is_empty() {
        "none".to_string()
    } else {
        recent_actions
            .iter()
            .map(|record| format!("- {} ({})", record.describe(), record.action.reason))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Call goal: {}\nIdentifiers available: {identifiers}\nActions already taken:\n{history}\n\nTranscript:\n\"{transcript}\"",
        context.purpose.description()
    )
}

pub(super) fn operator_prompt(transcript: &str, context: &CallContext) -> String {
    format!(
        "Call goal: {}\n\nTranscript:\n\"{transcript}\"",
        context.purpose.description()
    )
}
