//! Classification of protocol-level `error` events.
//!
//! The gateway reports failures as free text. The orchestrator only needs
//! to tell a handful of cases apart; everything else is generic.

use chatloop_core::AgentEventErrorKind;
use once_cell::sync::Lazy;
use regex::Regex;

static PROMPT_TOO_LONG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)prompt is too long|prompt too long|maximum context length|too many tokens|\d+\s+tokens\s*>\s*\d+\s+maximum",
    )
    .expect("prompt length regex should be valid")
});

static LICENSE_MISMATCH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btool not available\b").expect("license mismatch regex should be valid")
});

/// What the orchestrator does with one `error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    /// Spend one retry and run the same turn again.
    Retry,
    /// End the execution with this classification.
    Fail(AgentEventErrorKind),
}

pub fn is_prompt_too_long(message: &str) -> bool {
    PROMPT_TOO_LONG_REGEX.is_match(message)
}

pub fn is_license_mismatch(message: &str) -> bool {
    LICENSE_MISMATCH_REGEX.is_match(message)
}

/// Decide how to handle an `error` event.
///
/// Checked in order: prompt length, retryability against the remaining
/// budget, license mismatch, then generic.
pub fn decide(message: &str, retryable: bool, retries_left: u32) -> ErrorDecision {
    if is_prompt_too_long(message) {
        return ErrorDecision::Fail(AgentEventErrorKind::PromptTooLong);
    }

    if retryable {
        return if retries_left > 0 {
            ErrorDecision::Retry
        } else {
            ErrorDecision::Fail(AgentEventErrorKind::RetriesExhausted)
        };
    }

    if is_license_mismatch(message) {
        return ErrorDecision::Fail(AgentEventErrorKind::LicenseMismatch);
    }

    ErrorDecision::Fail(AgentEventErrorKind::Generic)
}
