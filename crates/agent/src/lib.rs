//! The ReAct loop: the heart of chatloop.
//!
//! The executor follows a **Thought → Action → Observation** cycle:
//!
//! 1. **Build** the turn request (history, user message, scratchpad)
//! 2. **Stream** the gateway's events, forwarding answer deltas as they arrive
//! 3. **If an action**: run the named tool and attach its output as the
//!    observation, then loop back to step 1
//! 4. **If answer deltas**: return the concatenated text to the caller
//!
//! The loop ends on a final answer, an unrecoverable error, or when the
//! iteration limit is reached. Failures become apology answers with stable
//! error codes; `execute` itself never fails.

pub mod policy;
pub mod react;
pub mod request;
pub mod sanitize;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use policy::ErrorDecision;
pub use react::{
    FIRST_TOKEN_APDEX_THRESHOLD, MAX_ITERATIONS, MAX_RETRY_STEP_FORWARD, ReactExecutor,
};
pub use request::RequestBuilder;
pub use sanitize::LinkSanitizer;
pub use sink::ChannelResponseStream;
