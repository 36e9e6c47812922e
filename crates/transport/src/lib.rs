//! Step transport for chatloop.
//!
//! Sends each turn's `StepRequest` to the agent gateway as a JSON POST and
//! turns the chunked response body back into ordered `Event`s:
//!
//! - [`framer`] reassembles delimited units from arbitrary byte chunks
//! - [`status`] classifies failed responses
//! - [`executor`] drives one request and keeps the execution's scratchpad
//! - [`client`] builds executors from configuration

pub mod client;
pub mod executor;
pub mod framer;
pub mod status;

pub use client::GatewayClient;
pub use executor::StepExecutor;
pub use framer::EventFramer;
pub use status::{classify_status, status_error};
