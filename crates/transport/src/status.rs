//! Maps a non-success HTTP status onto the transport error taxonomy.

use chatloop_core::TransportError;

/// `Ok(())` for 2xx; otherwise the matching `TransportError`.
pub fn classify_status(status: u16, body: String) -> Result<(), TransportError> {
    match status {
        200..=299 => Ok(()),
        _ => Err(status_error(status, body)),
    }
}

/// The error for a response that did not succeed.
///
/// 403 is a missing entitlement, other 4xx are client errors, 5xx are
/// server errors. Anything else (0, 1xx, 3xx) means the exchange itself
/// broke down.
pub fn status_error(status: u16, body: String) -> TransportError {
    match status {
        403 => TransportError::Forbidden { body },
        400..=499 => TransportError::Client { status, body },
        500..=599 => TransportError::Server { status, body },
        _ => TransportError::Connection(format!("unexpected HTTP status {status}")),
    }
}
