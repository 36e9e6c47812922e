//! Response streaming sink: where partial answers go while a turn is in flight.

use serde::{Deserialize, Serialize};

/// One streamed fragment of the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamedResponse {
    pub content: String,
    pub chunk_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Starts at 1 and increases by one per fragment within an execution.
    pub chunk_id: u32,
}

/// Receives answer fragments in order.
pub trait ResponseStream: Send + Sync {
    fn execute(&self, response: StreamedResponse, options: StreamOptions);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResponseStream;

impl ResponseStream for NullResponseStream {
    fn execute(&self, _response: StreamedResponse, _options: StreamOptions) {}
}
