//! Response stream sinks.

use chatloop_core::{ResponseStream, StreamOptions, StreamedResponse};
use tokio::sync::mpsc;
use tracing::debug;

/// Forwards every streamed fragment into an unbounded channel.
///
/// Delivery is synchronous with the network read, so the channel must not
/// apply backpressure.
pub struct ChannelResponseStream {
    tx: mpsc::UnboundedSender<StreamedResponse>,
}

impl ChannelResponseStream {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamedResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResponseStream for ChannelResponseStream {
    fn execute(&self, response: StreamedResponse, options: StreamOptions) {
        if self.tx.send(response).is_err() {
            debug!(chunk_id = options.chunk_id, "Stream receiver dropped, discarding chunk");
        }
    }
}
