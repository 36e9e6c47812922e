//! `chatloop replay`: re-frame a captured response body.
//!
//! Splits the file into fixed-size pieces to mimic arbitrary network chunk
//! boundaries, then prints each event the parser accepts as one JSON line.

use std::path::Path;

use chatloop_core::Event;
use chatloop_transport::EventFramer;

pub fn run(file: &Path, chunk_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    if chunk_size == 0 {
        return Err("--chunk-size must be at least 1".into());
    }

    let body = std::fs::read(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let events = replay(&body, chunk_size);

    for event in &events {
        println!("{}", serde_json::to_string(event)?);
    }
    tracing::info!(
        events = events.len(),
        bytes = body.len(),
        chunk_size,
        "Replay finished"
    );

    Ok(())
}

fn replay(body: &[u8], chunk_size: usize) -> Vec<Event> {
    let mut framer = EventFramer::new();
    let mut frames = Vec::new();

    for piece in body.chunks(chunk_size) {
        frames.extend(framer.push(piece));
    }
    frames.extend(framer.finish());

    frames.iter().filter_map(|frame| Event::parse(frame)).collect()
}
