use serde::Serialize;

/// Payload of one SSE event: a full, ordered snapshot of a collection.
#[derive(Serialize)]
pub struct LiveEvent<'a, T> {
    /// Increases by one with every snapshot the server publishes.
    pub version: u64,
    pub items: &'a [T],
}
