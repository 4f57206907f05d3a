use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    /// A feed message could not be encoded as a JSON text frame.
    #[error("Failed to encode WebSocket message: {0}")]
    Encode(#[from] serde_json::Error),
}
