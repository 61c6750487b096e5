use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Failed to decode payload: {0}")]
    DecodeError(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Embed handle belongs to generation session {handle}, not {current}")]
    ForeignHandle { handle: u64, current: u64 },

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for EmbedError {
    fn from(e: serde_json::Error) -> Self {
        EmbedError::SerializationError(e.to_string())
    }
}
