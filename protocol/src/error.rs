use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a {expected} frame, got {found}")]
    UnexpectedKind { expected: &'static str, found: String },
    #[error("Unsupported protocol version {0}")]
    UnsupportedVersion(String),
    #[error("Host answered {expected} with {found}")]
    UnexpectedReply {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Host refused the request: {0}")]
    Rejected(String),
    #[error("Transport closed")]
    Closed,
    #[error("Transport failed: {0}")]
    Transport(String),
    /// The request went out but its reply never arrived, so the host may have acted on it.
    #[error("No reply to {request} #{id}: {source}")]
    NoReply {
        request: &'static str,
        id: u64,
        source: Box<ProtocolError>,
    },
}

impl ProtocolError {
    /// Whether the host may have applied the request despite the error.
    pub const fn is_in_doubt(&self) -> bool {
        matches!(self, Self::NoReply { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
