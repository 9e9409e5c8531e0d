use thiserror::Error;

/// Everything that can go wrong turning bytes into a message or back.
///
/// Any of these received from a client is a protocol violation: the connection
/// that produced it is closed.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("unknown STOMP verb {0:?}")]
    UnknownVerb(String),
    #[error("line longer than {limit} bytes")]
    LineTooLong { limit: usize },
    #[error("frame line is not valid UTF-8")]
    InvalidEncoding,
    #[error("malformed header line {0:?}")]
    InvalidHeader(String),
    #[error("more than {0} headers")]
    TooManyHeaders(usize),
    #[error("content-length {declared} exceeds the {available} bytes available")]
    ContentLengthMismatch { declared: usize, available: usize },
    #[error("frame exceeds the {limit} byte accumulator")]
    FrameTooLarge { limit: usize },
    #[error("frame has no content-type header")]
    MissingContentType,
    #[error("unsupported content-type {0:?}")]
    UnknownContentType(String),
    #[error("frame has no payload type header")]
    MissingPayloadType,
    #[error("no message {payload_type:?} is known for {content_type}")]
    UnknownPayloadType {
        content_type: &'static str,
        payload_type: String,
    },
    #[error("json payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary payload: {0}")]
    BinaryDecode(#[from] bincode::error::DecodeError),
    #[error("binary payload: {0}")]
    BinaryEncode(#[from] bincode::error::EncodeError),
}
