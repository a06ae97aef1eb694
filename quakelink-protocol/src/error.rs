#[derive(Debug, thiserror::Error)]
pub enum QuakeLinkError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invalid request format: {0:?}")]
    InvalidFormat(String),

    #[error("invalid time value: {0:?}")]
    InvalidTime(String),

    #[error("invalid {field} header: {value:?}")]
    InvalidHeader {
        field: &'static str,
        value: String,
    },

    #[error("missing mandatory header: {0}")]
    MissingHeader(&'static str),

    #[error("content length {length} exceeds maximum of {maximum} bytes")]
    ContentTooLarge { length: u64, maximum: u64 },
}

pub type Result<T> = std::result::Result<T, QuakeLinkError>;
