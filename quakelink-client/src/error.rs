use std::time::Duration;

/// Errors that can occur during QuakeLink client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// TCP or socket I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS setup or handshake error (`qls` scheme).
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// QuakeLink protocol parsing error (bad header, bad command, etc.).
    #[error("protocol error: {0}")]
    Protocol(#[from] quakelink_rs_protocol::QuakeLinkError),

    /// Operation exceeded the configured timeout duration.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Connection closed (locally or by the server).
    #[error("disconnected")]
    Disconnected,

    /// Operation attempted before `init` configured a target.
    #[error("instance not initialized")]
    NotInitialized,

    /// The connection URL used a scheme other than `ql` or `qls`.
    #[error("unsupported scheme: {0:?}")]
    UnsupportedScheme(String),

    /// The server sent a status line this operation cannot accept.
    #[error("unexpected response: expected {expected:?}, got {actual:?}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: String,
    },

    /// Request rejected locally: the server's API level does not cover it.
    #[error("not supported by server: {0}")]
    Unsupported(String),
}

/// Convenience alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;
