use std::path::PathBuf;

/// Errors that can occur moving bytes in or out of a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The opened path is not a terminal device.
    #[error("{path} is not a terminal device")]
    NotATerminal { path: PathBuf },

    /// The requested baud rate has no termios equivalent.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaud(u32),

    /// Failed to apply terminal attributes.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer end accepted no more bytes.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
