use objlink_transport::TransportError;

/// Errors that can occur while setting up channels or moving frames.
///
/// Malformed input is never an error: the decoder silently resynchronizes.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Every channel id has already been handed out.
    #[error("channel ids exhausted (all {max} ids allocated)")]
    ChannelsExhausted { max: u8 },

    /// Channel id 0 is reserved.
    #[error("invalid channel id {0} (ids range 1-255)")]
    InvalidChannel(u8),

    /// Prefix and suffix markers must differ.
    #[error("prefix and suffix markers are both 0x{0:02x}")]
    MarkersCollide(u8),

    /// A raw payload did not match the size the codec was built for.
    #[error("payload size mismatch ({actual} bytes, expected {expected})")]
    PayloadSize { expected: usize, actual: usize },

    /// A run-time payload size exceeds the buffering limit.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte sink or source failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
