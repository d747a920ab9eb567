//! Error types for frame decoding and node control.

use thiserror::Error;

/// Result alias for sensor operations.
pub type SensorResult<T> = Result<T, SensorError>;

/// Errors raised while decoding frames or driving a node.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SensorError {
    /// Frame did not begin with the ANT sync byte.
    #[error("invalid sync byte")]
    InvalidSync {
        /// Byte found in the sync position.
        found: u8,
    },
    /// Frame or payload was shorter than its message requires.
    #[error("frame truncated")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        actual: usize,
    },
    /// Declared payload length disagrees with the frame size.
    #[error("frame length mismatch")]
    LengthMismatch {
        /// Payload length in the header.
        declared: usize,
        /// Payload bytes present.
        actual: usize,
    },
    /// XOR checksum did not match.
    #[error("frame checksum mismatch")]
    Checksum {
        /// Checksum computed over the frame.
        expected: u8,
        /// Checksum carried by the frame.
        actual: u8,
    },
    /// Message identifier is not handled by this codec.
    #[error("unsupported message")]
    UnsupportedMessage {
        /// Message identifier.
        id: u8,
    },
    /// A scan plan asked for more channels than a node provides.
    #[error("too many channels requested")]
    TooManyChannels {
        /// Channels requested.
        requested: usize,
        /// Channels available.
        max: usize,
    },
    /// The node is already started.
    #[error("node already started")]
    AlreadyStarted,
    /// Transport-level failure reported by a node implementation.
    #[error("sensor node failure")]
    Node {
        /// Operation that failed.
        operation: &'static str,
        /// Failure detail from the transport.
        detail: String,
    },
}
