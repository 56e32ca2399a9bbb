/// Errors that can occur while encoding frames or reading them from a stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The encoded frame would exceed the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A tag identifier does not fit in a one-byte record length.
    #[error("tag id too long ({len} bytes, max {max})")]
    TagTooLong { len: usize, max: usize },

    /// More tags than the one-byte tag count can describe.
    #[error("too many tags ({count}, max {max})")]
    TooManyTags { count: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before another complete frame was received.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Structural errors inside a frame that already passed its checksum.
///
/// The checksum only covers transmission noise; a crafted frame can carry a
/// valid checksum and still have a tag count or record length that points
/// past the end of the payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The frame is shorter than the fixed header plus checksum.
    #[error("frame too short ({len} bytes, min {min})")]
    TooShort { len: usize, min: usize },

    /// A tag record starts beyond the end of the payload.
    #[error("tag record {index} missing at offset {offset} (payload {payload_len} bytes)")]
    MissingRecord {
        index: usize,
        offset: usize,
        payload_len: usize,
    },

    /// A tag record length is too small to hold its type and antenna bytes.
    #[error("tag record {index} length {record_len} is below {min}")]
    RecordTooShort {
        index: usize,
        record_len: usize,
        min: usize,
    },

    /// A tag record extends past the end of the payload.
    #[error("tag record {index} ends at {end} beyond payload ({payload_len} bytes)")]
    RecordOutOfBounds {
        index: usize,
        end: usize,
        payload_len: usize,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;
