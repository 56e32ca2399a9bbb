//! Stream reassembly and decoding for RFID reader frames.
//!
//! Readers push a continuous byte stream over TCP. Every message is framed with:
//! - A 2-byte sync marker ("CT", `0x43 0x54`)
//! - A 2-byte big-endian length counting the bytes that follow it
//! - A fixed header, a variable list of tag records and a trailing checksum
//!
//! [`Reassembler`] turns arbitrary read chunks into decoded frames and
//! resynchronizes byte by byte on noise, truncated writes or corrupt frames.

pub mod buffer;
pub mod codec;
pub mod decode;
pub mod error;
pub mod reader;
pub mod reassembler;
pub mod validate;
pub mod writer;

pub use buffer::FrameBuffer;
pub use codec::{
    encode_frame, DecodedFrame, ReaderFrame, TagDetection, TagRecord, HEADER_SIZE, MAX_FRAME_SIZE,
    MAX_WIRE_FRAME_SIZE, MIN_FRAME_SIZE, RESPONSE_CODE, SYNC,
};
pub use decode::decode_frame;
pub use error::{DecodeError, FrameError, Result};
pub use reader::FrameReader;
pub use reassembler::{Reassembler, ReassemblerStats};
pub use validate::{checksum, validate};
pub use writer::FrameWriter;
