use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};
use crate::validate::checksum;

/// Sync marker: "CT" (0x43 0x54).
pub const SYNC: [u8; 2] = [0x43, 0x54];

/// Offset of the big-endian length field.
pub const LENGTH_OFFSET: usize = 2;

/// Width of the length field in bytes.
pub const LENGTH_WIDTH: usize = 2;

/// Sync marker + length field. The length counts every byte after this header.
pub const HEADER_SIZE: usize = LENGTH_OFFSET + LENGTH_WIDTH;

/// Reader bus address.
pub const ADDRESS_OFFSET: usize = 4;

/// Response code position.
pub const RESPONSE_OFFSET: usize = 5;

/// Response code carried by tag inventory reports.
pub const RESPONSE_CODE: u8 = 0x45;

pub const RESERVED_OFFSET: usize = 6;

/// Device serial: 7 bytes, the first of which identifies the device.
pub const SERIAL_OFFSET: usize = 7;
pub const SERIAL_LEN: usize = 7;

pub const TAG_COUNT_OFFSET: usize = SERIAL_OFFSET + SERIAL_LEN;

/// First tag record.
pub const TAGS_OFFSET: usize = TAG_COUNT_OFFSET + 1;

/// Record length, type and antenna bytes that precede a tag id.
pub const TAG_ID_OFFSET: usize = 3;

/// Smallest frame that can carry the fixed header and checksum.
pub const MIN_FRAME_SIZE: usize = TAGS_OFFSET + 1;

/// Largest frame the reader protocol produces.
pub const MAX_FRAME_SIZE: usize = 512;

/// Largest frame the 16-bit length field can describe.
pub const MAX_WIRE_FRAME_SIZE: usize = HEADER_SIZE + u16::MAX as usize;

/// One tag seen by a reader antenna.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDetection {
    /// Tag identifier as lowercase hex.
    pub tag: String,
    /// Received signal strength.
    pub rssi: i8,
}

/// A frame that passed validation and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Device id as uppercase hex (first serial byte).
    pub device: String,
    /// Reader bus address.
    pub address: u8,
    pub reserved: u8,
    pub serial: [u8; SERIAL_LEN],
    /// Detections in wire order.
    pub tags: Vec<TagDetection>,
}

impl DecodedFrame {
    /// Full device serial as uppercase hex.
    pub fn serial_hex(&self) -> String {
        hex::encode_upper(self.serial)
    }
}

/// A raw tag record for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub kind: u8,
    pub antenna: u8,
    pub id: Vec<u8>,
    pub rssi: i8,
}

impl TagRecord {
    /// Create a record with the default type and antenna (both 1).
    pub fn new(id: impl Into<Vec<u8>>, rssi: i8) -> Self {
        Self {
            kind: 0x01,
            antenna: 0x01,
            id: id.into(),
            rssi,
        }
    }

    fn wire_size(&self) -> usize {
        TAG_ID_OFFSET + self.id.len() + 1
    }
}

/// An inventory report as a reader would send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderFrame {
    pub address: u8,
    pub reserved: u8,
    pub serial: [u8; SERIAL_LEN],
    pub tags: Vec<TagRecord>,
}

impl ReaderFrame {
    /// Create a report for a device serial with address 0x08.
    pub fn new(serial: [u8; SERIAL_LEN], tags: Vec<TagRecord>) -> Self {
        Self {
            address: 0x08,
            reserved: 0x01,
            serial,
            tags,
        }
    }

    /// The total wire size of this frame, checksum included.
    pub fn wire_size(&self) -> usize {
        TAGS_OFFSET + self.tags.iter().map(TagRecord::wire_size).sum::<usize>() + 1
    }
}

/// Encode a reader frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬──────┬──────┬──────┬──────────┬───────┬──────────────┬──────────┐
/// │ Sync (2B)│ Len (2B) │ Addr │ Resp │ Rsvd │ Serial   │ Count │ Tag records  │ Checksum │
/// │ 0x43 0x54│ BE       │ (1B) │ 0x45 │ (1B) │ (7B)     │ (1B)  │ (variable)   │ (1B)     │
/// └──────────┴──────────┴──────┴──────┴──────┴──────────┴───────┴──────────────┴──────────┘
///
/// Tag record: RecLen (1B) | Type (1B) | Antenna (1B) | Tag id (RecLen - 3 B) | RSSI (1B)
/// ```
pub fn encode_frame(frame: &ReaderFrame, max_frame_size: usize, dst: &mut BytesMut) -> Result<()> {
    if frame.tags.len() > u8::MAX as usize {
        return Err(FrameError::TooManyTags {
            count: frame.tags.len(),
            max: u8::MAX as usize,
        });
    }
    let max_id = u8::MAX as usize - TAG_ID_OFFSET;
    if let Some(tag) = frame.tags.iter().find(|tag| tag.id.len() > max_id) {
        return Err(FrameError::TagTooLong {
            len: tag.id.len(),
            max: max_id,
        });
    }

    let total = frame.wire_size();
    let max = max_frame_size.min(MAX_WIRE_FRAME_SIZE);
    if total > max {
        return Err(FrameError::FrameTooLarge { size: total, max });
    }

    let start = dst.len();
    dst.reserve(total);
    dst.put_slice(&SYNC);
    dst.put_u16((total - HEADER_SIZE) as u16);
    dst.put_u8(frame.address);
    dst.put_u8(RESPONSE_CODE);
    dst.put_u8(frame.reserved);
    dst.put_slice(&frame.serial);
    dst.put_u8(frame.tags.len() as u8);
    for tag in &frame.tags {
        dst.put_u8((tag.id.len() + TAG_ID_OFFSET) as u8);
        dst.put_u8(tag.kind);
        dst.put_u8(tag.antenna);
        dst.put_slice(&tag.id);
        dst.put_i8(tag.rssi);
    }
    let sum = checksum(&dst[start..]);
    dst.put_u8(sum);
    Ok(())
}
