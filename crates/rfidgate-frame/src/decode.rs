use crate::codec::{
    DecodedFrame, TagDetection, ADDRESS_OFFSET, MIN_FRAME_SIZE, RESERVED_OFFSET, SERIAL_LEN,
    SERIAL_OFFSET, TAGS_OFFSET, TAG_COUNT_OFFSET, TAG_ID_OFFSET,
};
use crate::error::DecodeError;

/// Decode a checksum-valid frame into its device id and tag detections.
///
/// Every record is bounds-checked against the payload (the frame minus its
/// checksum byte). Bytes after the last counted record are ignored.
pub fn decode_frame(frame: &[u8]) -> Result<DecodedFrame, DecodeError> {
    if frame.len() < MIN_FRAME_SIZE {
        return Err(DecodeError::TooShort {
            len: frame.len(),
            min: MIN_FRAME_SIZE,
        });
    }
    let payload = &frame[..frame.len() - 1];

    let mut serial = [0u8; SERIAL_LEN];
    serial.copy_from_slice(&payload[SERIAL_OFFSET..SERIAL_OFFSET + SERIAL_LEN]);

    let count = payload[TAG_COUNT_OFFSET] as usize;
    let mut tags = Vec::with_capacity(count);
    let mut start = TAGS_OFFSET;

    for index in 0..count {
        let record_len = match payload.get(start) {
            Some(&len) => len as usize,
            None => {
                return Err(DecodeError::MissingRecord {
                    index,
                    offset: start,
                    payload_len: payload.len(),
                })
            }
        };
        if record_len < TAG_ID_OFFSET {
            return Err(DecodeError::RecordTooShort {
                index,
                record_len,
                min: TAG_ID_OFFSET,
            });
        }

        let end = start + record_len;
        let id = payload.get(start + TAG_ID_OFFSET..end);
        let (id, rssi) = match (id, payload.get(end)) {
            (Some(id), Some(&rssi)) => (id, rssi),
            _ => {
                return Err(DecodeError::RecordOutOfBounds {
                    index,
                    end,
                    payload_len: payload.len(),
                })
            }
        };

        tags.push(TagDetection {
            tag: hex::encode(id),
            rssi: rssi as i8,
        });
        start = end + 1;
    }

    Ok(DecodedFrame {
        device: format!("{:02X}", serial[0]),
        address: payload[ADDRESS_OFFSET],
        reserved: payload[RESERVED_OFFSET],
        serial,
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::fixtures;
    use crate::validate::checksum;

    /// Overwrite `frame[at]` and fix up the checksum so only structure is broken.
    fn patched(hex_frame: &str, at: usize, value: u8) -> Vec<u8> {
        let mut frame = fixtures::bytes(hex_frame);
        frame[at] = value;
        let last = frame.len() - 1;
        frame[last] = checksum(&frame[..last]);
        frame
    }

    #[test]
    fn decodes_reference_frame() {
        let frame = decode_frame(&fixtures::bytes(fixtures::ONE_TAG)).unwrap();

        assert_eq!(frame.device, "C1");
        assert_eq!(frame.address, 0x08);
        assert_eq!(frame.reserved, 0x01);
        assert_eq!(frame.serial_hex(), "C18323121455AE");
        assert_eq!(
            frame.tags,
            vec![TagDetection {
                tag: "00112233445566778899aabb".to_string(),
                rssi: -66,
            }]
        );
    }

    #[test]
    fn decodes_tags_in_wire_order() {
        let frame = decode_frame(&fixtures::bytes(fixtures::TWO_TAGS)).unwrap();

        let tags: Vec<(&str, i8)> = frame
            .tags
            .iter()
            .map(|t| (t.tag.as_str(), t.rssi))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("00112233445566778899aabb", 4),
                ("e280116060000217299f4b39", -6),
            ]
        );
    }

    #[test]
    fn zero_tag_count_decodes_empty() {
        let wire = patched(fixtures::ONE_TAG, TAG_COUNT_OFFSET, 0);
        let frame = decode_frame(&wire).unwrap();
        assert_eq!(frame.device, "C1");
        assert!(frame.tags.is_empty());
    }

    #[test]
    fn tag_count_past_payload_is_an_error() {
        let wire = patched(fixtures::ONE_TAG, TAG_COUNT_OFFSET, 2);
        let err = decode_frame(&wire).unwrap_err();
        assert!(matches!(err, DecodeError::MissingRecord { index: 1, .. }));
    }

    #[test]
    fn record_length_past_payload_is_an_error() {
        let wire = patched(fixtures::ONE_TAG, TAGS_OFFSET, 0xff);
        let err = decode_frame(&wire).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::RecordOutOfBounds { index: 0, .. }
        ));
    }

    #[test]
    fn record_may_not_reach_checksum_byte() {
        // RSSI would land on the checksum byte.
        let wire = patched(fixtures::ONE_TAG, TAGS_OFFSET, 0x10);
        let err = decode_frame(&wire).unwrap_err();
        assert!(matches!(err, DecodeError::RecordOutOfBounds { .. }));
    }

    #[test]
    fn record_length_below_header_is_an_error() {
        for len in 0..TAG_ID_OFFSET as u8 {
            let wire = patched(fixtures::ONE_TAG, TAGS_OFFSET, len);
            let err = decode_frame(&wire).unwrap_err();
            assert!(matches!(err, DecodeError::RecordTooShort { .. }));
        }
    }

    #[test]
    fn minimal_record_has_empty_tag_id() {
        let wire = patched(fixtures::ONE_TAG, TAGS_OFFSET, TAG_ID_OFFSET as u8);
        let frame = decode_frame(&wire).unwrap();
        assert_eq!(frame.tags.len(), 1);
        assert_eq!(frame.tags[0].tag, "");
        // RSSI is the first tag id byte of the original record.
        assert_eq!(frame.tags[0].rssi, 0x00);
    }

    #[test]
    fn short_frame_is_an_error() {
        let frame = fixtures::bytes(fixtures::ONE_TAG);
        let err = decode_frame(&frame[..MIN_FRAME_SIZE - 1]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooShort {
                len: MIN_FRAME_SIZE - 1,
                min: MIN_FRAME_SIZE
            }
        );
    }

    #[test]
    fn arbitrary_bytes_never_panic() {
        let mut seed = 0x2545_f491_u32;
        for len in 0..300 {
            let bytes: Vec<u8> = (0..len)
                .map(|_| {
                    seed ^= seed << 13;
                    seed ^= seed >> 17;
                    seed ^= seed << 5;
                    seed as u8
                })
                .collect();
            let _ = decode_frame(&bytes);
        }
    }
}
