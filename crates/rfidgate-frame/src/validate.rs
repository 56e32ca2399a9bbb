use crate::codec::{RESPONSE_CODE, RESPONSE_OFFSET};

/// Two's-complement checksum: `(256 - sum % 256) % 256` over `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum: u64 = bytes.iter().map(|&b| u64::from(b)).sum();
    ((256 - sum % 256) % 256) as u8
}

/// Returns true if `frame` carries the inventory response code and its last
/// byte is the checksum of everything before it.
pub fn validate(frame: &[u8]) -> bool {
    if frame.len() <= RESPONSE_OFFSET || frame[RESPONSE_OFFSET] != RESPONSE_CODE {
        return false;
    }
    match frame.split_last() {
        Some((&expected, body)) => checksum(body) == expected,
        None => false,
    }
}
