use crate::buffer::FrameBuffer;
use crate::codec::{
    DecodedFrame, HEADER_SIZE, LENGTH_OFFSET, MAX_FRAME_SIZE, MAX_WIRE_FRAME_SIZE, MIN_FRAME_SIZE,
    SYNC,
};
use crate::decode::decode_frame;
use crate::validate::validate;

/// Counters describing what a reassembler has seen so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReassemblerStats {
    /// Frames that validated and decoded.
    pub frames: u64,
    /// Candidate frames rejected by the validator.
    pub checksum_failures: u64,
    /// Valid frames whose tag records did not fit the payload.
    pub decode_failures: u64,
    /// Sync matches whose length field exceeded the maximum frame size.
    pub oversize_skips: u64,
    /// Bytes dropped without becoming part of a frame.
    pub discarded_bytes: u64,
}

/// Recovers frames from a byte stream split at arbitrary points.
///
/// Feed every chunk read from the socket to [`Reassembler::ingest`]; complete
/// frames are handed to the sink in stream order and incomplete ones stay
/// buffered for the next call. A sync match that fails the length bound or the
/// checksum is treated as coincidental data: one byte is skipped and the
/// search resumes, so a real frame starting inside the rejected span is never
/// lost.
#[derive(Debug)]
pub struct Reassembler {
    buf: FrameBuffer,
    max_frame_size: usize,
    stats: ReassemblerStats,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Create a reassembler for the protocol maximum of 512-byte frames.
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Create a reassembler with an explicit maximum frame size.
    ///
    /// The value is clamped to what the header and length field allow. The
    /// buffer capacity equals the maximum frame size.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        let max_frame_size = max_frame_size.clamp(MIN_FRAME_SIZE, MAX_WIRE_FRAME_SIZE);
        Self {
            buf: FrameBuffer::new(max_frame_size),
            max_frame_size,
            stats: ReassemblerStats::default(),
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }

    /// Fold `data` into the buffer and emit every complete frame.
    pub fn ingest<F>(&mut self, data: &[u8], mut sink: F)
    where
        F: FnMut(DecodedFrame),
    {
        let mut offset = 0;
        while offset < data.len() {
            let remaining = &data[offset..];
            if remaining.len() > self.buf.tail_room() {
                self.buf.compact();
            }
            let n = self.buf.append(remaining);
            if n == 0 {
                // Unreachable while scan() leaves less than a full frame behind.
                self.stats.discarded_bytes += self.buf.len() as u64;
                self.buf.clear();
                continue;
            }
            offset += n;
            self.scan(&mut sink);
        }
    }

    /// Convenience wrapper around [`Reassembler::ingest`] that collects frames.
    pub fn push(&mut self, data: &[u8]) -> Vec<DecodedFrame> {
        let mut frames = Vec::new();
        self.ingest(data, |frame| frames.push(frame));
        frames
    }

    /// Drop any partially buffered frame, counting it as discarded.
    ///
    /// Called at end of stream so a truncated trailing frame shows up in
    /// [`ReassemblerStats::discarded_bytes`].
    pub fn reset(&mut self) {
        self.stats.discarded_bytes += self.buf.len() as u64;
        self.buf.clear();
    }

    fn scan<F>(&mut self, sink: &mut F)
    where
        F: FnMut(DecodedFrame),
    {
        loop {
            let data = self.buf.as_slice();
            let Some(h) = find_sync(data) else {
                let before = data.len();
                self.buf.retain_tail(SYNC.len());
                self.stats.discarded_bytes += (before - self.buf.len()) as u64;
                return;
            };
            if h > 0 {
                self.skip(h);
            }

            let data = self.buf.as_slice();
            if data.len() < HEADER_SIZE {
                return;
            }

            let declared = u16::from_be_bytes([data[LENGTH_OFFSET], data[LENGTH_OFFSET + 1]]);
            let total = HEADER_SIZE + declared as usize;
            if total > self.max_frame_size {
                tracing::trace!(
                    total,
                    max = self.max_frame_size,
                    "length out of range, resyncing"
                );
                self.stats.oversize_skips += 1;
                self.skip(1);
                continue;
            }
            if data.len() < total {
                return;
            }

            let candidate = &data[..total];
            if !validate(candidate) {
                tracing::trace!(total, "checksum mismatch, resyncing");
                self.stats.checksum_failures += 1;
                self.skip(1);
                continue;
            }

            match decode_frame(candidate) {
                Ok(frame) => {
                    self.stats.frames += 1;
                    sink(frame);
                }
                Err(err) => {
                    tracing::debug!(error = %err, total, "dropping malformed frame");
                    self.stats.decode_failures += 1;
                }
            }
            self.buf.consume(total);
        }
    }

    fn skip(&mut self, n: usize) {
        self.stats.discarded_bytes += n as u64;
        self.buf.consume(n);
    }
}

fn find_sync(data: &[u8]) -> Option<usize> {
    data.windows(SYNC.len()).position(|window| window == SYNC)
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, fixtures, ReaderFrame, TagRecord, TAGS_OFFSET};
    use crate::validate::checksum;

    fn frame_for(serial0: u8, tags: &[(&[u8], i8)]) -> Vec<u8> {
        let frame = ReaderFrame::new(
            [serial0, 0x83, 0x23, 0x12, 0x14, 0x55, 0xae],
            tags.iter()
                .map(|(id, rssi)| TagRecord::new(id.to_vec(), *rssi))
                .collect(),
        );
        let mut buf = BytesMut::new();
        encode_frame(&frame, MAX_FRAME_SIZE, &mut buf).unwrap();
        buf.to_vec()
    }

    fn mixed_stream() -> Vec<u8> {
        let mut stream = Vec::new();
        stream.extend_from_slice(b"\x00\x43\x43noise");
        stream.extend(fixtures::bytes(fixtures::ONE_TAG));
        stream.extend(fixtures::bytes(fixtures::TWO_TAGS));
        stream.extend_from_slice(&[0x43, 0x54, 0xff, 0xff, 0x01]);
        stream.extend(frame_for(0xa0, &[(&b"\x01\x02\x03\x04"[..], -50)]));
        let mut corrupt = fixtures::bytes(fixtures::ONE_TAG);
        corrupt[20] ^= 0x55;
        stream.extend(corrupt);
        let tags: [(&[u8], i8); 2] = [(&b"\xde\xad"[..], 12), (&b"\xbe\xef"[..], -12)];
        stream.extend(frame_for(0xb7, &tags));
        stream
    }

    fn summary(frames: &[DecodedFrame]) -> Vec<(String, Vec<(String, i8)>)> {
        frames
            .iter()
            .map(|f| {
                (
                    f.device.clone(),
                    f.tags.iter().map(|t| (t.tag.clone(), t.rssi)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn decodes_single_frame() {
        let mut reassembler = Reassembler::new();
        let frames = reassembler.push(&fixtures::bytes(fixtures::ONE_TAG));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].device, "C1");
        assert_eq!(frames[0].tags[0].tag, "00112233445566778899aabb");
        assert_eq!(frames[0].tags[0].rssi, -66);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn split_inside_tag_record_matches_whole() {
        let wire = fixtures::bytes(fixtures::ONE_TAG);
        let expected = Reassembler::new().push(&wire);

        for split in 1..wire.len() {
            let mut reassembler = Reassembler::new();
            let mut frames = reassembler.push(&wire[..split]);
            assert!(frames.is_empty(), "frame before the last byte at {split}");
            frames.extend(reassembler.push(&wire[split..]));
            assert_eq!(frames, expected, "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time_matches_single_write() {
        let stream = mixed_stream();
        let whole = Reassembler::new().push(&stream);

        let mut reassembler = Reassembler::new();
        let mut trickled = Vec::new();
        for byte in &stream {
            let frames = reassembler.push(std::slice::from_ref(byte));
            trickled.extend(frames);
        }

        assert_eq!(summary(&trickled), summary(&whole));
        assert_eq!(
            summary(&whole)
                .iter()
                .map(|(device, _)| device.as_str())
                .collect::<Vec<_>>(),
            vec!["C1", "C1", "A0", "B7"]
        );
    }

    #[test]
    fn every_chunk_size_matches_single_write() {
        let stream = mixed_stream();
        let whole = summary(&Reassembler::new().push(&stream));

        for chunk in 2..=stream.len() {
            let mut reassembler = Reassembler::new();
            let mut frames = Vec::new();
            for piece in stream.chunks(chunk) {
                reassembler.ingest(piece, |f| frames.push(f));
            }
            assert_eq!(summary(&frames), whole, "chunk size {chunk}");
        }
    }

    #[test]
    fn corrupted_copy_then_intact_copy() {
        let intact = fixtures::bytes(fixtures::ONE_TAG);
        let mut corrupt = intact.clone();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xff;

        let mut stream = corrupt;
        stream.extend_from_slice(&intact);

        let mut reassembler = Reassembler::new();
        let frames = reassembler.push(&stream);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], Reassembler::new().push(&intact)[0]);
        assert_eq!(reassembler.stats().checksum_failures, 1);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn truncated_frame_followed_by_valid_frame() {
        // A reader reconnecting mid-frame: the first frame is cut short and its
        // declared length swallows part of the next one.
        let intact = fixtures::bytes(fixtures::TWO_TAGS);
        let mut stream = intact[..20].to_vec();
        stream.extend_from_slice(&intact);
        stream.extend_from_slice(&fixtures::bytes(fixtures::ONE_TAG));

        let frames = Reassembler::new().push(&stream);
        let tag_counts: Vec<usize> = frames.iter().map(|f| f.tags.len()).collect();
        assert_eq!(tag_counts, vec![2, 1]);
    }

    #[test]
    fn oversized_length_field_resyncs() {
        let mut stream = vec![0x43, 0x54, 0x02, 0x00, 0x08, 0x45];
        stream.extend(fixtures::bytes(fixtures::ONE_TAG));

        let mut reassembler = Reassembler::new();
        let frames = reassembler.push(&stream);

        assert_eq!(frames.len(), 1);
        assert_eq!(reassembler.stats().oversize_skips, 1);
    }

    #[test]
    fn partial_header_waits_for_more() {
        let wire = fixtures::bytes(fixtures::ONE_TAG);
        let mut reassembler = Reassembler::new();

        assert!(reassembler.push(&wire[..3]).is_empty());
        assert_eq!(reassembler.buffered(), 3);
        assert_eq!(reassembler.push(&wire[3..]).len(), 1);
    }

    #[test]
    fn sync_marker_split_across_reads() {
        let wire = fixtures::bytes(fixtures::ONE_TAG);
        let mut reassembler = Reassembler::new();

        assert!(reassembler.push(b"garbage\x43").is_empty());
        assert_eq!(reassembler.buffered(), SYNC.len());
        assert_eq!(reassembler.push(&wire[1..]).len(), 1);
    }

    #[test]
    fn noise_keeps_only_possible_marker_prefix() {
        let mut reassembler = Reassembler::new();
        assert!(reassembler.push(&[0x01; 100]).is_empty());
        assert_eq!(reassembler.buffered(), SYNC.len());
        assert_eq!(reassembler.stats().discarded_bytes, 98);
    }

    #[test]
    fn checksum_valid_but_malformed_frame_is_skipped_whole() {
        let mut bad = fixtures::bytes(fixtures::ONE_TAG);
        bad[TAGS_OFFSET] = 0xff;
        let last = bad.len() - 1;
        bad[last] = checksum(&bad[..last]);

        let mut stream = bad;
        stream.extend(fixtures::bytes(fixtures::TWO_TAGS));

        let mut reassembler = Reassembler::new();
        let frames = reassembler.push(&stream);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].tags.len(), 2);
        assert_eq!(reassembler.stats().decode_failures, 1);
        assert_eq!(reassembler.stats().frames, 1);
    }

    #[test]
    fn chunk_larger_than_capacity_loses_nothing() {
        let frame = fixtures::bytes(fixtures::TWO_TAGS);
        let stream = frame.repeat(40);
        assert!(stream.len() > MAX_FRAME_SIZE * 3);

        let mut reassembler = Reassembler::new();
        let frames = reassembler.push(&stream);

        assert_eq!(frames.len(), 40);
        assert_eq!(reassembler.stats().discarded_bytes, 0);
    }

    #[test]
    fn max_size_frame_fits_buffer() {
        // 16 header/checksum bytes + 31 records of 16 bytes = 512.
        let tags: Vec<(&[u8], i8)> = (0..31).map(|_| (&b"0123456789ab"[..], -1)).collect();
        let wire = frame_for(0x11, &tags);
        assert_eq!(wire.len(), MAX_FRAME_SIZE);

        let mut reassembler = Reassembler::new();
        let mut frames = reassembler.push(&wire[..100]);
        frames.extend(reassembler.push(&wire[100..]));
        frames.extend(reassembler.push(&wire));

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].tags.len(), 31);
    }

    #[test]
    fn random_noise_never_panics_or_overflows() {
        let mut seed = 0x9e37_79b9_u32;
        let mut reassembler = Reassembler::new();
        for round in 0..2000 {
            let len = (round % 97) + 1;
            let mut chunk: Vec<u8> = (0..len)
                .map(|_| {
                    seed ^= seed << 13;
                    seed ^= seed >> 17;
                    seed ^= seed << 5;
                    seed as u8
                })
                .collect();
            if round % 7 == 0 {
                chunk.extend_from_slice(&SYNC);
            }
            let _ = reassembler.push(&chunk);
            assert!(reassembler.buffered() < reassembler.max_frame_size());
        }

        // Still in sync afterwards.
        reassembler.reset();
        let frames = reassembler.push(&fixtures::bytes(fixtures::ONE_TAG));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn reset_counts_partial_frame_as_discarded() {
        let wire = fixtures::bytes(fixtures::ONE_TAG);
        let mut reassembler = Reassembler::new();
        assert!(reassembler.push(&wire[..20]).is_empty());
        assert_eq!(reassembler.buffered(), 20);

        reassembler.reset();
        assert_eq!(reassembler.buffered(), 0);
        assert_eq!(reassembler.stats().discarded_bytes, 20);
        assert_eq!(reassembler.push(&wire).len(), 1);
    }

    #[test]
    fn max_frame_size_is_clamped() {
        let smallest = Reassembler::with_max_frame_size(0);
        assert_eq!(smallest.max_frame_size(), MIN_FRAME_SIZE);
        let largest = Reassembler::with_max_frame_size(usize::MAX);
        assert_eq!(largest.max_frame_size(), MAX_WIRE_FRAME_SIZE);
    }

    #[test]
    fn smaller_limit_rejects_larger_frames() {
        let mut reassembler = Reassembler::with_max_frame_size(40);
        let frames = reassembler.push(&fixtures::bytes(fixtures::TWO_TAGS));
        assert!(frames.is_empty());
        assert_eq!(reassembler.stats().oversize_skips, 1);

        let frames = reassembler.push(&fixtures::bytes(fixtures::ONE_TAG));
        assert_eq!(frames.len(), 1);
    }
}
