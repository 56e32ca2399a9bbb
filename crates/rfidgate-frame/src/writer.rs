use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, ReaderFrame, MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};

/// Writes encoded reader frames to any blocking `Write` stream.
///
/// Used to simulate a reader against a running gateway.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    max_frame_size: usize,
}

impl<T: Write> FrameWriter<T> {
    /// Create a writer limited to the protocol maximum frame size.
    pub fn new(inner: T) -> Self {
        Self::with_max_frame_size(inner, MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(inner: T, max_frame_size: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
            max_frame_size,
        }
    }

    /// Encode and send one frame (blocking).
    pub fn send(&mut self, frame: &ReaderFrame) -> Result<()> {
        self.buf.clear();
        encode_frame(frame, self.max_frame_size, &mut self.buf)?;
        let buf = std::mem::take(&mut self.buf);
        let result = self.send_raw(&buf);
        self.buf = buf;
        result
    }

    /// Send bytes as-is. Useful for replaying captures or injecting noise.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{fixtures, TagRecord};
    use crate::reader::FrameReader;

    fn reference_frame() -> ReaderFrame {
        ReaderFrame::new(
            [0xc1, 0x83, 0x23, 0x12, 0x14, 0x55, 0xae],
            vec![TagRecord::new(
                hex::decode("00112233445566778899aabb").unwrap(),
                -66,
            )],
        )
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&reference_frame()).unwrap();

        let written = writer.into_inner().into_inner();
        assert_eq!(written, fixtures::bytes(fixtures::ONE_TAG));
    }

    #[test]
    #[cfg(unix)]
    fn frames_written_are_read_back() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send_raw(b"\x00\x01line noise").unwrap();
        writer.send(&reference_frame()).unwrap();

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.device, "C1");
        assert_eq!(frame.tags[0].rssi, -66);
    }

    #[test]
    fn oversized_frame_is_rejected_before_writing() {
        let tags = (0..10)
            .map(|_| TagRecord::new(vec![0xab; 12], -1))
            .collect();
        let frame = ReaderFrame::new([1; 7], tags);

        let mut writer = FrameWriter::with_max_frame_size(Cursor::new(Vec::<u8>::new()), 64);
        let err = writer.send(&frame).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { max: 64, .. }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn zero_length_write_reports_closed() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = FrameWriter::new(Closed);
        assert!(matches!(
            writer.send(&reference_frame()),
            Err(FrameError::ConnectionClosed)
        ));
    }
}
