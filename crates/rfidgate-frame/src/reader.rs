use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::codec::{DecodedFrame, MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};
use crate::reassembler::{Reassembler, ReassemblerStats};

/// Reads decoded frames from any blocking `Read` stream.
///
/// Handles partial reads and resynchronization internally; callers only ever
/// see frames that validated and decoded.
pub struct FrameReader<T> {
    inner: T,
    reassembler: Reassembler,
    pending: VecDeque<DecodedFrame>,
    chunk_size: usize,
}

impl<T: Read> FrameReader<T> {
    /// Create a reader for the protocol maximum frame size.
    pub fn new(inner: T) -> Self {
        Self::with_max_frame_size(inner, MAX_FRAME_SIZE)
    }

    /// Create a reader with an explicit maximum frame size.
    pub fn with_max_frame_size(inner: T, max_frame_size: usize) -> Self {
        let reassembler = Reassembler::with_max_frame_size(max_frame_size);
        let chunk_size = (reassembler.max_frame_size() / 4).max(1);
        Self {
            inner,
            reassembler,
            pending: VecDeque::new(),
            chunk_size,
        }
    }

    /// Read the next decoded frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. Bytes
    /// of an incomplete trailing frame are discarded and counted in
    /// [`FrameReader::stats`].
    pub fn read_frame(&mut self) -> Result<DecodedFrame> {
        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }

            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.reassembler.reset();
                return Err(FrameError::ConnectionClosed);
            }

            let pending = &mut self.pending;
            self.reassembler
                .ingest(&chunk[..read], |frame| pending.push_back(frame));
        }
    }

    /// Reassembly counters for everything read so far.
    pub fn stats(&self) -> ReassemblerStats {
        self.reassembler.stats()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<DecodedFrame>;

    /// Yields frames until EOF; a clean close ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::ConnectionClosed) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
