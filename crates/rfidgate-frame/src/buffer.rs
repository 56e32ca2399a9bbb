/// Fixed-capacity working buffer for stream reassembly.
///
/// Holds the unconsumed window `storage[start..end]`. The storage is
/// allocated once and never grows; [`FrameBuffer::compact`] moves the window
/// back to the front when the tail runs out of room.
#[derive(Debug)]
pub struct FrameBuffer {
    storage: Box<[u8]>,
    start: usize,
    end: usize,
}

impl FrameBuffer {
    /// Allocate a buffer that can hold `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Room left after the window without compacting.
    pub fn tail_room(&self) -> usize {
        self.storage.len() - self.end
    }

    /// The unconsumed bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.start..self.end]
    }

    /// Copy as much of `data` as fits in the tail room. Returns the count copied.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.tail_room());
        self.storage[self.end..self.end + n].copy_from_slice(&data[..n]);
        self.end += n;
        n
    }

    /// Move the unconsumed bytes to the front of the storage.
    pub fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.storage.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
    }

    /// Drop up to `n` bytes from the front of the window.
    pub fn consume(&mut self, n: usize) {
        self.start += n.min(self.len());
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
    }

    /// Keep only the last `n` bytes of the window.
    pub fn retain_tail(&mut self, n: usize) {
        let len = self.len();
        if len > n {
            self.consume(len - n);
        }
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_is_bounded_by_capacity() {
        let mut buf = FrameBuffer::new(4);
        assert_eq!(buf.append(b"abcdef"), 4);
        assert_eq!(buf.as_slice(), b"abcd");
        assert_eq!(buf.tail_room(), 0);
        assert_eq!(buf.append(b"x"), 0);
    }

    #[test]
    fn consume_advances_window() {
        let mut buf = FrameBuffer::new(8);
        buf.append(b"abcdef");
        buf.consume(2);
        assert_eq!(buf.as_slice(), b"cdef");
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.tail_room(), 2);
    }

    #[test]
    fn consume_everything_rewinds() {
        let mut buf = FrameBuffer::new(8);
        buf.append(b"abcdef");
        buf.consume(100);
        assert!(buf.is_empty());
        assert_eq!(buf.tail_room(), 8);
    }

    #[test]
    fn compact_moves_tail_to_front_without_loss() {
        let mut buf = FrameBuffer::new(8);
        buf.append(b"abcdefgh");
        buf.consume(5);
        assert_eq!(buf.tail_room(), 0);

        buf.compact();
        assert_eq!(buf.as_slice(), b"fgh");
        assert_eq!(buf.tail_room(), 5);

        assert_eq!(buf.append(b"12345"), 5);
        assert_eq!(buf.as_slice(), b"fgh12345");
        assert_eq!(buf.capacity(), 8);
    }

    #[test]
    fn compact_on_aligned_window_is_noop() {
        let mut buf = FrameBuffer::new(4);
        buf.append(b"ab");
        buf.compact();
        assert_eq!(buf.as_slice(), b"ab");
    }

    #[test]
    fn retain_tail_keeps_last_bytes() {
        let mut buf = FrameBuffer::new(8);
        buf.append(b"abcdef");
        buf.retain_tail(2);
        assert_eq!(buf.as_slice(), b"ef");
        buf.retain_tail(5);
        assert_eq!(buf.as_slice(), b"ef");
    }

    #[test]
    fn clear_resets() {
        let mut buf = FrameBuffer::new(4);
        buf.append(b"abc");
        buf.consume(1);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.tail_room(), 4);
    }
}
