/// Fixed-capacity circular byte store shared by capture and playback.
///
/// Unlike a FIFO, the ring keeps no positions of its own: the capture and
/// playback cursors own them and address the storage by offset. Every offset
/// is taken modulo the capacity, so an access that runs past the end is split
/// into two contiguous segments.
///
/// Wrap in `Arc<parking_lot::Mutex<RingBuffer>>` to share it with the
/// threads that drive the devices.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<u8>,
    capacity: usize,
}

impl RingBuffer {
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            buffer: vec![0; capacity],
            capacity,
        }
    }

    /// Copy `bytes` into the ring starting at `offset`.
    ///
    /// A write that straddles the end continues at offset 0. `bytes` must not
    /// be longer than the capacity; only the last `capacity` bytes are kept if
    /// it is.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        let bytes = if bytes.len() > self.capacity {
            log::warn!(
                "ring write of {} bytes exceeds capacity {}, keeping the tail",
                bytes.len(),
                self.capacity
            );
            &bytes[bytes.len() - self.capacity..]
        } else {
            bytes
        };

        let start = offset % self.capacity;
        let first_len = bytes.len().min(self.capacity - start);
        let (first, second) = bytes.split_at(first_len);

        self.buffer[start..start + first.len()].copy_from_slice(first);
        self.buffer[..second.len()].copy_from_slice(second);
    }

    /// Borrow up to `max_bytes` starting at `offset`.
    ///
    /// Returns `(segment1, segment2)`; `segment2` is empty unless the range
    /// wraps past the end. `max_bytes` is clamped to the capacity.
    pub fn read(&self, offset: usize, max_bytes: usize) -> (&[u8], &[u8]) {
        let len = max_bytes.min(self.capacity);
        let start = offset % self.capacity;
        let first_len = len.min(self.capacity - start);

        let first = &self.buffer[start..start + first_len];
        let second = &self.buffer[..len - first_len];
        (first, second)
    }

    /// Owned, contiguous copy of a possibly wrapped range.
    pub fn copy_out(&self, offset: usize, len: usize) -> Vec<u8> {
        let (first, second) = self.read(offset, len);
        let mut out = Vec::with_capacity(first.len() + second.len());
        out.extend_from_slice(first);
        out.extend_from_slice(second);
        out
    }

    /// Zero the storage. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.buffer.fill(0);
    }

    /// The total capacity of the buffer in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn linear_write_read() {
        let mut ring = RingBuffer::new(10);
        ring.write(2, &[1, 2, 3]);

        let (first, second) = ring.read(2, 3);
        assert_eq!(first, &[1, 2, 3]);
        assert!(second.is_empty());
    }

    #[test]
    fn write_straddling_end_wraps_to_start() {
        let mut ring = RingBuffer::new(8);
        ring.write(6, &[1, 2, 3, 4, 5]);

        assert_eq!(ring.read(0, 8), (&[3, 4, 5, 0, 0, 0, 1, 2][..], &[][..]));
    }

    #[test]
    fn read_straddling_end_splits_in_two() {
        let mut ring = RingBuffer::new(8);
        ring.write(0, &pattern(8));

        let (first, second) = ring.read(5, 6);
        assert_eq!(first, &[5, 6, 7]);
        assert_eq!(second, &[0, 1, 2]);
    }

    #[test]
    fn wrapped_segments_match_linear_equivalent() {
        let capacity = 64;
        let data = pattern(40);

        for offset in [0, 10, 24, 30, 63] {
            let mut ring = RingBuffer::new(capacity);
            ring.write(offset, &data);

            let (first, second) = ring.read(offset, data.len());
            assert_eq!(first.len() + second.len(), data.len());
            assert_eq!(ring.copy_out(offset, data.len()), data, "offset {}", offset);
        }
    }

    #[test]
    fn offsets_are_taken_modulo_capacity() {
        let mut ring = RingBuffer::new(4);
        ring.write(9, &[7]);

        assert_eq!(ring.read(1, 1).0, &[7]);
        assert_eq!(ring.read(13, 1).0, &[7]);
    }

    #[test]
    fn read_is_clamped_to_capacity() {
        let mut ring = RingBuffer::new(4);
        ring.write(0, &[1, 2, 3, 4]);

        let (first, second) = ring.read(2, 100);
        assert_eq!(first, &[3, 4]);
        assert_eq!(second, &[1, 2]);
    }

    #[test]
    fn write_larger_than_capacity_keeps_tail() {
        let mut ring = RingBuffer::new(3);
        ring.write(0, &[1, 2, 3, 4, 5]);

        assert_eq!(ring.copy_out(0, 3), vec![3, 4, 5]);
    }

    #[test]
    fn clear_zeroes_storage() {
        let mut ring = RingBuffer::new(4);
        ring.write(0, &[9, 9, 9, 9]);
        ring.clear();

        assert_eq!(ring.copy_out(0, 4), vec![0; 4]);
        assert_eq!(ring.capacity(), 4);
    }

    #[test]
    fn empty_operations() {
        let mut ring = RingBuffer::new(4);
        ring.write(3, &[]);

        let (first, second) = ring.read(3, 0);
        assert!(first.is_empty());
        assert!(second.is_empty());
    }
}
