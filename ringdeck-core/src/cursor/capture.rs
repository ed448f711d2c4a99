use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::models::error::TransportError;

/// Tracks how far the capture device has written into the ring.
///
/// All state is atomic so a [`TransportHandle`](crate::TransportHandle) can
/// stop the cursor from another thread while the control loop is advancing
/// it. The write total is published with `Release` after the bytes are in the
/// ring; readers load it with `Acquire`, so a reader may see a stale total but
/// never one ahead of the data.
#[derive(Debug)]
pub struct CaptureCursor {
    capacity: u64,
    total_written: AtomicU64,
    active: AtomicBool,
    looping: AtomicBool,
}

impl CaptureCursor {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity as u64,
            total_written: AtomicU64::new(0),
            active: AtomicBool::new(false),
            looping: AtomicBool::new(false),
        }
    }

    /// Begin a new take at offset 0.
    pub fn start(&self, looping: bool) -> Result<(), TransportError> {
        if self.active.load(Ordering::Acquire) {
            return Err(TransportError::AlreadyActive);
        }
        self.looping.store(looping, Ordering::Release);
        self.total_written.store(0, Ordering::Release);
        self.active.store(true, Ordering::Release);
        log::debug!("capture cursor started (loop: {})", looping);
        Ok(())
    }

    /// How many of `n` freshly captured bytes the ring can take right now.
    pub fn writable(&self, n: usize) -> usize {
        if !self.is_active() {
            return 0;
        }
        if self.is_looping() {
            return n;
        }
        let room = self.capacity.saturating_sub(self.total_written());
        (n as u64).min(room) as usize
    }

    /// Advance past `n` bytes that have already been copied into the ring.
    ///
    /// Without looping the advance is clamped at the end of the buffer and the
    /// cursor deactivates there. Returns the number of bytes accepted.
    pub fn on_samples_captured(&self, n: usize) -> usize {
        let accepted = self.writable(n);
        if accepted == 0 {
            return 0;
        }

        let total = self.total_written.load(Ordering::Relaxed) + accepted as u64;
        self.total_written.store(total, Ordering::Release);

        if !self.is_looping() && total >= self.capacity {
            self.active.store(false, Ordering::Release);
            log::info!("capture reached the end of the buffer ({} bytes)", total);
        }
        accepted
    }

    /// Idempotent.
    pub fn stop(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            log::debug!("capture cursor stopped at {} bytes", self.total_written());
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Acquire)
    }

    /// Bytes captured since `start`, unbounded while looping.
    pub fn total_written(&self) -> u64 {
        self.total_written.load(Ordering::Acquire)
    }

    /// Bytes captured since `start`, saturating at capacity when not looping.
    pub fn elapsed_length(&self) -> u64 {
        let total = self.total_written();
        if self.is_looping() {
            total
        } else {
            total.min(self.capacity)
        }
    }

    /// Ring offset of the next byte to be written.
    pub fn write_position(&self) -> usize {
        (self.total_written() % self.capacity) as usize
    }

    /// Whether older data has been overwritten by a looping capture.
    pub fn has_wrapped(&self) -> bool {
        self.total_written() > self.capacity
    }

    /// Stream range `[start, end)` whose bytes are still intact in the ring.
    pub fn valid_window(&self) -> (u64, u64) {
        let end = self.total_written();
        (end.saturating_sub(self.capacity), end)
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }
}
