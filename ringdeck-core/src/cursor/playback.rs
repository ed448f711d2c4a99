use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::capture::CaptureCursor;
use crate::models::error::TransportError;

/// A contiguous stretch of the stream to hand to the playback device.
///
/// `offset` is a ring offset; the span may still straddle the end of the
/// ring, which [`RingBuffer::read`](crate::RingBuffer::read) splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSpan {
    pub offset: usize,
    pub len: usize,
}

/// Spans for one playback request, not yet applied to the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    pub spans: Vec<ReadSpan>,
    start: u64,
    // Stream position after each span
    ends: Vec<u64>,
    finished: bool,
}

impl ReadPlan {
    fn push(&mut self, span: ReadSpan, end: u64) {
        self.spans.push(span);
        self.ends.push(end);
    }

    /// Total bytes across all spans.
    pub fn len_bytes(&self) -> usize {
        self.spans.iter().map(|span| span.len).sum()
    }

    /// Playback ends once this plan is fully delivered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Tracks how far the playback engine has read, and decides how much it may
/// read next without overtaking the capture.
#[derive(Debug)]
pub struct PlaybackCursor {
    capacity: u64,
    total_read: AtomicU64,
    active: AtomicBool,
    looping: AtomicBool,
}

impl PlaybackCursor {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity as u64,
            total_read: AtomicU64::new(0),
            active: AtomicBool::new(false),
            looping: AtomicBool::new(false),
        }
    }

    /// Start (or restart) playback from the oldest intact byte.
    ///
    /// Fails with `NotEnoughData` only when nothing was captured and nothing
    /// is being captured; playing alongside a take that has not produced
    /// bytes yet just stalls until it does.
    pub fn start(&self, looping: bool, capture: &CaptureCursor) -> Result<(), TransportError> {
        if capture.elapsed_length() == 0 && !capture.is_active() {
            return Err(TransportError::NotEnoughData);
        }

        let (window_start, _) = capture.valid_window();
        self.looping.store(looping, Ordering::Release);
        self.total_read.store(window_start, Ordering::Release);
        self.active.store(true, Ordering::Release);
        log::debug!("playback cursor started at {} (loop: {})", window_start, looping);
        Ok(())
    }

    /// Deliver up to `n` bytes, returning how many may be played.
    pub fn on_samples_requested(&self, n: usize, capture: &CaptureCursor, guard: usize) -> usize {
        self.request_spans(n, capture, guard).iter().map(|span| span.len).sum()
    }

    /// Advance by up to `n` bytes and return the ring spans to play, in order.
    pub fn request_spans(&self, n: usize, capture: &CaptureCursor, guard: usize) -> Vec<ReadSpan> {
        let plan = self.plan_spans(n, capture, guard);
        self.commit(&plan, plan.spans.len());
        plan.spans
    }

    /// Work out the spans for a request of up to `n` bytes without moving
    /// the cursor. Follow with [`commit`](Self::commit) once the spans have
    /// been delivered.
    ///
    /// While the capture is live, playback may only reach `guard` bytes short
    /// of the write total; with nothing available it stalls (no spans, still
    /// active). Once the capture has stopped, playback runs to the end of the
    /// take and either finishes or, when looping, starts over from the
    /// oldest intact byte.
    pub fn plan_spans(&self, n: usize, capture: &CaptureCursor, guard: usize) -> ReadPlan {
        let mut read = self.total_read.load(Ordering::Acquire);
        let mut plan = ReadPlan {
            spans: Vec::new(),
            start: read,
            ends: Vec::new(),
            finished: false,
        };
        if n == 0 || !self.is_active() {
            return plan;
        }

        // Sample activity before the total: a capture stopping in between
        // only makes this request more conservative.
        let capture_live = capture.is_active();
        let (window_start, window_end) = capture.valid_window();

        if read < window_start {
            log::warn!(
                "playback lapped by capture, skipping {} stale bytes",
                window_start - read
            );
            read = window_start;
        }
        // A new take restarted the stream underneath us.
        read = read.min(window_end);
        plan.start = read;

        let mut remaining = n as u64;
        if capture_live {
            let end = window_end.saturating_sub(guard as u64);
            let take = remaining.min(end.saturating_sub(read));
            if take > 0 {
                plan.push(self.span(read, take), read + take);
            }
        } else {
            let looping = self.is_looping();
            while remaining > 0 {
                let available = window_end - read;
                if available == 0 {
                    if looping && window_end > window_start {
                        read = window_start;
                        continue;
                    }
                    break;
                }
                let take = remaining.min(available);
                plan.push(self.span(read, take), read + take);
                read += take;
                remaining -= take;
            }
            plan.finished = !looping && read >= window_end;
        }
        plan
    }

    /// Move past the first `delivered` spans of `plan`.
    ///
    /// Spans that were not delivered are requested again next time. Playback
    /// only ends once every span of a finishing plan has been delivered.
    pub fn commit(&self, plan: &ReadPlan, delivered: usize) {
        let delivered = delivered.min(plan.spans.len());
        let read = match delivered {
            0 => plan.start,
            n => plan.ends[n - 1],
        };
        self.total_read.store(read, Ordering::Release);

        if plan.finished && delivered == plan.spans.len() && self.active.swap(false, Ordering::AcqRel) {
            log::info!("playback reached the end of the recording");
        }
    }

    /// Rewind to the start of the stream, for a new take recorded under
    /// running playback.
    pub fn rebase(&self) {
        self.total_read.store(0, Ordering::Release);
    }

    /// Idempotent.
    pub fn stop(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            log::debug!("playback cursor stopped at {} bytes", self.total_read());
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Acquire)
    }

    /// Ring offset of the next byte to be played.
    pub fn position(&self) -> usize {
        (self.total_read() % self.capacity) as usize
    }

    /// Stream position, in the capture's coordinates.
    pub fn total_read(&self) -> u64 {
        self.total_read.load(Ordering::Acquire)
    }

    fn span(&self, stream_pos: u64, len: u64) -> ReadSpan {
        ReadSpan {
            offset: (stream_pos % self.capacity) as usize,
            len: len as usize,
        }
    }
}
