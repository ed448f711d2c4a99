//! Write and read positions over the shared ring.
//!
//! Both cursors count bytes in one monotonic stream coordinate (total bytes
//! since the capture started); the ring offset is that total modulo the
//! capacity. Keeping the totals unbounded makes "how far behind is playback"
//! a plain subtraction, with no ambiguity once the capture has wrapped.

pub mod capture;
pub mod playback;

pub use capture::CaptureCursor;
pub use playback::{PlaybackCursor, ReadPlan, ReadSpan};
