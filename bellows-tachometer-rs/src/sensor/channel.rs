//! Single-slot report handoff between the two cores.
//!
//! Two report buffers ping-pong between the cores by ownership transfer:
//!
//! ```text
//!            ready (dest)                     sent (filled)
//!  consumer ──────────────► acquisition ──────────────────► consumer
//!     ▲                       writes once                      │
//!     └──────────── previous buffer returned as next dest ─────┘
//! ```
//!
//! The consumer supplies an empty destination with [`ReportChannel::begin`].
//! The acquisition core waits for it in [`ReportChannel::push`], copies the
//! finished report in, and sends it back. The consumer's
//! [`ReportChannel::take_report`] receives the filled buffer and, in the same
//! step, hands over the buffer it was holding as the next destination.
//!
//! Because each buffer is a `&'static mut Report` that moves through the
//! channel, the borrow checker guarantees that:
//!
//! - every report is written exactly once and read exactly once,
//! - the consumer never sees a report before it is fully written,
//! - the acquisition core never writes into a buffer the consumer still holds.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use super::report::Report;

/// Single-slot, double-buffered report handoff.
///
/// `M` must be safe to share between cores; on the RP2350 use
/// `CriticalSectionRawMutex`, which is backed by a hardware spinlock.
pub struct ReportChannel<M: RawMutex> {
    /// Empty buffers travelling to the acquisition core.
    ready: Channel<M, &'static mut Report, 1>,
    /// Filled buffers travelling to the consumer core.
    sent: Channel<M, &'static mut Report, 1>,
}

impl<M: RawMutex> Default for ReportChannel<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> ReportChannel<M> {
    /// Create an empty channel. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            ready: Channel::new(),
            sent: Channel::new(),
        }
    }

    // ── Consumer side ────────────────────────────────────────────────

    /// Hand the first destination buffer to the acquisition core.
    ///
    /// Call once at start-up, before the first [`take_report`](Self::take_report).
    pub fn begin(&self, dest: &'static mut Report) {
        spin_send(&self.ready, dest);
    }

    /// Wait for the next report.
    ///
    /// Returns the filled buffer and passes `next_dest` (the buffer the
    /// consumer was holding) to the acquisition core for the next round.
    pub async fn take_report(&self, next_dest: &'static mut Report) -> &'static mut Report {
        let filled = self.sent.receive().await;
        self.ready.send(next_dest).await;
        filled
    }

    /// Spin-waiting variant of [`take_report`](Self::take_report) for
    /// consumers that run without an executor.
    pub fn take_report_blocking(&self, next_dest: &'static mut Report) -> &'static mut Report {
        let filled = spin_receive(&self.sent);
        spin_send(&self.ready, next_dest);
        filled
    }

    // ── Acquisition side ─────────────────────────────────────────────

    /// Deliver a report.
    ///
    /// Spins until the consumer has supplied a destination, then calls
    /// `fill` exactly once with that buffer and marks it sent. The wait is
    /// the only backpressure: a slow consumer delays the acquisition core,
    /// and no report is ever dropped or overwritten.
    #[inline]
    pub fn push(&self, fill: impl FnOnce(&mut Report)) {
        let dest = spin_receive(&self.ready);
        fill(&mut *dest);
        spin_send(&self.sent, dest);
    }

    /// `true` when a destination buffer is waiting for the acquisition core.
    pub fn is_ready(&self) -> bool {
        !self.ready.is_empty()
    }
}

fn spin_receive<M: RawMutex>(channel: &Channel<M, &'static mut Report, 1>) -> &'static mut Report {
    loop {
        if let Ok(buffer) = channel.try_receive() {
            return buffer;
        }
        core::hint::spin_loop();
    }
}

fn spin_send<M: RawMutex>(channel: &Channel<M, &'static mut Report, 1>, mut buffer: &'static mut Report) {
    loop {
        match channel.try_send(buffer) {
            Ok(()) => return,
            Err(TrySendError::Full(back)) => {
                buffer = back;
                core::hint::spin_loop();
            }
        }
    }
}
