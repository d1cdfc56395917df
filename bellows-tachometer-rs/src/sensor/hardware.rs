//! Hardware seams for the acquisition loop.
//!
//! The scheduler is generic over these so the same loop runs on the RP2350
//! and against simulated hardware in tests.

/// Free-running microsecond counter.
pub trait MicrosClock {
    /// Microseconds since an arbitrary, fixed epoch. Must never go backwards.
    fn now_micros(&self) -> u64;
}

/// The two analog channels of the wheel sensor.
///
/// Each call performs one blocking conversion. The channels are read one
/// after the other so their conversion times can be measured separately.
pub trait QuadratureInput {
    /// Error reported by a failed conversion.
    type Error: core::fmt::Debug;

    /// Read channel A.
    fn read_a(&mut self) -> Result<u16, Self::Error>;

    /// Read channel B.
    fn read_b(&mut self) -> Result<u16, Self::Error>;
}

/// Control over the other core.
///
/// The acquisition core pauses its sibling around each authoritative read so
/// the read is not delayed by bus or memory contention. The pause must stay
/// short and must never span a blocking operation.
pub trait SiblingCore {
    /// Halt the other core until [`resume`](Self::resume) is called.
    fn pause(&mut self);

    /// Let the other core continue.
    fn resume(&mut self);
}

/// A [`SiblingCore`] that does nothing, for single-core hosts and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSibling;

impl SiblingCore for NoSibling {
    fn pause(&mut self) {}

    fn resume(&mut self) {}
}
