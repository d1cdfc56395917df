//! Real-time acquisition of the quadrature wheel sensor.
//!
//! Everything in this module runs on the acquisition core. The pieces, from
//! leaf to root:
//!
//! - [`approximate_phase`]: cheap piecewise-linear arctangent that turns a
//!   centred `(x, y)` pair into an angle in `[0, TICKS_PER_TURN)`.
//! - [`LapCounter`]: tracks wraparound of that angle into a signed lap
//!   count and a per-sample delta.
//! - [`Acquisition`]: the fixed-period sampling loop. Busy-waits to the
//!   next deadline, takes an authoritative read while the sibling core is
//!   paused, and folds [`Reading`]s into a [`Report`].
//! - [`ReportChannel`]: the single-slot ping-pong handoff that moves each
//!   completed [`Report`] to the consumer core.
//!
//! # Timing model
//!
//! The loop never sleeps. Sub-millisecond determinism matters more than
//! power here, so both waits (for the schedule and for the consumer's
//! buffer) are spin loops. Data-quality problems such as late samples or
//! starved idle time are recorded in the [`Report`] and never stop the loop.
//!
//! The hot path ([`Acquisition::sample`] and everything it calls) must stay
//! allocation-free and should be linked into RAM on targets that execute
//! from external flash.

mod channel;
mod error;
mod hardware;
mod laps;
mod phase;
mod report;
mod scheduler;

pub use channel::ReportChannel;
pub use error::SensorError;
pub use hardware::{MicrosClock, NoSibling, QuadratureInput, SiblingCore};
pub use laps::LapCounter;
pub use phase::approximate_phase;
pub use report::{Reading, Report};
pub use scheduler::{Acquisition, SchedulerConfig};

/// Angle resolution: units per full revolution of the wheel.
pub const TICKS_PER_TURN: i32 = 720;

/// Half a revolution. Consecutive samples must never be further apart.
pub const HALF_TURN: i32 = TICKS_PER_TURN / 2;

/// Time between authoritative reads, in microseconds.
pub const SAMPLE_PERIOD_US: u32 = 1000;

/// Number of readings folded into one [`Report`].
pub const SAMPLES_PER_REPORT: u32 = 5;

/// The scheduler stops idling this many microseconds before a deadline.
pub const WAKE_MARGIN_US: u32 = 110;

/// Reads taken at start-up to settle the analog front-end.
pub const WARMUP_READS: u32 = 10;

/// ADC count at the centre of the sensor swing (12-bit ADC).
pub const DEFAULT_MIDPOINT: i32 = 1200;
