//! Quadrature wheel tachometer with adaptive lap calibration.
//!
//! This crate turns two phase-shifted analog channels from a rotating wheel
//! into a continuous, self-correcting position measured in **laps**. The
//! bellows firmware uses it to drive airflow from how fast, and how far,
//! the player pumps.
//!
//! # Architecture
//!
//! The crate is split along the core boundary of the RP2350:
//!
//! - **[`sensor`]**: runs on the acquisition core. Samples the analog pair
//!   on a fixed schedule, estimates the phase, counts laps, and folds
//!   readings into a [`Report`](sensor::Report) that is handed to the other
//!   core through a [`ReportChannel`](sensor::ReportChannel).
//! - **[`calibration`]**: runs on the consumer core. Learns the wheel's
//!   angle-to-motion non-uniformity from whole laps and maps raw laps to
//!   adjusted laps.
//! - **[`diagnostics`]**: fixed-column text rows for the debug stream.
//!
//! ```text
//!  core 0                          │  core 1
//!  Acquisition ─► LapCounter       │
//!      │            ▲              │
//!      │      approximate_phase    │
//!      ▼                           │
//!   Report ──── ReportChannel ─────┼─► Calibration::process ─► adjusted laps
//! ```
//!
//! # Crate Features
//!
//! - **`defmt`**: structured logging via [`defmt`] and `defmt::Format`
//!   implementations on the public data types.

#![cfg_attr(not(test), no_std)]

pub mod calibration;
pub mod diagnostics;
pub mod sensor;

// ── Re-exports for convenience ───────────────────────────────────────────

pub use calibration::{Calibration, CalibrationConfig, WeightMetrics};
pub use diagnostics::DiagnosticRow;
pub use sensor::{Acquisition, Reading, Report, ReportChannel, SchedulerConfig};
