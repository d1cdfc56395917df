//! Adaptive calibration of the wheel's angle-to-motion mapping.
//!
//! The phase estimator is cheap and biased, and the wheel itself is never
//! perfectly even: eccentric mounting and uneven magnet spacing make some
//! stretches of raw angle pass faster than others. This module learns that
//! non-uniformity online and removes it.
//!
//! # How it works
//!
//! One lap is split into [`BIN_COUNT`] equal bins of raw angle. While the
//! bellows move steadily in one direction, every call spreads one unit of
//! "traversal mass" over the raw range covered since the previous call.
//! At constant true speed a bin that the raw angle crosses quickly gets
//! little mass and a slow bin gets a lot, so after a full lap each bin's
//! share of the mass is the share of *true* rotation it represents.
//!
//! ```text
//! raw laps ──► LapCalibrator ──(completed lap)──► Weights (EMA, α = 0.02)
//!                                                     │
//!                                   LookupTable ◄─────┘ rebuilt on change
//!                                        │
//! raw laps ──────────────────────────────┴──► adjusted laps
//! ```
//!
//! - [`Weights`]: circular histogram with range accumulation.
//! - [`LapCalibrator`]: direction state machine that builds one partial
//!   histogram per lap and blends accepted laps into the persistent weights.
//! - [`LookupTable`]: cumulative, monotonic mapping from raw to adjusted
//!   lap fraction, rebuilt lazily.
//! - [`Calibration`]: the consumer-facing facade.
//!
//! # Data quality
//!
//! Nothing here fails. Laps with too few or too many samples are dropped,
//! implausibly small steps reset the current lap, and both are counted for
//! diagnostics.
//!
//! # `no_std` Compatibility
//!
//! All state is fixed-size; nothing allocates.

mod corrector;
mod engine;
mod lookup;
mod weights;

pub use corrector::{Calibration, WeightMetrics};
pub use engine::{LapCalibrator, LapDirection};
pub use lookup::LookupTable;
pub use weights::Weights;

use crate::sensor::TICKS_PER_TURN;

/// Number of histogram bins per lap.
pub const BIN_COUNT: usize = 36;

/// Weight given to each accepted lap when blending into the histogram.
pub const LEARNING_RATE: f32 = 0.02;

/// Fewest calls in a lap for it to be trusted (one per bin).
pub const MIN_SAMPLES: f32 = 36.0;

/// Most calls in a lap for it to be trusted. Slower laps are dominated by
/// hesitation rather than wheel geometry.
pub const MAX_SAMPLES: f32 = 1000.0;

/// A step of one tick or less is treated as a sensor glitch.
///
/// Positions only ever move in whole ticks, so the bound sits halfway
/// between one and two ticks. A one-tick step is mostly quantisation and
/// estimator noise. The cost is that creep slower than about two ticks per
/// report (roughly 0.55 turns/s at the default report rate) never teaches
/// the histogram; the current lap restarts on every such step instead.
pub const MIN_STEP_LAPS: f32 = 1.5 / TICKS_PER_TURN as f32;

/// Tuning for [`LapCalibrator`].
///
/// [`CalibrationConfig::default()`] reproduces the firmware constants.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    /// Blend rate α for accepted laps. Default: 0.02.
    pub learning_rate: f32,
    /// Lower bound on a lap's accumulated mass. Default: 36.
    pub min_samples: f32,
    /// Upper bound on a lap's accumulated mass. Default: 1000.
    pub max_samples: f32,
    /// Steps with magnitude below this, in laps, are glitches.
    /// Default: one and a half ticks.
    pub min_step_laps: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            learning_rate: LEARNING_RATE,
            min_samples: MIN_SAMPLES,
            max_samples: MAX_SAMPLES,
            min_step_laps: MIN_STEP_LAPS,
        }
    }
}
