use super::TICKS_PER_TURN;

/// One authoritative sample of the quadrature pair.
///
/// Produced once per scheduler tick and never modified afterwards. All
/// durations are in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Raw ADC value of channel A.
    pub a: u16,
    /// Raw ADC value of channel B (90° out of phase with A).
    pub b: u16,
    /// Estimated angle, `0 <= theta < TICKS_PER_TURN`.
    pub theta: i32,
    /// Signed angle change since the previous sample, wrap removed.
    pub theta_change: i32,
    /// Completed laps (signed).
    pub laps: i32,

    /// How late the read started relative to its schedule.
    pub jitter: u32,
    /// Duration of the channel A conversion.
    pub a_read_time: u32,
    /// Duration of the channel B conversion.
    pub b_read_time: u32,
    /// From the end of the jitter wait to the end of the read.
    pub total_read_time: u32,
}

impl Reading {
    /// Continuous raw position in laps: `laps + theta / TICKS_PER_TURN`.
    ///
    /// The sum is an `f32`, so its resolution shrinks as `|laps|` grows.
    /// Up to 4096 laps either way, the difference of two positions is
    /// within half a tick of the true tick count; beyond that, single-tick
    /// steps start to blur. That is over half an hour of continuous
    /// one-way rotation at 2 turns/s. Consumers that need exact steps over
    /// longer spans should use `laps` and `theta` directly.
    #[inline]
    pub fn position(&self) -> f32 {
        self.laps as f32 + self.theta as f32 / TICKS_PER_TURN as f32
    }
}

/// Summary of one aggregation window of readings.
///
/// Filled in place by the acquisition core, then copied once into the
/// consumer's buffer by the [`ReportChannel`](super::ReportChannel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Report {
    /// Most recent reading in the window.
    pub last: Reading,
    /// Readings folded into this report.
    pub samples: u32,
    /// Sum of `theta_change` across the window.
    pub theta_change: i32,
    /// Worst scheduling jitter in the window.
    pub max_jitter: u32,
    /// Least idle time before a deadline (worst-case slack).
    pub min_idle: u32,
    /// Most idle time before a deadline.
    pub max_idle: u32,
    /// Time the acquisition core waited for a destination buffer.
    pub send_time: u32,
    /// ADC conversions that failed and reused the previous value.
    pub read_errors: u32,
    /// Index of this report since start-up.
    pub sequence: u32,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            last: Reading::default(),
            samples: 0,
            theta_change: 0,
            max_jitter: 0,
            min_idle: u32::MAX,
            max_idle: 0,
            send_time: 0,
            read_errors: 0,
            sequence: 0,
        }
    }
}

impl Report {
    /// Reset the aggregation window. `last` and `sequence` are kept.
    pub fn clear(&mut self) {
        self.samples = 0;
        self.theta_change = 0;
        self.max_jitter = 0;
        self.min_idle = u32::MAX;
        self.max_idle = 0;
        self.send_time = 0;
        self.read_errors = 0;
    }

    /// Fold one reading and the idle time that preceded it into the window.
    #[inline]
    pub fn add(&mut self, reading: &Reading, idle: u32) {
        self.samples += 1;
        self.theta_change += reading.theta_change;
        self.max_jitter = self.max_jitter.max(reading.jitter);
        self.min_idle = self.min_idle.min(idle);
        self.max_idle = self.max_idle.max(idle);
        self.last = *reading;
    }

    /// Continuous raw position at the end of the window.
    pub fn position(&self) -> f32 {
        self.last.position()
    }
}
