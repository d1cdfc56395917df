//! The fixed-period acquisition loop.

use embassy_sync::blocking_mutex::raw::RawMutex;

use super::channel::ReportChannel;
use super::error::SensorError;
use super::hardware::{MicrosClock, QuadratureInput, SiblingCore};
use super::laps::LapCounter;
use super::phase::approximate_phase;
use super::report::{Reading, Report};
use super::{
    DEFAULT_MIDPOINT, SAMPLES_PER_REPORT, SAMPLE_PERIOD_US, WAKE_MARGIN_US, WARMUP_READS,
};

// ── SchedulerConfig ──────────────────────────────────────────────────────

/// Timing and front-end settings for [`Acquisition`].
///
/// [`SchedulerConfig::default()`] reproduces the firmware constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerConfig {
    /// Time between authoritative reads in µs. Default: 1000.
    pub sample_period_us: u32,
    /// Readings per report. Default: 5.
    pub samples_per_report: u32,
    /// Stop idling this many µs before a deadline. Default: 110.
    pub wake_margin_us: u32,
    /// Settling reads at start-up. Default: 10.
    pub warmup_reads: u32,
    /// ADC value treated as zero on channel A. Default: 1200.
    pub a_midpoint: i32,
    /// ADC value treated as zero on channel B. Default: 1200.
    pub b_midpoint: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sample_period_us: SAMPLE_PERIOD_US,
            samples_per_report: SAMPLES_PER_REPORT,
            wake_margin_us: WAKE_MARGIN_US,
            warmup_reads: WARMUP_READS,
            a_midpoint: DEFAULT_MIDPOINT,
            b_midpoint: DEFAULT_MIDPOINT,
        }
    }
}

// ── Acquisition ──────────────────────────────────────────────────────────

/// Fixed-period sampler for the quadrature sensor.
///
/// Owns everything the acquisition core touches: the clock, the ADC pair,
/// the handle that pauses the sibling core, the lap counter and the report
/// being filled. Nothing here is shared with the consumer core except
/// through [`ReportChannel`].
///
/// # Lifecycle
///
/// 1. [`Acquisition::new()`]: no hardware access.
/// 2. [`Acquisition::start()`]: settle the front-end and seed the lap counter.
/// 3. [`Acquisition::sample()`] once per period, or [`Acquisition::run()`]
///    to loop forever and push every report through a channel.
pub struct Acquisition<C, S: QuadratureInput, P> {
    clock: C,
    input: S,
    sibling: P,
    config: SchedulerConfig,

    laps: LapCounter,
    /// Last well-defined angle; reused for degenerate samples.
    theta: i32,
    /// Last successful conversions; reused when a conversion fails.
    raw_a: u16,
    raw_b: u16,
    /// Most recent failed conversion.
    last_error: Option<SensorError<S::Error>>,

    report: Report,
    sequence: u32,
    next_read_time: u64,
    /// When the previous sample finished processing.
    idle_since: u64,
}

impl<C, S, P> Acquisition<C, S, P>
where
    C: MicrosClock,
    S: QuadratureInput,
    P: SiblingCore,
{
    /// Construct the sampler. No hardware is touched until [`start`](Self::start).
    pub fn new(clock: C, input: S, sibling: P, config: SchedulerConfig) -> Self {
        Self {
            clock,
            input,
            sibling,
            config,
            laps: LapCounter::default(),
            theta: 0,
            raw_a: 0,
            raw_b: 0,
            last_error: None,
            report: Report::default(),
            sequence: 0,
            next_read_time: 0,
            idle_since: 0,
        }
    }

    /// Settle the analog front-end and arm the schedule.
    ///
    /// Takes `warmup_reads` reads with the sibling core paused, seeds the lap
    /// counter with the resulting angle so the first delta is zero, and
    /// schedules the first authoritative read one period from now.
    pub fn start(&mut self) {
        let mut reading = Reading::default();

        self.sibling.pause();
        for _ in 0..self.config.warmup_reads.max(1) {
            self.read_pair(&mut reading);
        }
        self.sibling.resume();

        self.resolve_theta(&reading);
        self.laps.seed(self.theta);
        self.report.clear();

        let now = self.clock.now_micros();
        self.next_read_time = now + self.config.sample_period_us as u64;
        self.idle_since = now;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Acquisition started: theta={}, a={}, b={}",
            self.theta,
            reading.a,
            reading.b
        );
    }

    /// Take one scheduled sample.
    ///
    /// Spins until the deadline, reads, updates the lap count and folds the
    /// reading into the current report. Returns the report once it holds
    /// `samples_per_report` readings; a fresh window starts immediately.
    ///
    /// Late samples are never skipped: jitter is recorded and the schedule
    /// keeps its fixed grid, so a stalled loop catches up on later ticks.
    pub fn sample(&mut self) -> Option<Report> {
        let deadline = self.next_read_time;
        let margin = self.config.wake_margin_us as i64;
        while self.micros_until(deadline) > margin {
            core::hint::spin_loop();
        }
        let idle = micros_between(self.idle_since, self.clock.now_micros());

        let mut reading = self.timed_read(deadline);

        self.resolve_theta(&reading);
        let (laps, theta_change) = self.laps.count(self.theta);
        reading.theta = self.theta;
        reading.laps = laps;
        reading.theta_change = theta_change;

        self.report.add(&reading, idle);
        self.next_read_time = deadline + self.config.sample_period_us as u64;
        self.idle_since = self.clock.now_micros();

        if self.report.samples < self.config.samples_per_report {
            return None;
        }

        let mut done = self.report;
        done.sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        self.report.clear();
        Some(done)
    }

    /// Sample until one report is complete, then deliver it.
    ///
    /// `send_time` in the delivered report is the time spent waiting for
    /// the consumer to supply a destination buffer.
    pub fn pump<M: RawMutex>(&mut self, channel: &ReportChannel<M>) {
        loop {
            if let Some(report) = self.sample() {
                let started = self.clock.now_micros();
                let clock = &self.clock;
                channel.push(|dest| {
                    *dest = report;
                    dest.send_time = micros_between(started, clock.now_micros());
                });
                return;
            }
        }
    }

    /// Start and sample forever. The only way out is a reset.
    pub fn run<M: RawMutex>(mut self, channel: &ReportChannel<M>) -> ! {
        self.start();
        loop {
            self.pump(channel);
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// When the next authoritative read is due, in clock microseconds.
    pub fn next_read_time(&self) -> u64 {
        self.next_read_time
    }

    /// Completed laps so far.
    pub fn laps(&self) -> i32 {
        self.laps.laps()
    }

    /// Active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The most recent failed conversion, if any has failed since start-up.
    pub fn last_error(&self) -> Option<&SensorError<S::Error>> {
        self.last_error.as_ref()
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Positive while `deadline` is still in the future.
    #[inline]
    fn micros_until(&self, deadline: u64) -> i64 {
        deadline as i64 - self.clock.now_micros() as i64
    }

    /// Warm-up read, wait for the deadline, authoritative read; all with
    /// the sibling core paused.
    #[inline]
    fn timed_read(&mut self, deadline: u64) -> Reading {
        let mut reading = Reading::default();

        self.sibling.pause();
        self.read_pair(&mut reading);

        let (read_start, jitter) = loop {
            let now = self.clock.now_micros();
            if now >= deadline {
                break (now, micros_between(deadline, now));
            }
            core::hint::spin_loop();
        };

        self.read_pair(&mut reading);
        reading.jitter = jitter;
        self.sibling.resume();

        reading.total_read_time = micros_between(read_start, self.clock.now_micros());
        reading
    }

    /// Convert both channels into `reading`, timing each conversion.
    #[inline]
    fn read_pair(&mut self, reading: &mut Reading) {
        let start = self.clock.now_micros();
        match self.read_a() {
            Ok(value) => self.raw_a = value,
            Err(e) => self.read_failed(e),
        }
        let after_a = self.clock.now_micros();
        match self.read_b() {
            Ok(value) => self.raw_b = value,
            Err(e) => self.read_failed(e),
        }
        let after_b = self.clock.now_micros();

        reading.a = self.raw_a;
        reading.b = self.raw_b;
        reading.a_read_time = micros_between(start, after_a);
        reading.b_read_time = micros_between(after_a, after_b);
    }

    fn read_a(&mut self) -> Result<u16, SensorError<S::Error>> {
        Ok(self.input.read_a()?)
    }

    fn read_b(&mut self) -> Result<u16, SensorError<S::Error>> {
        Ok(self.input.read_b()?)
    }

    fn read_failed(&mut self, error: SensorError<S::Error>) {
        self.report.read_errors += 1;
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "Conversion failed, reusing previous value: {}",
            defmt::Display2Format(&error)
        );
        self.last_error = Some(error);
    }

    /// Update the tracked angle from a reading, keeping the previous angle
    /// when the centred pair sits exactly on the origin.
    #[inline]
    fn resolve_theta(&mut self, reading: &Reading) {
        let x = reading.a as i32 - self.config.a_midpoint;
        let y = reading.b as i32 - self.config.b_midpoint;
        if let Some(theta) = approximate_phase(x, y) {
            self.theta = theta;
        }
    }
}

/// Microseconds from `start` to `end`, saturating at both ends of `u32`.
#[inline]
fn micros_between(start: u64, end: u64) -> u32 {
    end.saturating_sub(start).min(u32::MAX as u64) as u32
}
