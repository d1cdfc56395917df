use super::{CalibrationConfig, Weights};

/// Direction of travel the calibrator is currently following.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LapDirection {
    /// Not tracking a lap. The next step picks a direction.
    #[default]
    None,
    /// Laps increasing.
    Up,
    /// Laps decreasing.
    Down,
}

impl LapDirection {
    /// Direction of a signed step. A zero step has no direction.
    pub fn of(delta: f32) -> Self {
        if delta > 0.0 {
            Self::Up
        } else if delta < 0.0 {
            Self::Down
        } else {
            Self::None
        }
    }

    /// `+1.0`, `-1.0` or `0.0`.
    pub fn sign(self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Up => 1.0,
            Self::Down => -1.0,
        }
    }
}

/// Learns per-bin traversal weights from a stream of raw lap positions.
///
/// Each call to [`update`](Self::update) is one observation of the wheel.
/// While motion stays in one direction, the raw range covered by each step
/// is spread into a partial histogram with one unit of mass per step. Once
/// the position has travelled a full lap from where the direction was
/// picked up, the partial histogram describes that lap and is blended into
/// the persistent weights on the following call.
///
/// Reversals and zero steps restart the lap. Laps whose accumulated mass
/// falls outside `[min_samples, max_samples]` are discarded, and steps
/// narrower than `min_step_laps` are treated as glitches.
#[derive(Debug, Clone)]
pub struct LapCalibrator {
    config: CalibrationConfig,
    weights: Weights,
    partial: Weights,
    direction: LapDirection,
    finish_line: f32,
    prev: Option<f32>,
    found_lap: bool,
    update_count: u32,
    rejected_laps: u32,
    glitches: u32,
}

impl Default for LapCalibrator {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

impl LapCalibrator {
    /// Start from the uniform prior.
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            weights: Weights::uniform(),
            partial: Weights::empty(),
            direction: LapDirection::None,
            finish_line: 0.0,
            prev: None,
            found_lap: false,
            update_count: 0,
            rejected_laps: 0,
            glitches: 0,
        }
    }

    /// Observe the next raw position in laps.
    pub fn update(&mut self, laps: f32) {
        if !laps.is_finite() {
            self.glitches += 1;
            self.direction = LapDirection::None;
            return;
        }

        let Some(prev) = self.prev else {
            self.prev = Some(laps);
            return;
        };
        let delta = laps - prev;

        if self.found_lap {
            self.finish_lap();
        }

        let direction = LapDirection::of(delta);
        if self.direction == LapDirection::None || direction != self.direction {
            self.restart(direction, laps);
            return;
        }

        if delta.abs() < self.config.min_step_laps {
            self.glitches += 1;
            #[cfg(feature = "defmt")]
            defmt::debug!("calibration: glitch step {=f32} at {=f32}", delta, laps);
            self.direction = LapDirection::None;
            self.prev = Some(laps);
            return;
        }

        let crossed = match self.direction {
            LapDirection::Up => laps >= self.finish_line,
            LapDirection::Down => laps <= self.finish_line,
            LapDirection::None => false,
        };

        if crossed {
            // Only the share of the step before the line belongs to this lap.
            let share = (self.finish_line - prev) / delta;
            self.partial.add_range(prev, self.finish_line, share);
            self.found_lap = true;
            self.direction = LapDirection::None;
        } else {
            self.partial.add_range(prev, laps, 1.0);
        }
        self.prev = Some(laps);
    }

    fn restart(&mut self, direction: LapDirection, laps: f32) {
        self.direction = direction;
        self.partial.fill(0.0);
        self.finish_line = laps + direction.sign();
        self.prev = Some(laps);
    }

    fn finish_lap(&mut self) {
        self.found_lap = false;
        let mass = self.partial.total();
        if mass >= self.config.min_samples && mass <= self.config.max_samples {
            self.weights.blend(&self.partial, self.config.learning_rate);
            self.update_count = self.update_count.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::trace!("calibration: lap {=u32} blended, mass {=f32}", self.update_count, mass);
        } else {
            self.rejected_laps += 1;
            #[cfg(feature = "defmt")]
            defmt::debug!("calibration: lap rejected, mass {=f32}", mass);
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Persistent, learned weights.
    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Histogram of the lap in progress.
    pub fn partial(&self) -> &Weights {
        &self.partial
    }

    pub fn direction(&self) -> LapDirection {
        self.direction
    }

    /// Position that completes the current lap.
    pub fn finish_line(&self) -> f32 {
        self.finish_line
    }

    /// `true` between crossing the finish line and the next call.
    pub fn lap_pending(&self) -> bool {
        self.found_lap
    }

    /// Number of laps blended into the weights. Changes whenever the
    /// weights change.
    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    pub fn rejected_laps(&self) -> u32 {
        self.rejected_laps
    }

    pub fn glitches(&self) -> u32 {
        self.glitches
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::BIN_COUNT;
    use crate::sensor::{Reading, TICKS_PER_TURN};

    fn close(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    /// Feed `count` evenly spaced positions starting at `start` and return
    /// the last one.
    fn sweep(cal: &mut LapCalibrator, start: f32, step: f32, count: usize) -> f32 {
        let mut pos = start;
        let mut last = start;
        for _ in 0..count {
            cal.update(pos);
            last = pos;
            pos += step;
        }
        last
    }

    // ── Direction tracking ───────────────────────────────────────────

    #[test]
    fn direction_of_step() {
        assert_eq!(LapDirection::of(0.1), LapDirection::Up);
        assert_eq!(LapDirection::of(-0.1), LapDirection::Down);
        assert_eq!(LapDirection::of(0.0), LapDirection::None);
        assert_eq!(LapDirection::Down.sign(), -1.0);
    }

    #[test]
    fn first_call_only_records_position() {
        let mut cal = LapCalibrator::default();
        cal.update(3.25);
        assert_eq!(cal.direction(), LapDirection::None);
        assert_eq!(cal.partial().total(), 0.0);
    }

    #[test]
    fn first_step_sets_direction_and_finish_line() {
        let mut cal = LapCalibrator::default();
        cal.update(0.0);
        cal.update(0.25);
        assert_eq!(cal.direction(), LapDirection::Up);
        assert_eq!(cal.finish_line(), 1.25);

        let mut cal = LapCalibrator::default();
        cal.update(0.0);
        cal.update(-0.25);
        assert_eq!(cal.direction(), LapDirection::Down);
        assert_eq!(cal.finish_line(), -1.25);
    }

    #[test]
    fn each_step_adds_one_unit_of_mass() {
        let mut cal = LapCalibrator::default();
        sweep(&mut cal, 0.0, 0.01, 12);
        // First call records, second picks the direction, the rest add mass.
        assert!(close(cal.partial().total(), 10.0, 1e-4));
    }

    #[test]
    fn reversal_restarts_partial() {
        let mut cal = LapCalibrator::default();
        let end = sweep(&mut cal, 0.0, 0.01, 30);
        assert!(cal.partial().total() > 0.0);

        cal.update(end - 0.01);
        assert_eq!(cal.direction(), LapDirection::Down);
        assert_eq!(cal.partial().total(), 0.0);
        assert!(close(cal.finish_line(), end - 1.01, 1e-5));
    }

    #[test]
    fn stop_restarts_partial() {
        let mut cal = LapCalibrator::default();
        let end = sweep(&mut cal, 0.0, 0.01, 30);
        cal.update(end);
        assert_eq!(cal.direction(), LapDirection::None);
        assert_eq!(cal.partial().total(), 0.0);
    }

    // ── Lap completion ───────────────────────────────────────────────

    #[test]
    fn crossing_finish_line_marks_lap() {
        let mut cal = LapCalibrator::default();
        cal.update(0.0);
        cal.update(0.5);
        let mut pos = 0.5;
        while !cal.lap_pending() {
            pos += 0.02;
            cal.update(pos);
            assert!(pos < 2.0, "lap never completed");
        }
        assert_eq!(cal.direction(), LapDirection::None);
        // 50 steps of 0.02 cover the lap exactly, within rounding.
        assert!(close(cal.partial().total(), 50.0, 0.5));
        assert_eq!(cal.update_count(), 0);

        cal.update(pos + 0.02);
        assert!(!cal.lap_pending());
        assert_eq!(cal.update_count(), 1);
        assert_eq!(cal.direction(), LapDirection::Up);
    }

    #[test]
    fn crossing_step_contributes_its_share() {
        let mut cal = LapCalibrator::default();
        cal.update(0.0);
        cal.update(0.0); // stationary: direction stays None
        cal.update(0.5); // Up, finish at 1.5
        cal.update(1.25);
        let before = cal.partial().total();
        cal.update(1.75); // half of this step lies past the line
        assert!(cal.lap_pending());
        assert!(close(cal.partial().total() - before, 0.5, 1e-5));
    }

    #[test]
    fn one_blend_per_lap_of_steady_motion() {
        let mut cal = LapCalibrator::default();
        sweep(&mut cal, 0.0, 0.01, 1000);
        assert!((8..=10).contains(&cal.update_count()), "updates = {}", cal.update_count());
        assert_eq!(cal.rejected_laps(), 0);
        assert_eq!(cal.glitches(), 0);
    }

    #[test]
    fn steady_motion_keeps_uniform_weights() {
        let mut cal = LapCalibrator::default();
        sweep(&mut cal, 0.0, 0.01, 3000);
        let w = cal.weights();
        assert!(close(w.total(), 1.0, 1e-4));
        for i in 0..BIN_COUNT as i32 {
            assert!(close(w.get(i), 1.0 / BIN_COUNT as f32, 1e-3), "bin {} = {}", i, w.get(i));
        }
    }

    #[test]
    fn downward_laps_are_learned_too() {
        let mut cal = LapCalibrator::default();
        sweep(&mut cal, 0.0, -0.01, 1000);
        assert!(cal.update_count() >= 8);
    }

    // ── Data quality ─────────────────────────────────────────────────

    #[test]
    fn fast_laps_are_rejected() {
        let mut cal = LapCalibrator::default();
        // 20 samples per lap: fewer than one per bin.
        sweep(&mut cal, 0.0, 0.05, 200);
        assert_eq!(cal.update_count(), 0);
        assert!(cal.rejected_laps() >= 5);
        assert_eq!(cal.weights(), &Weights::uniform());
    }

    #[test]
    fn slow_laps_are_rejected() {
        let mut cal = LapCalibrator::new(CalibrationConfig {
            max_samples: 100.0,
            ..CalibrationConfig::default()
        });
        // 200 samples per lap.
        sweep(&mut cal, 0.0, 0.005, 900);
        assert_eq!(cal.update_count(), 0);
        assert!(cal.rejected_laps() >= 3);
    }

    #[test]
    fn tiny_steps_are_glitches() {
        let mut cal = LapCalibrator::default();
        let last = sweep(&mut cal, 0.0, 0.01, 20);
        let pos = last + cal.config().min_step_laps * 0.25;
        cal.update(pos);
        assert_eq!(cal.glitches(), 1);
        assert_eq!(cal.direction(), LapDirection::None);

        // Motion resumes with a fresh lap.
        cal.update(pos + 0.01);
        assert_eq!(cal.direction(), LapDirection::Up);
        assert_eq!(cal.partial().total(), 0.0);
    }

    #[test]
    fn single_tick_steps_are_glitches() {
        // Positions as the acquisition side produces them: whole ticks.
        let at = |tick: i32| {
            Reading {
                theta: tick.rem_euclid(TICKS_PER_TURN),
                laps: tick.div_euclid(TICKS_PER_TURN),
                ..Reading::default()
            }
            .position()
        };

        // A one-tick crawl: every step that would add mass is a glitch, and
        // the step after it only picks the direction again.
        let mut cal = LapCalibrator::default();
        for tick in 700..760 {
            cal.update(at(tick));
        }
        assert_eq!(cal.glitches(), 29);
        assert_eq!(cal.partial().total(), 0.0);

        let mut cal = LapCalibrator::default();
        for tick in (700..820).step_by(2) {
            cal.update(at(tick));
        }
        assert_eq!(cal.glitches(), 0);
        assert_eq!(cal.direction(), LapDirection::Up);
        assert!(cal.partial().total() > 0.0);

        let mut cal = LapCalibrator::default();
        for tick in (0..60).rev() {
            cal.update(at(tick));
        }
        assert_eq!(cal.glitches(), 29);
        assert_eq!(cal.partial().total(), 0.0);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut cal = LapCalibrator::default();
        sweep(&mut cal, 0.0, 0.01, 10);
        cal.update(f32::NAN);
        cal.update(f32::INFINITY);
        assert_eq!(cal.glitches(), 2);
        assert!(cal.weights().total().is_finite());
        assert!(cal.partial().total().is_finite());
    }

    // ── Learning ─────────────────────────────────────────────────────

    #[test]
    fn slow_half_of_the_wheel_gains_weight() {
        let mut cal = LapCalibrator::new(CalibrationConfig {
            learning_rate: 0.2,
            ..CalibrationConfig::default()
        });
        // Raw angle moves half as fast through the first half of each lap,
        // so that half represents two thirds of the true rotation.
        let mut pos = 0.0f32;
        for _ in 0..60 * 188 {
            cal.update(pos);
            let frac = pos - libm::floorf(pos);
            pos += if frac < 0.5 { 0.004 } else { 0.008 };
        }

        assert!(cal.update_count() > 40);
        let w = cal.weights();
        let slow: f32 = (0..BIN_COUNT as i32 / 2).map(|i| w.get(i)).sum();
        assert!(close(slow, 2.0 / 3.0, 0.02), "slow half = {}", slow);
        assert!(close(w.total(), 1.0, 1e-3));
    }
}
