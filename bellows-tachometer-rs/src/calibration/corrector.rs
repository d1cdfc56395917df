use super::{CalibrationConfig, LapCalibrator, LookupTable, Weights, BIN_COUNT};

/// Diagnostic snapshot returned by every calibration update.
///
/// One bin is reported per call, cycling through all bins, so a slow
/// diagnostic stream eventually shows the whole histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WeightMetrics {
    /// Laps blended so far. Changes whenever the weights change.
    pub update_count: u32,
    /// Bin examined this call.
    pub bin: usize,
    /// Current weight of `bin`.
    pub bin_weight: f32,
    /// How far `bin`'s corrected width deviates from a uniform bin.
    pub bin_correction: f32,
}

/// Learns the wheel's non-uniformity and corrects raw positions.
///
/// Owned entirely by the consumer core. Feed every raw position to
/// [`update`](Self::update) (or use [`process`](Self::process)) and call
/// [`adjust`](Self::adjust) wherever a corrected position is needed. The
/// lookup table is rebuilt lazily, only after the weights have changed.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    calibrator: LapCalibrator,
    lookup: LookupTable,
    next_bin: usize,
}

impl Calibration {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            calibrator: LapCalibrator::new(config),
            lookup: LookupTable::new(),
            next_bin: 0,
        }
    }

    /// Observe a raw position and report on the next diagnostic bin.
    pub fn update(&mut self, laps: f32) -> WeightMetrics {
        self.calibrator.update(laps);
        self.refresh();

        let bin = self.next_bin;
        self.next_bin = (bin + 1) % BIN_COUNT;
        WeightMetrics {
            update_count: self.calibrator.update_count(),
            bin,
            bin_weight: self.calibrator.weights().get(bin as i32),
            bin_correction: self.lookup.bin_correction(bin),
        }
    }

    /// Corrected position for a raw position in laps.
    ///
    /// Monotonic in `laps`, and whole laps map to themselves.
    pub fn adjust(&mut self, laps: f32) -> f32 {
        self.refresh();
        self.lookup.interpolate(laps)
    }

    /// Update with `laps`, then return its corrected value and the metrics.
    pub fn process(&mut self, laps: f32) -> (f32, WeightMetrics) {
        let metrics = self.update(laps);
        (self.adjust(laps), metrics)
    }

    fn refresh(&mut self) {
        let update_count = self.calibrator.update_count();
        if self.lookup.refresh(self.calibrator.weights(), update_count) {
            #[cfg(feature = "defmt")]
            defmt::trace!("calibration: lookup rebuilt for update {=u32}", update_count);
        }
    }

    pub fn calibrator(&self) -> &LapCalibrator {
        &self.calibrator
    }

    pub fn weights(&self) -> &Weights {
        self.calibrator.weights()
    }

    pub fn lookup(&self) -> &LookupTable {
        &self.lookup
    }
}
