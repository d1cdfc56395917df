use libm::floorf;

use super::{Weights, BIN_COUNT};

/// Piecewise-linear map from raw lap fraction to corrected lap fraction.
///
/// `offsets[i]` is the corrected fraction of a lap at the start of raw bin
/// `i`. `offsets[0] = 0`, `offsets[BIN_COUNT] = 1`, and the sequence never
/// decreases, so whole laps map to themselves and the mapping is monotonic.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LookupTable {
    offsets: [f32; BIN_COUNT + 1],
    built_for: Option<u32>,
    rebuilds: u32,
}

impl Default for LookupTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupTable {
    /// Identity table, not yet built from any weights.
    pub fn new() -> Self {
        let mut offsets = [0.0; BIN_COUNT + 1];
        for (i, offset) in offsets.iter_mut().enumerate() {
            *offset = i as f32 / BIN_COUNT as f32;
        }
        Self {
            offsets,
            built_for: None,
            rebuilds: 0,
        }
    }

    /// Rebuild from `weights` unless the table already reflects
    /// `update_count`. Returns `true` if a rebuild happened.
    pub fn refresh(&mut self, weights: &Weights, update_count: u32) -> bool {
        if self.built_for == Some(update_count) {
            return false;
        }
        self.rebuild(weights);
        self.built_for = Some(update_count);
        true
    }

    /// Recompute the offsets as the running sum of normalised bin weights.
    ///
    /// Negative bins are treated as empty. An empty histogram produces the
    /// identity table.
    pub fn rebuild(&mut self, weights: &Weights) {
        self.rebuilds = self.rebuilds.wrapping_add(1);

        let total: f32 = weights.bins().iter().map(|w| w.max(0.0)).sum();
        if total <= 0.0 || !total.is_finite() {
            *self = Self {
                built_for: self.built_for,
                rebuilds: self.rebuilds,
                ..Self::new()
            };
            return;
        }

        let mut running = 0.0;
        self.offsets[0] = 0.0;
        for (i, &w) in weights.bins().iter().enumerate() {
            running += w.max(0.0);
            self.offsets[i + 1] = (running / total).min(1.0);
        }
        self.offsets[BIN_COUNT] = 1.0;
    }

    /// Map a raw position in laps to a corrected one.
    ///
    /// The whole-lap part passes through unchanged. The fraction is located
    /// in its raw bin and interpolated between that bin's two offsets.
    pub fn interpolate(&self, laps: f32) -> f32 {
        let whole = floorf(laps);
        let position = (laps - whole) * BIN_COUNT as f32;
        let bin = (floorf(position) as usize).min(BIN_COUNT - 1);
        let within = position - bin as f32;

        let low = self.offsets[bin];
        let high = self.offsets[bin + 1];
        whole + low + (high - low) * within
    }

    /// Corrected width of raw bin `bin` minus the uniform width.
    ///
    /// Positive when the bin covers more than its share of true rotation.
    pub fn bin_correction(&self, bin: usize) -> f32 {
        let bin = bin % BIN_COUNT;
        (self.offsets[bin + 1] - self.offsets[bin]) - 1.0 / BIN_COUNT as f32
    }

    pub fn offsets(&self) -> &[f32; BIN_COUNT + 1] {
        &self.offsets
    }

    /// Update count the table was last built for.
    pub fn built_for(&self) -> Option<u32> {
        self.built_for
    }

    /// Number of rebuilds since construction.
    pub fn rebuilds(&self) -> u32 {
        self.rebuilds
    }
}
