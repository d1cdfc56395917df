use libm::floorf;

use super::BIN_COUNT;

/// Circular histogram over one lap.
///
/// Bin indices wrap modulo [`BIN_COUNT`] in both directions, so positions
/// in any lap (including negative laps) land in the right bin.
///
/// **Invariant:** `total` is the sum of all bins.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Weights {
    bins: [f32; BIN_COUNT],
    total: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self::uniform()
    }
}

impl Weights {
    /// Every bin set to `value`.
    pub fn filled(value: f32) -> Self {
        let mut weights = Self {
            bins: [0.0; BIN_COUNT],
            total: 0.0,
        };
        weights.fill(value);
        weights
    }

    /// The start-up prior: `1 / BIN_COUNT` per bin, total 1.
    pub fn uniform() -> Self {
        Self::filled(1.0 / BIN_COUNT as f32)
    }

    /// All zero.
    pub fn empty() -> Self {
        Self::filled(0.0)
    }

    /// Set every bin to `value`.
    pub fn fill(&mut self, value: f32) {
        self.bins = [value; BIN_COUNT];
        self.total = value * BIN_COUNT as f32;
    }

    /// Sum of all bins.
    pub fn total(&self) -> f32 {
        self.total
    }

    /// Bin contents in index order.
    pub fn bins(&self) -> &[f32; BIN_COUNT] {
        &self.bins
    }

    /// Value of bin `index` (wrapped).
    pub fn get(&self, index: i32) -> f32 {
        self.bins[wrap(index)]
    }

    /// Add `value` to bin `index` (wrapped).
    #[inline]
    pub fn add(&mut self, index: i32, value: f32) {
        self.bins[wrap(index)] += value;
        self.total += value;
    }

    /// Spread `value` over the range between two positions given in laps.
    ///
    /// Each bin receives mass in proportion to how much of the range it
    /// overlaps, so continuous coverage turns into a histogram without
    /// snapping to bin edges. The order of `start` and `end` does not
    /// matter. The total always grows by exactly `value`.
    #[inline]
    pub fn add_range(&mut self, start: f32, end: f32, value: f32) {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        let start = start * BIN_COUNT as f32;
        let end = end * BIN_COUNT as f32;
        let start_bin = floorf(start) as i32;
        let end_bin = floorf(end) as i32;

        if start_bin == end_bin {
            self.add(start_bin, value);
            return;
        }

        let density = value / (end - start);
        self.add(start_bin, density * ((start_bin + 1) as f32 - start));
        self.add(end_bin, density * (end - end_bin as f32));
        for bin in start_bin + 1..end_bin {
            self.add(bin, density);
        }
    }

    /// Exponentially blend a completed lap into these weights.
    ///
    /// `self = self * (1 - rate) + next * (rate / next.total)`. The lap is
    /// normalised first, so a histogram with total 1 keeps total 1. Does
    /// nothing if `next` is empty.
    pub fn blend(&mut self, next: &Weights, rate: f32) {
        if next.total <= 0.0 {
            return;
        }
        let keep = 1.0 - rate;
        let scale = rate / next.total;
        for (bin, &incoming) in self.bins.iter_mut().zip(next.bins.iter()) {
            *bin = *bin * keep + incoming * scale;
        }
        self.total = self.bins.iter().sum();
    }
}

#[inline]
fn wrap(index: i32) -> usize {
    index.rem_euclid(BIN_COUNT as i32) as usize
}
