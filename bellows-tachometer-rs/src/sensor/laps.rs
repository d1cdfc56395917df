use super::{HALF_TURN, TICKS_PER_TURN};

/// Tracks wraparound of the phase estimate into a signed lap count.
///
/// Any step larger than half a turn is read as a wrap in the opposite
/// direction. This only holds while the wheel moves less than half a turn
/// between samples, which bounds the usable rotation speed by the sample
/// rate (at 1 kHz and 720 ticks per turn: 500 turns per second).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LapCounter {
    laps: i32,
    prev_theta: i32,
}

impl LapCounter {
    /// Start counting from `theta` with zero completed laps.
    pub fn new(theta: i32) -> Self {
        Self {
            laps: 0,
            prev_theta: theta,
        }
    }

    /// Re-seed the previous angle without touching the lap count.
    pub fn seed(&mut self, theta: i32) {
        self.prev_theta = theta;
    }

    /// Completed laps so far (signed).
    pub fn laps(&self) -> i32 {
        self.laps
    }

    /// Fold in a new angle.
    ///
    /// Returns `(laps, theta_change)`: the cumulative lap count after this
    /// sample, and the signed angular change since the previous one with
    /// any wrap removed.
    #[inline]
    pub fn count(&mut self, theta: i32) -> (i32, i32) {
        let mut change = theta - self.prev_theta;
        if change < -HALF_TURN {
            self.laps += 1;
            change += TICKS_PER_TURN;
        } else if change > HALF_TURN {
            self.laps -= 1;
            change -= TICKS_PER_TURN;
        }
        self.prev_theta = theta;
        (self.laps, change)
    }
}

impl Default for LapCounter {
    fn default() -> Self {
        Self::new(0)
    }
}
