use super::{HALF_TURN, TICKS_PER_TURN};

const QUARTER_TURN: i32 = TICKS_PER_TURN / 4;
const EIGHTH_TURN: i32 = TICKS_PER_TURN / 8;

/// Estimate the wheel angle from two centred quadrature samples.
///
/// A very rough stand-in for `atan2(y, x)`: the plane is split into four
/// diagonal sectors and each sector uses a linear ratio of the two axes,
/// always dividing by the axis with the larger magnitude. The result is
/// continuous and non-decreasing around the circle, which is all the lap
/// counter and calibration need; the calibration removes the systematic
/// bias.
///
/// Returns an angle in `[0, TICKS_PER_TURN)`, or `None` when both inputs are
/// zero and the phase is undefined.
#[inline]
pub fn approximate_phase(x: i32, y: i32) -> Option<i32> {
    if x == 0 && y == 0 {
        return None;
    }

    // Divisors are always positive, so `div_euclid` rounds towards -inf and
    // the ratio stays monotonic across zero.
    let theta = if x >= y.abs() {
        (EIGHTH_TURN * y).div_euclid(x)
    } else if y >= x.abs() {
        QUARTER_TURN + (-EIGHTH_TURN * x).div_euclid(y)
    } else if -y >= x.abs() {
        -QUARTER_TURN + (EIGHTH_TURN * x).div_euclid(-y)
    } else {
        HALF_TURN + (-EIGHTH_TURN * y).div_euclid(-x)
    };

    Some(if theta < 0 { theta + TICKS_PER_TURN } else { theta })
}
