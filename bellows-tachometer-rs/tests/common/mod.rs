//! Simulated wheel, clock and ADC pair for scenario tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bellows::sensor::{MicrosClock, QuadratureInput, DEFAULT_MIDPOINT};

/// Simulated time in microseconds, shared by the clock and the sensor.
#[derive(Debug, Clone, Default)]
pub struct SimTime(Arc<AtomicU64>);

impl SimTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn advance(&self, micros: u64) -> u64 {
        self.0.fetch_add(micros, Ordering::AcqRel) + micros
    }
}

/// Clock that moves simulated time forward a few microseconds per query,
/// like a busy-wait loop polling a hardware timer.
#[derive(Debug, Clone)]
pub struct SimClock {
    time: SimTime,
    step: u64,
}

impl SimClock {
    pub fn new(time: &SimTime, step: u64) -> Self {
        Self {
            time: time.clone(),
            step,
        }
    }
}

impl MicrosClock for SimClock {
    fn now_micros(&self) -> u64 {
        self.time.advance(self.step)
    }
}

/// Region of the true lap in which the magnet pattern runs fast.
#[derive(Debug, Clone, Copy)]
pub struct Warp {
    /// True lap fraction where the region starts.
    pub start: f64,
    /// Width of the region as a true lap fraction.
    pub width: f64,
    /// Raw angle speed inside the region relative to a uniform wheel.
    pub speed: f64,
}

impl Warp {
    /// Raw lap fraction for a true lap fraction. Whole laps are preserved.
    pub fn raw_fraction(&self, f: f64) -> f64 {
        let inside = self.width * self.speed;
        let outside = (1.0 - inside) / (1.0 - self.width);
        if f < self.start {
            f * outside
        } else if f < self.start + self.width {
            self.start * outside + (f - self.start) * self.speed
        } else {
            self.start * outside + inside + (f - self.start - self.width) * outside
        }
    }
}

/// Quadrature sensor on a wheel turning at constant speed.
///
/// Channel A follows the cosine and channel B the sine of the raw magnet
/// angle, centred on [`DEFAULT_MIDPOINT`].
#[derive(Debug, Clone)]
pub struct SimSensor {
    time: SimTime,
    turns_per_second: f64,
    amplitude: f64,
    midpoint: f64,
    warp: Option<Warp>,
}

impl SimSensor {
    pub fn new(time: &SimTime, turns_per_second: f64) -> Self {
        Self {
            time: time.clone(),
            turns_per_second,
            amplitude: 800.0,
            midpoint: DEFAULT_MIDPOINT as f64,
            warp: None,
        }
    }

    pub fn with_warp(mut self, warp: Warp) -> Self {
        self.warp = Some(warp);
        self
    }

    /// True position in laps at the current simulated time.
    pub fn true_laps(&self) -> f64 {
        self.time.now() as f64 * 1e-6 * self.turns_per_second
    }

    /// Raw magnet angle as a lap fraction.
    fn raw_fraction(&self) -> f64 {
        let laps = self.true_laps();
        let f = laps - laps.floor();
        match self.warp {
            Some(warp) => warp.raw_fraction(f),
            None => f,
        }
    }

    fn channel(&self, phase: f64) -> u16 {
        (self.midpoint + self.amplitude * phase).round() as u16
    }
}

impl QuadratureInput for SimSensor {
    type Error = Infallible;

    fn read_a(&mut self) -> Result<u16, Infallible> {
        Ok(self.channel((TAU * self.raw_fraction()).cos()))
    }

    fn read_b(&mut self) -> Result<u16, Infallible> {
        Ok(self.channel((TAU * self.raw_fraction()).sin()))
    }
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
