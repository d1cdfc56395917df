//! Error types for the acquisition side.

use core::fmt;

/// Errors raised while reading the quadrature sensor.
///
/// None of these stop the acquisition loop; they are counted in the
/// [`Report`](super::Report) and logged.
#[derive(Debug, PartialEq, Eq)]
pub enum SensorError<E> {
    /// Underlying ADC conversion error.
    Adc(E),
}

// Allow ergonomic `?` propagation from raw ADC errors.
impl<E> From<E> for SensorError<E> {
    fn from(error: E) -> Self {
        SensorError::Adc(error)
    }
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SensorError::Adc(e) => write!(f, "ADC error: {:?}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for SensorError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            SensorError::Adc(e) => defmt::write!(f, "ADC error: {}", e),
        }
    }
}
