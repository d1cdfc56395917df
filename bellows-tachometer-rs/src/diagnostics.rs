//! Comma-separated diagnostic rows for the debug stream.
//!
//! The firmware prints [`HEADER`] once at start-up and then one
//! [`DiagnosticRow`] per diagnostics tick. Rows are formatted into a
//! fixed-capacity [`heapless::String`], so nothing allocates.

use core::fmt::{self, Write};

use heapless::String;

use crate::calibration::WeightMetrics;
use crate::sensor::Report;

/// Column names, in row order.
pub const HEADER: &str = "Sequence,Samples,Theta,ThetaChange,Laps,Adjusted,MaxJitter,MinIdle,MaxIdle,SendTime,ReadErrors,UpdateCount,Bin,BinWeight,BinCorrection";

/// Number of columns in [`HEADER`] and in every row.
pub const COLUMNS: usize = 15;

/// Capacity of a formatted row.
pub const LINE_CAPACITY: usize = 192;

/// Snapshot of one consumer iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiagnosticRow {
    pub sequence: u32,
    pub samples: u32,
    pub theta: i32,
    pub theta_change: i32,
    /// Raw position in laps.
    pub laps: f32,
    /// Calibrated position in laps.
    pub adjusted: f32,
    pub max_jitter: u32,
    pub min_idle: u32,
    pub max_idle: u32,
    pub send_time: u32,
    pub read_errors: u32,
    pub metrics: WeightMetrics,
}

impl DiagnosticRow {
    /// Collect a row from a received report and what calibration made of it.
    pub fn new(report: &Report, adjusted: f32, metrics: WeightMetrics) -> Self {
        Self {
            sequence: report.sequence,
            samples: report.samples,
            theta: report.last.theta,
            theta_change: report.theta_change,
            laps: report.position(),
            adjusted,
            max_jitter: report.max_jitter,
            min_idle: report.min_idle,
            max_idle: report.max_idle,
            send_time: report.send_time,
            read_errors: report.read_errors,
            metrics,
        }
    }

    /// Write the row, without a line terminator.
    pub fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "{}, {}, {}, {}, {:.4}, {:.4}, {}, {}, {}, {}, {}, {}, {}, {:.5}, {:.5}",
            self.sequence,
            self.samples,
            self.theta,
            self.theta_change,
            self.laps,
            self.adjusted,
            self.max_jitter,
            self.min_idle,
            self.max_idle,
            self.send_time,
            self.read_errors,
            self.metrics.update_count,
            self.metrics.bin,
            self.metrics.bin_weight,
            self.metrics.bin_correction,
        )
    }

    /// Format the row into a fixed-capacity string.
    ///
    /// Values too wide for [`LINE_CAPACITY`] are cut off rather than
    /// reported as an error.
    pub fn to_line(&self) -> String<LINE_CAPACITY> {
        let mut line = String::new();
        let _ = self.write_to(&mut line);
        line
    }
}
