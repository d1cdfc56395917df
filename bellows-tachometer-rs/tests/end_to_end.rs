//! Full pipeline on simulated hardware: acquisition, report handoff and
//! calibration, single-threaded.

mod common;

use bellows::sensor::{Acquisition, NoSibling, Report, ReportChannel, SchedulerConfig};
use bellows::Calibration;
use common::{variance, SimClock, SimSensor, SimTime, Warp};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

const CLOCK_STEP_US: u64 = 7;

/// Raw and adjusted positions of every report, plus the calibrator's
/// counters at the end of the run.
struct Trace {
    raw: Vec<f64>,
    adjusted: Vec<f64>,
    theta_changes: Vec<i32>,
    samples: u32,
    update_count: u32,
    glitches: u32,
}

fn deltas(positions: &[f64]) -> Vec<f64> {
    positions.windows(2).map(|w| w[1] - w[0]).collect()
}

fn run(sensor: SimSensor, time: &SimTime, reports: u32) -> Trace {
    let config = SchedulerConfig::default();
    let mut acquisition = Acquisition::new(
        SimClock::new(time, CLOCK_STEP_US),
        sensor,
        NoSibling,
        config,
    );
    acquisition.start();

    let channel: &'static ReportChannel<CriticalSectionRawMutex> =
        Box::leak(Box::new(ReportChannel::new()));
    channel.begin(Box::leak(Box::new(Report::default())));
    let mut held: &'static mut Report = Box::leak(Box::new(Report::default()));

    let mut calibration = Calibration::default();
    let mut trace = Trace {
        raw: Vec::new(),
        adjusted: Vec::new(),
        theta_changes: Vec::new(),
        samples: 0,
        update_count: 0,
        glitches: 0,
    };

    for sequence in 0..reports {
        acquisition.pump(channel);
        let report = channel.take_report_blocking(held);
        assert_eq!(report.sequence, sequence);
        assert_eq!(report.samples, config.samples_per_report);

        let raw = report.position();
        let (adjusted, _metrics) = calibration.process(raw);
        trace.raw.push(raw as f64);
        trace.adjusted.push(adjusted as f64);
        trace.theta_changes.push(report.theta_change);
        trace.samples += report.samples;

        held = report;
    }
    trace.update_count = calibration.calibrator().update_count();
    trace.glitches = calibration.calibrator().glitches();
    trace
}

#[test]
fn raw_laps_advance_at_wheel_speed() {
    let time = SimTime::new();
    let sensor = SimSensor::new(&time, 2.0);
    let trace = run(sensor, &time, 2000);

    assert!(trace.theta_changes.iter().all(|&change| change > 0));
    for pair in trace.raw.windows(2) {
        assert!(pair[1] > pair[0]);
    }

    // 2 turns/s sampled every 1000 µs.
    let per_sample = (trace.raw[trace.raw.len() - 1] - trace.raw[0]) / (trace.samples - 5) as f64;
    assert!((per_sample - 0.002).abs() < 0.002 * 0.02, "per sample = {}", per_sample);
}

#[test]
fn reverse_rotation_counts_down() {
    let time = SimTime::new();
    let sensor = SimSensor::new(&time, -2.0);
    let trace = run(sensor, &time, 1000);

    assert!(trace.theta_changes.iter().all(|&change| change < 0));
    let last = trace.raw[trace.raw.len() - 1];
    // Ten laps backwards in five seconds.
    assert!((last - trace.raw[0] + 10.0).abs() < 0.2, "moved {}", last - trace.raw[0]);
    assert!(trace.adjusted.iter().all(|v| v.is_finite()));
}

#[test]
fn calibration_removes_speed_anomaly() {
    let time = SimTime::new();
    // One tenth of the wheel passes the sensor at twice the raw speed.
    let sensor = SimSensor::new(&time, 2.0).with_warp(Warp {
        start: 0.2,
        width: 0.1,
        speed: 2.0,
    });
    // One minute: about 120 laps, of which the last 20 are measured.
    let trace = run(sensor, &time, 12_000);

    let tail = trace.raw.len() - 2000;
    let raw_var = variance(&deltas(&trace.raw[tail..]));
    let adjusted_var = variance(&deltas(&trace.adjusted[tail..]));
    assert!(
        adjusted_var < 0.5 * raw_var,
        "adjusted variance {} vs raw {}",
        adjusted_var,
        raw_var
    );

    // Once settled, correction keeps forward motion forward and keeps the
    // overall rate.
    for pair in trace.adjusted[tail..].windows(2) {
        assert!(pair[1] > pair[0]);
    }
    let raw_span = trace.raw[trace.raw.len() - 1] - trace.raw[tail];
    let adjusted_span = trace.adjusted[trace.adjusted.len() - 1] - trace.adjusted[tail];
    assert!((raw_span - adjusted_span).abs() < 0.25, "{} vs {}", raw_span, adjusted_span);
}

#[test]
fn steady_rotation_learns_without_glitches() {
    let time = SimTime::new();
    // 2 turns/s is about 7 ticks per report.
    let trace = run(SimSensor::new(&time, 2.0), &time, 2000);

    assert_eq!(trace.glitches, 0);
    // Ten seconds is twenty laps; the first one is only partly seen.
    assert!(trace.update_count >= 15, "update count = {}", trace.update_count);
}

#[test]
fn single_tick_creep_is_not_learned() {
    let time = SimTime::new();
    // 0.25 turns/s is under one tick per report.
    let trace = run(SimSensor::new(&time, 0.25), &time, 4000);

    // The wheel is still tracked: five laps in twenty seconds.
    let moved = trace.raw[trace.raw.len() - 1] - trace.raw[0];
    assert!((moved - 5.0).abs() < 0.1, "moved {}", moved);

    // Steps of one tick never add mass, so no lap is ever blended and the
    // correction stays the identity.
    assert!(trace.glitches > 0);
    assert_eq!(trace.update_count, 0);
    for (raw, adjusted) in trace.raw.iter().zip(&trace.adjusted) {
        assert!((raw - adjusted).abs() < 1e-3, "{} -> {}", raw, adjusted);
    }
}
