//! bellows-hw-interface
//!
//! Bellows tachometer firmware for the Raspberry Pi Pico 2. Wires the
//! `bellows` library to the RP2350:
//!
//! 1. Core 0 runs the acquisition loop forever. Every millisecond it reads
//!    the two wheel sensor channels on GP26/GP27 (with core 1 paused for
//!    the authoritative read), tracks the angle and lap count, and every
//!    five samples hands a `Report` to core 1.
//! 2. Core 1 runs an Embassy executor. The consumer task receives each
//!    report, feeds the raw lap position through the calibration and
//!    publishes a diagnostic row.
//! 3. The diagnostics task prints the latest row at 40 Hz over RTT.
//!
//! MIDI and airflow mapping are not implemented in this stage.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt::*;
use embassy_executor::Executor;
use embassy_rp::adc::{self, Adc};
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::Pull;
use embassy_rp::multicore::{self, spawn_core1, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use bellows::diagnostics::HEADER;
use bellows::sensor::{MicrosClock, QuadratureInput, SiblingCore};
use bellows::{Acquisition, Calibration, DiagnosticRow, Report, ReportChannel, SchedulerConfig};

// ---------------------------------------------------------------------------
// Boot block
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = embassy_rp::block::ImageDef::secure_exe();

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

/// Diagnostic print interval (40 Hz).
const DIAGNOSTIC_PERIOD_MS: u64 = 25;

/// The only crossing point between the cores.
static REPORTS: ReportChannel<CriticalSectionRawMutex> = ReportChannel::new();

/// Latest diagnostic row, overwritten by the consumer, taken by the printer.
static ROWS: Signal<CriticalSectionRawMutex, DiagnosticRow> = Signal::new();

/// The two report buffers that ping-pong between the cores.
static REPORT_A: StaticCell<Report> = StaticCell::new();
static REPORT_B: StaticCell<Report> = StaticCell::new();

static CORE1_STACK: StaticCell<Stack<8192>> = StaticCell::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

// ---------------------------------------------------------------------------
// Hardware seams
// ---------------------------------------------------------------------------

/// Microsecond clock backed by the Embassy time driver.
struct EmbassyClock;

impl MicrosClock for EmbassyClock {
    fn now_micros(&self) -> u64 {
        Instant::now().as_micros()
    }
}

/// The wheel sensor's two analog channels on one ADC.
struct AdcPair {
    adc: Adc<'static, adc::Blocking>,
    a: adc::Channel<'static>,
    b: adc::Channel<'static>,
}

impl QuadratureInput for AdcPair {
    type Error = adc::Error;

    fn read_a(&mut self) -> Result<u16, adc::Error> {
        self.adc.blocking_read(&mut self.a)
    }

    fn read_b(&mut self) -> Result<u16, adc::Error> {
        self.adc.blocking_read(&mut self.b)
    }
}

/// Halts core 1 through the inter-core FIFO. Only valid once core 1 has
/// been started with `spawn_core1`.
struct Core1Pause;

impl SiblingCore for Core1Pause {
    fn pause(&mut self) {
        multicore::pause_core1();
    }

    fn resume(&mut self) {
        multicore::resume_core1();
    }
}

// ---------------------------------------------------------------------------
// Core 1 tasks
// ---------------------------------------------------------------------------

/// Receives every report, calibrates its position and publishes a row.
///
/// `held` is the buffer this task owns between handoffs; it is returned to
/// the acquisition core as the next destination on every receive.
#[embassy_executor::task]
async fn consumer_task(
    channel: &'static ReportChannel<CriticalSectionRawMutex>,
    mut held: &'static mut Report,
    rows: &'static Signal<CriticalSectionRawMutex, DiagnosticRow>,
) {
    info!("Consumer task started");
    let mut calibration = Calibration::default();
    let mut last_update = 0;

    loop {
        let report = channel.take_report(held).await;

        let (adjusted, metrics) = calibration.process(report.position());
        if metrics.update_count != last_update {
            last_update = metrics.update_count;
            debug!(
                "Calibration updated: count={}, rejected={}, glitches={}",
                last_update,
                calibration.calibrator().rejected_laps(),
                calibration.calibrator().glitches()
            );
        }

        rows.signal(DiagnosticRow::new(report, adjusted, metrics));
        held = report;
    }
}

/// Prints the diagnostic header once, then the latest row every tick.
#[embassy_executor::task]
async fn diagnostics_task(rows: &'static Signal<CriticalSectionRawMutex, DiagnosticRow>) {
    info!("{=str}", HEADER);
    let mut ticker = Ticker::every(Duration::from_millis(DIAGNOSTIC_PERIOD_MS));
    loop {
        ticker.next().await;
        if let Some(row) = rows.try_take() {
            let line = row.to_line();
            info!("{=str}", line.as_str());
        }
    }
}

// ---------------------------------------------------------------------------
// Main (core 0)
// ---------------------------------------------------------------------------

#[entry]
fn main() -> ! {
    let p = embassy_rp::init(Default::default());
    info!("bellows-hw-interface starting");

    // ── Pin assignments ─────────────────────────────────────────────────────
    // SENSOR_A → GP26 / ADC0
    // SENSOR_B → GP27 / ADC1
    // ─────────────────────────────────────────────────────────────────────────

    let input = AdcPair {
        adc: Adc::new_blocking(p.ADC, adc::Config::default()),
        a: adc::Channel::new_pin(p.PIN_26, Pull::None),
        b: adc::Channel::new_pin(p.PIN_27, Pull::None),
    };

    // First destination goes to the acquisition side before either core
    // starts exchanging; the second buffer belongs to the consumer.
    REPORTS.begin(REPORT_A.init(Report::default()));
    let held = REPORT_B.init(Report::default());

    // ── Core 1: consumer executor ───────────────────────────────────────────

    let stack = CORE1_STACK.init(Stack::new());
    spawn_core1(p.CORE1, stack, move || {
        let executor = EXECUTOR1.init(Executor::new());
        executor.run(|spawner| {
            spawner.spawn(unwrap!(consumer_task(&REPORTS, held, &ROWS)));
            spawner.spawn(unwrap!(diagnostics_task(&ROWS)));
        })
    });
    info!("Core 1 started");

    // ── Core 0: acquisition, never returns ──────────────────────────────────

    let config = SchedulerConfig::default();
    info!(
        "Acquisition: period={}us, {} samples per report",
        config.sample_period_us, config.samples_per_report
    );
    Acquisition::new(EmbassyClock, input, Core1Pause, config).run(&REPORTS)
}
