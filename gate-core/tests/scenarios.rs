use gate_core::config::{DEFAULT_GATE_CONFIG, GateConfig};
use gate_core::cycle::{CycleController, CycleOutcome, CycleReport, CycleState, ScanFlag};
use gate_core::decision::OutputSink;
use gate_core::error::GateError;
use gate_core::snapshot::{SnapshotProvider, TouchDriver, WidgetId, WidgetState};
use gate_core::tuner::{TUNER_FRAME_LEN, TunerBuffer, TunerFrame};
use gate_core::zones::{Classification, Combinator};

/// Touch driver whose readings are set by the test before each scan.
#[derive(Default)]
struct BenchDriver {
    scanning: bool,
    complete: bool,
    buttons: [bool; 2],
    position: Option<u16>,
    scans_started: usize,
}

impl BenchDriver {
    fn finish(&mut self, buttons: [bool; 2], position: Option<u16>) {
        self.buttons = buttons;
        self.position = position;
        self.complete = self.scanning;
    }
}

impl TouchDriver for BenchDriver {
    fn start_scan(&mut self) {
        self.scanning = true;
        self.complete = false;
        self.scans_started += 1;
    }

    fn is_scan_complete(&self) -> bool {
        self.complete
    }

    fn read_widget_state(&self, widget: WidgetId) -> WidgetState {
        let active = match widget {
            WidgetId::Button(index) => self
                .buttons
                .get(usize::from(index))
                .copied()
                .unwrap_or(false),
            WidgetId::Slider => self.position.is_some(),
        };
        WidgetState::new(active)
    }

    fn read_slider_position(&self) -> u16 {
        self.position.unwrap_or(0)
    }
}

/// Records every call the engine makes to the LED.
#[derive(Default)]
struct LedRecorder {
    calls: Vec<bool>,
}

impl OutputSink for LedRecorder {
    fn set_output(&mut self, active: bool) {
        self.calls.push(active);
    }
}

type Bench<'f> = CycleController<'f, BenchDriver, LedRecorder, TunerBuffer<TUNER_FRAME_LEN>>;

fn bench<'f>(flag: &'f ScanFlag, config: &GateConfig) -> Bench<'f> {
    let mut controller = CycleController::new(
        config,
        flag,
        BenchDriver::default(),
        LedRecorder::default(),
        TunerBuffer::new(),
    )
    .expect("valid configuration");
    controller.start();
    controller
}

/// Completes the armed scan with the given readings, raises the flag the way
/// the interrupt does, and runs one cycle.
fn cycle(controller: &mut Bench<'_>, flag: &ScanFlag, buttons: [bool; 2], position: Option<u16>) -> CycleReport {
    controller.driver_mut().finish(buttons, position);
    flag.raise();
    controller
        .poll()
        .expect("cycle succeeds")
        .expect("flag was raised")
}

fn processed_output(report: &CycleReport) -> (Classification, bool) {
    match report.outcome {
        CycleOutcome::Processed {
            classification,
            decision,
            ..
        } => (classification, decision.output),
        CycleOutcome::Skipped(error) => panic!("cycle {} skipped: {error}", report.cycle),
    }
}

#[test]
fn scenario_a_each_zone_selects_its_gate() {
    let flag = ScanFlag::new();
    let mut controller = bench(&flag, &DEFAULT_GATE_CONFIG);

    let or = cycle(&mut controller, &flag, [true, false], Some(50));
    assert_eq!(
        processed_output(&or),
        (Classification::Gate(Combinator::Or), true)
    );

    let and = cycle(&mut controller, &flag, [true, false], Some(150));
    assert_eq!(
        processed_output(&and),
        (Classification::Gate(Combinator::And), false)
    );

    let xor = cycle(&mut controller, &flag, [true, false], Some(250));
    assert_eq!(
        processed_output(&xor),
        (Classification::Gate(Combinator::Xor), true)
    );

    assert_eq!(controller.sink().calls, vec![true, false, true]);
}

#[test]
fn scenario_b_lower_bound_of_and_zone() {
    let flag = ScanFlag::new();
    let mut controller = bench(&flag, &DEFAULT_GATE_CONFIG);

    let report = cycle(&mut controller, &flag, [true, false], Some(100));
    assert_eq!(
        processed_output(&report),
        (Classification::Gate(Combinator::And), false)
    );
    assert!(controller.sink().calls.is_empty());
}

#[test]
fn scenario_c_sink_only_sees_edges() {
    let flag = ScanFlag::new();
    let mut controller = bench(&flag, &DEFAULT_GATE_CONFIG);

    cycle(&mut controller, &flag, [true, true], Some(150));
    assert_eq!(controller.sink().calls, vec![true]);

    for _ in 0..25 {
        let report = cycle(&mut controller, &flag, [true, true], Some(150));
        assert_eq!(
            report.outcome,
            CycleOutcome::Processed {
                snapshot: report_snapshot(&report),
                classification: Classification::Gate(Combinator::And),
                decision: gate_core::decision::Decision {
                    output: true,
                    changed: false,
                },
                position_changed: None,
            }
        );
    }
    assert_eq!(controller.sink().calls, vec![true]);
}

fn report_snapshot(report: &CycleReport) -> gate_core::snapshot::SensorSnapshot {
    match report.outcome {
        CycleOutcome::Processed { snapshot, .. } => snapshot,
        CycleOutcome::Skipped(error) => panic!("unexpected skip: {error}"),
    }
}

#[test]
fn scenario_d_provider_rejects_unsequenced_poll() {
    let mut provider: SnapshotProvider<_, 2> = SnapshotProvider::new(BenchDriver::default(), 300);
    assert_eq!(provider.poll(), Err(GateError::DriverNotReady));

    provider.arm();
    assert_eq!(provider.poll(), Err(GateError::DriverNotReady));

    provider.driver_mut().finish([true, false], Some(10));
    assert!(provider.poll().is_ok());
    assert_eq!(provider.poll(), Err(GateError::DriverNotReady));
}

#[test]
fn scenario_d_controller_reports_skipped_cycle() {
    let flag = ScanFlag::new();
    let mut controller = bench(&flag, &DEFAULT_GATE_CONFIG);

    // interrupt fires but the driver never finished the scan
    flag.raise();
    let report = controller
        .poll()
        .expect("skip is not fatal")
        .expect("flag was raised");
    assert_eq!(report.outcome, CycleOutcome::Skipped(GateError::DriverNotReady));
    assert_eq!(controller.skipped(), 1);
    assert_eq!(controller.driver().scans_started, 2);
    assert!(controller.sink().calls.is_empty());
}

#[test]
fn no_cycle_runs_without_the_flag() {
    let flag = ScanFlag::new();
    let mut controller = bench(&flag, &DEFAULT_GATE_CONFIG);

    controller.driver_mut().finish([true, true], Some(10));
    assert_eq!(controller.poll(), Ok(None));
    assert_eq!(controller.cycles(), 0);
    assert_eq!(controller.state(), CycleState::Scanning);
}

#[test]
fn position_latches_when_slider_released() {
    let flag = ScanFlag::new();
    let mut controller = bench(&flag, &DEFAULT_GATE_CONFIG);

    cycle(&mut controller, &flag, [false, false], Some(250));
    let report = cycle(&mut controller, &flag, [true, false], None);
    assert_eq!(
        processed_output(&report),
        (Classification::Gate(Combinator::Xor), true)
    );
}

#[test]
fn untouched_slider_is_noop_until_first_touch() {
    let flag = ScanFlag::new();
    let mut controller = bench(&flag, &DEFAULT_GATE_CONFIG);

    let report = cycle(&mut controller, &flag, [true, true], None);
    assert_eq!(processed_output(&report), (Classification::NoOp, false));

    let config = DEFAULT_GATE_CONFIG.with_initial_position(Some(10));
    let mut seeded = bench(&flag, &config);
    let report = cycle(&mut seeded, &flag, [true, false], None);
    assert_eq!(
        processed_output(&report),
        (Classification::Gate(Combinator::Or), true)
    );
}

#[test]
fn diagnostic_line_only_on_position_change() {
    let flag = ScanFlag::new();
    let mut controller = bench(&flag, &DEFAULT_GATE_CONFIG);

    let lines: Vec<String> = [Some(40), Some(40), None, Some(41)]
        .into_iter()
        .filter_map(|position| {
            cycle(&mut controller, &flag, [false, false], position)
                .position_line()
                .map(|line| line.to_string())
        })
        .collect();

    assert_eq!(lines, ["Slider Position: 40\n", "Slider Position: 41\n"]);
}

#[test]
fn tuner_frame_published_every_cycle() {
    let flag = ScanFlag::new();
    let mut controller = bench(&flag, &DEFAULT_GATE_CONFIG);

    cycle(&mut controller, &flag, [true, false], Some(180));
    flag.raise();
    controller.poll().expect("skip is not fatal");

    assert_eq!(controller.tuner().publish_count(), 2);
    let frame = TunerFrame::decode(controller.tuner().latest()).expect("valid frame");
    assert_eq!(frame.cycle, 2);
    assert_eq!(frame.skipped, 1);
    assert_eq!(frame.confirmed_buttons, 0b01);
    assert_eq!(frame.confirmed_position, Some(180));
    assert_eq!(frame.classification, Classification::Gate(Combinator::And));
    assert!(!frame.output);
}

#[test]
fn undersized_tuner_buffer_is_rejected_before_any_cycle() {
    let flag = ScanFlag::new();
    let result: Result<CycleController<'_, _, _, TunerBuffer<4>>, _> = CycleController::new(
        &DEFAULT_GATE_CONFIG,
        &flag,
        BenchDriver::default(),
        LedRecorder::default(),
        TunerBuffer::new(),
    );

    let Err(error) = result else {
        panic!("a 4-byte tuner buffer must be rejected");
    };
    assert_eq!(
        error,
        GateError::SyncBufferOverflow {
            required: TUNER_FRAME_LEN,
            capacity: 4,
        }
    );
}
