//! Scan cycle controller.
//!
//! One cycle walks `Idle → Scanning → ScanComplete → Processing → Idle`.
//! The scan-complete interrupt only raises a [`ScanFlag`]; the cooperative
//! loop calls [`CycleController::poll`] until it observes the flag, then runs
//! provider, filter, classifier, engine, sink, and tuner publish before
//! arming the next scan. A new scan is never armed while a cycle is being
//! processed.

use core::fmt;

use portable_atomic::{AtomicBool, Ordering};

use crate::config::GateConfig;
use crate::debounce::{DebounceFilter, DebouncedState};
use crate::decision::{Decision, DecisionEngine, OutputSink};
use crate::error::GateError;
use crate::snapshot::{BUTTON_COUNT, SensorSnapshot, SnapshotProvider, TouchDriver};
use crate::tuner::{TUNER_FRAME_LEN, TunerFrame, TunerSync};
use crate::zones::{Classification, ZoneTable};

/// Single-bit handshake between the scan-complete interrupt and the loop.
///
/// The interrupt is the only writer of `true` and the loop the only reader.
/// [`raise`](Self::raise) publishes with `Release` and [`take`](Self::take)
/// clears with `Acquire`, so driver state written before the flag is visible
/// to the loop once it observes the flag.
pub struct ScanFlag {
    complete: AtomicBool,
}

impl ScanFlag {
    pub const fn new() -> Self {
        Self {
            complete: AtomicBool::new(false),
        }
    }

    /// Marks the scan as complete. Safe to call from interrupt context.
    pub fn raise(&self) {
        self.complete.store(true, Ordering::Release);
    }

    /// Returns whether the flag was set and clears it in the same operation.
    #[must_use]
    pub fn take(&self) -> bool {
        self.complete.swap(false, Ordering::Acquire)
    }

    /// Reads the flag without clearing it.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }
}

impl Default for ScanFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Phases of a scan cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CycleState {
    Idle,
    Scanning,
    ScanComplete,
    Processing,
}

impl CycleState {
    /// Returns `true` when `next` is the successor of `self`.
    pub const fn can_transition_to(self, next: CycleState) -> bool {
        matches!(
            (self, next),
            (CycleState::Idle, CycleState::Scanning)
                | (CycleState::Scanning, CycleState::ScanComplete)
                | (CycleState::ScanComplete, CycleState::Processing)
                | (CycleState::Processing, CycleState::Idle)
        )
    }

    pub const fn to_raw(self) -> u8 {
        match self {
            CycleState::Idle => 0,
            CycleState::Scanning => 1,
            CycleState::ScanComplete => 2,
            CycleState::Processing => 3,
        }
    }

    pub const fn from_raw(code: u8) -> Option<Self> {
        match code {
            0 => Some(CycleState::Idle),
            1 => Some(CycleState::Scanning),
            2 => Some(CycleState::ScanComplete),
            3 => Some(CycleState::Processing),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CycleState::Idle => "idle",
            CycleState::Scanning => "scanning",
            CycleState::ScanComplete => "scan-complete",
            CycleState::Processing => "processing",
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What happened during a processed cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CycleOutcome<const N: usize = BUTTON_COUNT> {
    /// The snapshot was read and the engine stepped.
    Processed {
        snapshot: SensorSnapshot<N>,
        classification: Classification,
        decision: Decision,
        /// Newly confirmed slider position, if it changed this cycle.
        position_changed: Option<u16>,
    },
    /// The provider was not ready; the scan was re-armed.
    Skipped(GateError),
}

/// Summary of one cycle returned to the caller for logging.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CycleReport<const N: usize = BUTTON_COUNT> {
    pub cycle: u32,
    pub outcome: CycleOutcome<N>,
}

impl<const N: usize> CycleReport<N> {
    /// Diagnostic line to print, if the confirmed slider position moved.
    #[must_use]
    pub fn position_line(&self) -> Option<PositionLine> {
        match self.outcome {
            CycleOutcome::Processed {
                position_changed: Some(position),
                ..
            } => Some(PositionLine(position)),
            _ => None,
        }
    }
}

/// Renders `Slider Position: <n>` followed by a newline.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PositionLine(pub u16);

impl fmt::Display for PositionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Slider Position: {}", self.0)
    }
}

/// Drives provider, filter, classifier, engine, and tuner once per scan.
pub struct CycleController<'f, D, S, T, const N: usize = BUTTON_COUNT> {
    flag: &'f ScanFlag,
    provider: SnapshotProvider<D, N>,
    filter: DebounceFilter<N>,
    zones: ZoneTable<'static>,
    engine: DecisionEngine<S>,
    tuner: T,
    state: CycleState,
    classification: Classification,
    last_snapshot: Option<SensorSnapshot<N>>,
    cycles: u32,
    skipped: u32,
}

impl<'f, D, S, T, const N: usize> CycleController<'f, D, S, T, N>
where
    D: TouchDriver,
    S: OutputSink,
    T: TunerSync,
{
    /// Builds a controller. A malformed zone table or a tuner buffer too
    /// small for one frame is fatal.
    pub fn new(
        config: &GateConfig,
        flag: &'f ScanFlag,
        driver: D,
        sink: S,
        tuner: T,
    ) -> Result<Self, GateError> {
        let zones = config.validate()?;
        check_capacity(&tuner)?;
        let classification = config
            .initial_position
            .map_or(Classification::NoOp, |position| zones.classify(position));

        Ok(Self {
            flag,
            provider: SnapshotProvider::new(driver, config.max_position),
            filter: DebounceFilter::new(config.confirm_threshold, config.initial_position),
            zones,
            engine: DecisionEngine::new(sink),
            tuner,
            state: CycleState::Idle,
            classification,
            last_snapshot: None,
            cycles: 0,
            skipped: 0,
        })
    }

    /// Arms the first scan. Does nothing if a cycle is already under way.
    pub fn start(&mut self) {
        if self.state == CycleState::Idle {
            self.rearm();
        }
    }

    /// Runs one cycle if the scan-complete flag is set.
    ///
    /// Returns `Ok(None)` while the scan is still running. A provider that is
    /// not ready skips the cycle and re-arms. A tuner buffer that can no
    /// longer hold a frame fails the cycle before the filter, engine, or sink
    /// see the snapshot; the next scan is still armed.
    pub fn poll(&mut self) -> Result<Option<CycleReport<N>>, GateError> {
        if self.state != CycleState::Scanning || !self.flag.take() {
            return Ok(None);
        }

        self.transition(CycleState::ScanComplete);
        self.transition(CycleState::Processing);
        self.cycles = self.cycles.wrapping_add(1);

        if let Err(error) = check_capacity(&self.tuner) {
            self.transition(CycleState::Idle);
            self.rearm();
            return Err(error);
        }

        let outcome = match self.provider.poll() {
            Ok(snapshot) => self.process(snapshot),
            Err(error) => {
                self.skipped = self.skipped.wrapping_add(1);
                CycleOutcome::Skipped(error)
            }
        };

        self.publish();
        self.transition(CycleState::Idle);
        self.rearm();

        Ok(Some(CycleReport {
            cycle: self.cycles,
            outcome,
        }))
    }

    fn process(&mut self, snapshot: SensorSnapshot<N>) -> CycleOutcome<N> {
        let previous_position = self.filter.state().confirmed_slider_position;
        let debounced = self.filter.update(&snapshot);
        let position = debounced.confirmed_slider_position;

        let classification = position.map_or(Classification::NoOp, |p| self.zones.classify(p));
        let decision = self.engine.step(debounced, classification);

        self.classification = classification;
        self.last_snapshot = Some(snapshot);

        CycleOutcome::Processed {
            snapshot,
            classification,
            decision,
            position_changed: position.filter(|_| position != previous_position),
        }
    }

    fn publish(&mut self) {
        let frame = self.tuner_frame().encode();
        self.tuner.publish(&frame);
    }

    fn rearm(&mut self) {
        self.transition(CycleState::Scanning);
        self.provider.arm();
    }

    fn transition(&mut self, next: CycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid cycle transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Snapshot of the controller for the tuner buffer.
    #[must_use]
    pub fn tuner_frame(&self) -> TunerFrame {
        let debounced = self.filter.state();
        let raw = self.last_snapshot;
        TunerFrame {
            state: self.state,
            cycle: self.cycles,
            raw_buttons: raw.map_or(0, |snapshot| snapshot.button_mask()),
            confirmed_buttons: debounced.button_mask(),
            slider_touched: raw.is_some_and(|snapshot| snapshot.slider_touched),
            classification: self.classification,
            confirmed_position: debounced.confirmed_slider_position,
            output: self.engine.state().last_output,
            skipped: self.skipped.to_le_bytes()[0],
        }
    }

    #[must_use]
    pub const fn state(&self) -> CycleState {
        self.state
    }

    /// Number of cycles processed or skipped so far.
    #[must_use]
    pub const fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Number of cycles skipped because the provider was not ready.
    #[must_use]
    pub const fn skipped(&self) -> u32 {
        self.skipped
    }

    #[must_use]
    pub const fn debounced(&self) -> &DebouncedState<N> {
        self.filter.state()
    }

    #[must_use]
    pub const fn confirm_threshold(&self) -> u8 {
        self.filter.threshold()
    }

    #[must_use]
    pub const fn classification(&self) -> Classification {
        self.classification
    }

    #[must_use]
    pub const fn output(&self) -> bool {
        self.engine.state().last_output
    }

    pub const fn zones(&self) -> &ZoneTable<'static> {
        &self.zones
    }

    pub fn driver(&self) -> &D {
        self.provider.driver()
    }

    pub fn driver_mut(&mut self) -> &mut D {
        self.provider.driver_mut()
    }

    /// Reads the provider directly, outside the cycle.
    ///
    /// Used by diagnostics to check sequencing; a scan that is still running
    /// or already consumed reports [`GateError::DriverNotReady`].
    pub fn read_provider(&mut self) -> Result<SensorSnapshot<N>, GateError> {
        if self.state == CycleState::Scanning && self.flag.is_raised() {
            // Leave a completed scan for the cycle that owns it.
            return Err(GateError::DriverNotReady);
        }
        self.provider.poll()
    }

    pub fn sink(&self) -> &S {
        self.engine.sink()
    }

    pub fn tuner(&self) -> &T {
        &self.tuner
    }
}

fn check_capacity<T: TunerSync>(tuner: &T) -> Result<(), GateError> {
    let capacity = tuner.capacity();
    if capacity < TUNER_FRAME_LEN {
        return Err(GateError::SyncBufferOverflow {
            required: TUNER_FRAME_LEN,
            capacity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::config::DEFAULT_GATE_CONFIG;
    use crate::decision::NoopOutputSink;
    use crate::snapshot::{WidgetId, WidgetState};
    use crate::tuner::{NoopTuner, TunerBuffer};

    #[derive(Default)]
    struct ScriptedDriver {
        complete: bool,
        buttons: [bool; 2],
        slider: Option<u16>,
        arms: usize,
    }

    impl TouchDriver for ScriptedDriver {
        fn start_scan(&mut self) {
            self.complete = false;
            self.arms += 1;
        }

        fn is_scan_complete(&self) -> bool {
            self.complete
        }

        fn read_widget_state(&self, widget: WidgetId) -> WidgetState {
            match widget {
                WidgetId::Button(0) => WidgetState::new(self.buttons[0]),
                WidgetId::Button(1) => WidgetState::new(self.buttons[1]),
                WidgetId::Button(_) => WidgetState::new(false),
                WidgetId::Slider => WidgetState::new(self.slider.is_some()),
            }
        }

        fn read_slider_position(&self) -> u16 {
            self.slider.unwrap_or(0)
        }
    }

    #[test]
    fn flag_take_clears() {
        let flag = ScanFlag::new();
        assert!(!flag.take());
        flag.raise();
        assert!(flag.is_raised());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn transitions_follow_the_cycle() {
        assert!(CycleState::Idle.can_transition_to(CycleState::Scanning));
        assert!(CycleState::Scanning.can_transition_to(CycleState::ScanComplete));
        assert!(CycleState::ScanComplete.can_transition_to(CycleState::Processing));
        assert!(CycleState::Processing.can_transition_to(CycleState::Idle));
        assert!(!CycleState::Idle.can_transition_to(CycleState::Processing));
        assert!(!CycleState::Processing.can_transition_to(CycleState::Scanning));
    }

    #[test]
    fn poll_waits_for_flag() {
        let flag = ScanFlag::new();
        let mut controller: CycleController<'_, _, _, _, 2> = CycleController::new(
            &DEFAULT_GATE_CONFIG,
            &flag,
            ScriptedDriver::default(),
            NoopOutputSink::new(),
            NoopTuner::new(),
        )
        .expect("default config");

        assert_eq!(controller.poll(), Ok(None));
        controller.start();
        assert_eq!(controller.state(), CycleState::Scanning);
        assert_eq!(controller.poll(), Ok(None));

        controller.driver_mut().complete = true;
        flag.raise();
        let report = controller.poll().expect("poll").expect("report");
        assert_eq!(report.cycle, 1);
        assert_eq!(controller.state(), CycleState::Scanning);
        assert_eq!(controller.driver().arms, 2);
    }

    #[test]
    fn flag_without_completed_scan_skips_cycle() {
        let flag = ScanFlag::new();
        let mut controller: CycleController<'_, _, _, _, 2> = CycleController::new(
            &DEFAULT_GATE_CONFIG,
            &flag,
            ScriptedDriver::default(),
            NoopOutputSink::new(),
            NoopTuner::new(),
        )
        .expect("default config");
        controller.start();
        flag.raise();

        let report = controller.poll().expect("poll").expect("report");
        assert_eq!(report.outcome, CycleOutcome::Skipped(GateError::DriverNotReady));
        assert_eq!(controller.skipped(), 1);
        assert_eq!(controller.state(), CycleState::Scanning);
    }

    #[test]
    fn small_tuner_buffer_is_rejected_at_construction() {
        let flag = ScanFlag::new();
        let result: Result<CycleController<'_, _, _, _, 2>, _> = CycleController::new(
            &DEFAULT_GATE_CONFIG,
            &flag,
            ScriptedDriver::default(),
            NoopOutputSink::new(),
            TunerBuffer::<8>::new(),
        );
        assert!(matches!(
            result,
            Err(GateError::SyncBufferOverflow {
                required: TUNER_FRAME_LEN,
                capacity: 8
            })
        ));
    }

    /// Tuner whose capacity the test can shrink after construction.
    struct ResizableTuner<'a> {
        capacity: &'a Cell<usize>,
        publishes: usize,
    }

    impl TunerSync for ResizableTuner<'_> {
        fn capacity(&self) -> usize {
            self.capacity.get()
        }

        fn publish(&mut self, _: &[u8]) {
            self.publishes += 1;
        }
    }

    #[derive(Default)]
    struct SinkLog {
        calls: usize,
    }

    impl OutputSink for SinkLog {
        fn set_output(&mut self, _: bool) {
            self.calls += 1;
        }
    }

    #[test]
    fn shrunk_tuner_buffer_fails_cycle_before_any_output() {
        let flag = ScanFlag::new();
        let capacity = Cell::new(TUNER_FRAME_LEN);
        let mut controller: CycleController<'_, _, _, _, 2> = CycleController::new(
            &DEFAULT_GATE_CONFIG,
            &flag,
            ScriptedDriver::default(),
            SinkLog::default(),
            ResizableTuner {
                capacity: &capacity,
                publishes: 0,
            },
        )
        .expect("default config");
        controller.start();

        capacity.set(4);
        let driver = controller.driver_mut();
        driver.buttons = [true, false];
        driver.slider = Some(50);
        driver.complete = true;
        flag.raise();

        assert_eq!(
            controller.poll(),
            Err(GateError::SyncBufferOverflow {
                required: TUNER_FRAME_LEN,
                capacity: 4
            })
        );
        assert_eq!(controller.sink().calls, 0);
        assert_eq!(controller.tuner().publishes, 0);
        assert_eq!(controller.debounced().confirmed_slider_position, None);
        assert!(!controller.output());
        assert_eq!(controller.state(), CycleState::Scanning);

        capacity.set(TUNER_FRAME_LEN);
        controller.driver_mut().complete = true;
        flag.raise();
        let report = controller.poll().expect("capacity restored").expect("cycle ran");
        assert_eq!(report.position_line(), Some(PositionLine(50)));
        assert_eq!(controller.sink().calls, 1);
        assert_eq!(controller.tuner().publishes, 1);
    }

    #[test]
    fn position_line_matches_diagnostic_format() {
        let flag = ScanFlag::new();
        let mut controller: CycleController<'_, _, _, _, 2> = CycleController::new(
            &DEFAULT_GATE_CONFIG,
            &flag,
            ScriptedDriver::default(),
            NoopOutputSink::new(),
            TunerBuffer::<TUNER_FRAME_LEN>::new(),
        )
        .expect("default config");
        controller.start();

        controller.driver_mut().slider = Some(150);
        controller.driver_mut().complete = true;
        flag.raise();
        let report = controller.poll().expect("poll").expect("report");
        let line = report.position_line().expect("position changed");
        assert_eq!(format_line(line).as_str(), "Slider Position: 150\n");

        controller.driver_mut().complete = true;
        flag.raise();
        let repeat = controller.poll().expect("poll").expect("report");
        assert_eq!(repeat.position_line(), None);

        let frame = TunerFrame::decode(controller.tuner().latest()).expect("frame");
        assert_eq!(frame.cycle, 2);
        assert_eq!(frame.confirmed_position, Some(150));
    }

    fn format_line(line: PositionLine) -> heapless::String<32> {
        use core::fmt::Write;
        let mut out = heapless::String::new();
        write!(out, "{line}").expect("fits");
        out
    }
}
