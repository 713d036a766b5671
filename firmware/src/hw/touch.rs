//! Touch sensing controller (TSC) driver.
//!
//! The peripheral is programmed through its registers: embassy owns the
//! clocks and the interrupt binding, while the acquisition sequence lives in
//! [`crate::scan`] so it can be exercised on the host. The interrupt only
//! acknowledges the peripheral; [`TscTouchDriver::service`] does the rest from
//! the gate task.

use core::ptr;

use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::interrupt::typelevel::{Binding, Handler, Interrupt, TSC};
use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::{Moder, Ot};
use gate_core::snapshot::{TouchDriver, WidgetId, WidgetState};

use crate::config::CHANNELS;
use crate::scan::{self, ACQUISITION_FLAG, SCAN_FLAG, ScanProgress};
use crate::sensing::{Sensing, TouchReadings};

const TSC_BASE: usize = 0x4002_4000;

const CR: usize = 0x00;
const IER: usize = 0x04;
const ICR: usize = 0x08;
const IOHCR: usize = 0x10;
const IOSCR: usize = 0x20;
const IOCCR: usize = 0x28;
const IOGCSR: usize = 0x30;
const IOG1CR: usize = 0x34;

const CR_TSCE: u32 = 1 << 0;
const CR_START: u32 = 1 << 1;
// Charge transfer high/low: 2 cycles each. Pulse prescaler HCLK/32. Max
// count 16383.
const CR_CONFIG: u32 = (1 << 28) | (1 << 24) | (5 << 12) | (6 << 5) | CR_TSCE;

const IER_EOAIE: u32 = 1 << 0;
const IER_MCEIE: u32 = 1 << 1;
const ICR_EOAIC: u32 = 1 << 0;
const ICR_MCEIC: u32 = 1 << 1;

const COUNT_MASK: u32 = 0x3FFF;

/// Alternate function routing GPIOs to the TSC.
const TSC_AF: u8 = 9;

fn register(offset: usize) -> *mut u32 {
    (TSC_BASE + offset) as *mut u32
}

fn read(offset: usize) -> u32 {
    // SAFETY: `offset` is one of the TSC register offsets above.
    unsafe { ptr::read_volatile(register(offset)) }
}

fn write(offset: usize, value: u32) {
    // SAFETY: `offset` is one of the TSC register offsets above.
    unsafe { ptr::write_volatile(register(offset), value) }
}

fn group_count(group: u8) -> u16 {
    let offset = IOG1CR + 4 * usize::from(group - 1);
    u16::try_from(read(offset) & COUNT_MASK).unwrap_or(u16::MAX)
}

fn start_phase(phase: u8) {
    write(IOCCR, scan::channel_bits(phase));
    write(IOGCSR, scan::group_bits(phase));
    write(CR, read(CR) | CR_START);
}

/// Clears the end-of-acquisition and max-count flags and raises
/// [`ACQUISITION_FLAG`].
pub struct TscInterruptHandler;

impl Handler<TSC> for TscInterruptHandler {
    unsafe fn on_interrupt() {
        write(ICR, ICR_EOAIC | ICR_MCEIC);
        ACQUISITION_FLAG.raise();
    }
}

/// Pins wired to the touch electrodes and their sampling capacitors.
pub struct TscPins {
    pub g1_cap: Peri<'static, hal::peripherals::PB12>,
    pub button0: Peri<'static, hal::peripherals::PB13>,
    pub g2_cap: Peri<'static, hal::peripherals::PB4>,
    pub button1: Peri<'static, hal::peripherals::PB5>,
    pub g4_cap: Peri<'static, hal::peripherals::PC6>,
    pub slider0: Peri<'static, hal::peripherals::PC7>,
    pub slider1: Peri<'static, hal::peripherals::PC8>,
    pub slider2: Peri<'static, hal::peripherals::PC9>,
}

impl TscPins {
    fn configure(&self) {
        for (port, pin, sampling_cap) in [
            (pac::GPIOB, 12, true),
            (pac::GPIOB, 13, false),
            (pac::GPIOB, 4, true),
            (pac::GPIOB, 5, false),
            (pac::GPIOC, 6, true),
            (pac::GPIOC, 7, false),
            (pac::GPIOC, 8, false),
            (pac::GPIOC, 9, false),
        ] {
            let output = if sampling_cap { Ot::OPENDRAIN } else { Ot::PUSHPULL };
            port.otyper().modify(|w| w.set_ot(pin, output));
            port.afr(pin / 8).modify(|w| w.set_afr(pin % 8, TSC_AF));
            port.moder().modify(|w| w.set_moder(pin, Moder::ALTERNATE));
        }
    }
}

/// [`TouchDriver`] reading two buttons and a three-segment slider.
pub struct TscTouchDriver {
    sensing: Sensing,
    progress: ScanProgress,
    started: bool,
    _pins: TscPins,
}

impl TscTouchDriver {
    pub fn new(pins: TscPins, _irq: impl Binding<TSC, TscInterruptHandler>) -> Self {
        pins.configure();
        pac::RCC.ahb1enr().modify(|w| w.set_tscen(true));

        let analog = CHANNELS
            .iter()
            .fold(scan::sampling_bits(), |bits, channel| bits | channel.mask());
        write(CR, CR_CONFIG);
        write(IOHCR, read(IOHCR) & !analog);
        write(IOSCR, scan::sampling_bits());
        write(IER, IER_EOAIE | IER_MCEIE);

        TSC::unpend();
        // SAFETY: the handler only writes ICR and raises an atomic flag.
        unsafe { TSC::enable() };

        Self {
            sensing: Sensing::new(),
            progress: ScanProgress::new(),
            started: false,
            _pins: pins,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.sensing.is_calibrated()
    }

    /// Collects a finished acquisition phase and starts the next, raising
    /// [`SCAN_FLAG`] after the last. Call from the gate task loop.
    ///
    /// A phase that hit the max count reads at the count ceiling, which the
    /// sensing thresholds treat as untouched.
    pub fn service(&mut self) {
        if !ACQUISITION_FLAG.take() {
            return;
        }
        if self.progress.current().is_none() {
            return;
        }

        match self.progress.complete_phase(group_count) {
            Some(next) => start_phase(next),
            None => SCAN_FLAG.raise(),
        }
    }

    fn readings(&self) -> TouchReadings {
        self.sensing.evaluate(self.progress.counts())
    }
}

impl TouchDriver for TscTouchDriver {
    fn start_scan(&mut self) {
        if self.is_scan_complete() {
            self.sensing.commit(self.progress.counts());
        }
        self.started = true;
        // drop an end of acquisition left over from an abandoned scan
        let _ = ACQUISITION_FLAG.take();
        self.progress.begin();
        start_phase(0);
    }

    fn is_scan_complete(&self) -> bool {
        self.started && self.progress.current().is_none()
    }

    fn read_widget_state(&self, widget: WidgetId) -> WidgetState {
        let readings = self.readings();
        let active = match widget {
            WidgetId::Button(index) => readings
                .buttons
                .get(usize::from(index))
                .copied()
                .unwrap_or(false),
            WidgetId::Slider => readings.slider_touched,
        };
        WidgetState::new(active)
    }

    fn read_slider_position(&self) -> u16 {
        self.readings().slider_position
    }
}
