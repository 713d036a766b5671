use core::fmt::Write;

use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use gate_core::config::DEFAULT_GATE_CONFIG;
use gate_core::cycle::CycleController;

use crate::hw::{DiagnosticPort, PwmLed, TscInterruptHandler, TscPins, TscTouchDriver};
use crate::scan::SCAN_FLAG;
use crate::telemetry::{GateTelemetry, write_banner};
use crate::tuner::{SharedTuner, TUNER_SHARED};

mod gate_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

embassy_stm32::bind_interrupts!(struct TouchIrqs {
    TSC => TscInterruptHandler;
});

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA2,
        PA5,
        PB4,
        PB5,
        PB12,
        PB13,
        PC6,
        PC7,
        PC8,
        PC9,
        TIM2,
        USART2,
        ..
    } = hal::init(config);

    let mut diagnostics = DiagnosticPort::new(USART2, PA2);
    if write_banner(&mut diagnostics).is_err() {
        defmt::warn!("gate: failed to write banner");
    }

    let gate_config = DEFAULT_GATE_CONFIG;
    let driver = TscTouchDriver::new(
        TscPins {
            g1_cap: PB12,
            button0: PB13,
            g2_cap: PB4,
            button1: PB5,
            g4_cap: PC6,
            slider0: PC7,
            slider1: PC8,
            slider2: PC9,
        },
        TouchIrqs,
    );
    let led = PwmLed::new(TIM2, PA5, gate_config.led_brightness);
    let tuner = SharedTuner::new(&TUNER_SHARED);

    let controller: gate_task::FirmwareController =
        CycleController::new(&gate_config, &SCAN_FLAG, driver, led, tuner)
            .expect("invalid gate configuration");

    defmt::info!(
        "gate: confirm threshold {}, {} zones",
        gate_config.confirm_threshold,
        gate_config.zones.len()
    );
    if writeln!(diagnostics, "Touch a button and slide to select OR, AND, XOR\r").is_err() {
        defmt::warn!("gate: diagnostic UART write failed");
    }

    spawner
        .spawn(gate_task::run(controller, diagnostics, GateTelemetry::new()))
        .expect("failed to spawn gate task");

    core::future::pending::<()>().await;
}
