use core::fmt::Write;

use embassy_futures::yield_now;
use embassy_time::Instant;
use gate_core::cycle::{CycleController, CycleOutcome, PositionLine};

use crate::config::TUNER_BUFFER_LEN;
use crate::hw::{DiagnosticPort, PwmLed, TscTouchDriver};
use crate::telemetry::GateTelemetry;
use crate::tuner::SharedTuner;

pub type FirmwareController =
    CycleController<'static, TscTouchDriver, PwmLed, SharedTuner<TUNER_BUFFER_LEN>>;

#[embassy_executor::task]
pub async fn run(
    mut controller: FirmwareController,
    mut diagnostics: DiagnosticPort,
    mut telemetry: GateTelemetry,
) -> ! {
    controller.start();

    loop {
        controller.driver_mut().service();
        match controller.poll() {
            Ok(Some(report)) => {
                if let CycleOutcome::Skipped(error) = report.outcome {
                    defmt::warn!(
                        "gate: cycle {} skipped: {}",
                        report.cycle,
                        defmt::Display2Format(&error)
                    );
                }
                telemetry.record_report(&report, Instant::now());

                if let Some(line) = report.position_line() {
                    write_position(&mut diagnostics, line);
                }
            }
            Ok(None) => {}
            Err(error) => {
                telemetry.record_error(controller.cycles(), &error, Instant::now());
                defmt::error!("gate: {}; halting", defmt::Display2Format(&error));
                break;
            }
        }

        yield_now().await;
    }

    loop {
        core::future::pending::<()>().await;
    }
}

fn write_position(diagnostics: &mut DiagnosticPort, line: PositionLine) {
    if write!(diagnostics, "{line}").is_err() {
        defmt::warn!("gate: diagnostic UART write failed");
    }
}
