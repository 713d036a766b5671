//! Blocking diagnostic output on the ST-LINK virtual COM port.

use core::fmt;

use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::mode::Blocking;
use embassy_stm32::usart::{Config as UartConfig, DataBits, Parity, StopBits, UartTx};

use crate::config::DIAGNOSTIC_BAUD;

pub struct DiagnosticPort {
    tx: UartTx<'static, Blocking>,
}

impl DiagnosticPort {
    pub fn new(
        usart: Peri<'static, hal::peripherals::USART2>,
        tx_pin: Peri<'static, hal::peripherals::PA2>,
    ) -> Self {
        let mut config = UartConfig::default();
        config.baudrate = DIAGNOSTIC_BAUD;
        config.data_bits = DataBits::DataBits8;
        config.stop_bits = StopBits::STOP1;
        config.parity = Parity::ParityNone;

        let tx = UartTx::new_blocking(usart, tx_pin, config)
            .expect("failed to initialize diagnostic UART");
        Self { tx }
    }
}

impl fmt::Write for DiagnosticPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.tx.blocking_write(s.as_bytes()).map_err(|_| fmt::Error)
    }
}
