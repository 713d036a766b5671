//! Gate output LED on a PWM channel.

use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::gpio::OutputType;
use embassy_stm32::time::hz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use gate_core::decision::OutputSink;

use crate::config::LED_PWM_HZ;

/// LD2 on PA5 driven by TIM2 channel 1.
pub struct PwmLed {
    pwm: SimplePwm<'static, hal::peripherals::TIM2>,
    brightness: u8,
}

impl PwmLed {
    pub fn new(
        timer: Peri<'static, hal::peripherals::TIM2>,
        pin: Peri<'static, hal::peripherals::PA5>,
        brightness: u8,
    ) -> Self {
        let pin = PwmPin::new(pin, OutputType::PushPull);
        let mut pwm = SimplePwm::new(
            timer,
            Some(pin),
            None,
            None,
            None,
            hz(LED_PWM_HZ),
            CountingMode::EdgeAlignedUp,
        );
        {
            let mut channel = pwm.ch1();
            channel.set_duty_cycle_fully_off();
            channel.enable();
        }

        Self {
            pwm,
            brightness: brightness.min(100),
        }
    }
}

impl OutputSink for PwmLed {
    fn set_output(&mut self, active: bool) {
        let mut channel = self.pwm.ch1();
        if active {
            channel.set_duty_cycle_percent(self.brightness);
        } else {
            channel.set_duty_cycle_fully_off();
        }
    }
}
