use core::convert::Infallible;

use embedded_hal::pwm::{Error as _, ErrorType, SetDutyCycle};

use crate::{
    config::constants::{RC_OUTPUT_MAX_PULSE_US, RC_OUTPUT_MIN_PULSE_US, RC_OUTPUT_PERIOD_US},
    util::{
        error::{AppError, AppResult},
        math::bound,
    },
};

/// ESC style pulse timing of one output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    pub period_us: u16,
    pub min_pulse_us: u16,
    pub max_pulse_us: u16,
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            period_us: RC_OUTPUT_PERIOD_US,
            min_pulse_us: RC_OUTPUT_MIN_PULSE_US,
            max_pulse_us: RC_OUTPUT_MAX_PULSE_US,
        }
    }
}

impl PulseTiming {
    /// Pulse for a relative-positive width. Negative and NaN widths map to
    /// the minimum pulse.
    pub fn pulse_width_us(&self, width: f32) -> f32 {
        let width = if width.is_nan() {
            0.0
        } else {
            bound(width, 0.0, 1.0)
        };
        let span = self.max_pulse_us.saturating_sub(self.min_pulse_us) as f32;
        self.min_pulse_us as f32 + width * span
    }

    pub fn duty_for(&self, width: f32, max_duty: u16) -> u16 {
        if self.period_us == 0 {
            return 0;
        }
        let duty = self.pulse_width_us(width) / self.period_us as f32 * max_duty as f32;
        bound(libm::roundf(duty), 0.0, max_duty as f32) as u16
    }
}

/// Drives one motor/servo output through a PWM channel.
pub struct MotorController<P: SetDutyCycle> {
    pwm: P,
    timing: PulseTiming,
    duty: u16,
}

impl<P: SetDutyCycle> MotorController<P> {
    /// Takes the channel and immediately commands the minimum pulse.
    pub fn new(pwm: P, timing: PulseTiming) -> AppResult<Self> {
        let mut controller = MotorController {
            pwm,
            timing,
            duty: 0,
        };
        controller.set_minimum()?;
        Ok(controller)
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn set_minimum(&mut self) -> AppResult<()> {
        self.set_channel_width(0.0)
    }

    pub fn set_channel_width(&mut self, width: f32) -> AppResult<()> {
        let duty = self.timing.duty_for(width, self.pwm.max_duty_cycle());
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|error| AppError::Output(format!("{:?}", error.kind())))?;
        self.duty = duty;
        Ok(())
    }
}

/// PWM channel that only records the last duty, used by the host bench and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedPwmChannel {
    duty: u16,
    max_duty: u16,
}

impl SimulatedPwmChannel {
    /// `max_duty` equal to the period in microseconds gives one count per µs.
    pub const fn new(max_duty: u16) -> Self {
        Self { duty: 0, max_duty }
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl ErrorType for SimulatedPwmChannel {
    type Error = Infallible;
}

impl SetDutyCycle for SimulatedPwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty.min(self.max_duty);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use embedded_hal::pwm::ErrorKind;

    use super::*;

    struct BrokenChannel;

    impl ErrorType for BrokenChannel {
        type Error = ErrorKind;
    }

    impl SetDutyCycle for BrokenChannel {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }

        fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn maps_width_onto_pulse_range() {
        let timing = PulseTiming::default();
        assert_abs_diff_eq!(timing.pulse_width_us(0.0), 1000.0);
        assert_abs_diff_eq!(timing.pulse_width_us(0.5), 1500.0);
        assert_abs_diff_eq!(timing.pulse_width_us(1.0), 2000.0);
        assert_abs_diff_eq!(timing.pulse_width_us(-0.7), 1000.0);
        assert_abs_diff_eq!(timing.pulse_width_us(3.0), 2000.0);
    }

    #[test]
    fn duty_scales_with_resolution() {
        let timing = PulseTiming::default();
        assert_eq!(timing.duty_for(0.5, RC_OUTPUT_PERIOD_US), 1500);
        assert_eq!(timing.duty_for(0.0, u16::MAX), 26214);
    }

    #[test]
    fn starts_at_minimum_pulse() {
        let controller =
            MotorController::new(SimulatedPwmChannel::new(RC_OUTPUT_PERIOD_US), PulseTiming::default())
                .unwrap();
        assert_eq!(controller.pwm().duty(), 1000);
    }

    #[test]
    fn channel_failure_is_reported() {
        let result = MotorController::new(BrokenChannel, PulseTiming::default());
        assert!(matches!(result, Err(AppError::Output(_))));
    }
}
