use embedded_hal::pwm::SetDutyCycle;
use shared_definitions::tuning::OUTPUT_CHANNELS;

use super::motor_controller::{MotorController, PulseTiming};
use crate::util::error::AppResult;

/// Owns the eight output channels.
pub struct MotorsStateManager<P: SetDutyCycle> {
    controllers: Vec<MotorController<P>>,
    killed: bool,
}

impl<P: SetDutyCycle> MotorsStateManager<P> {
    /// Every channel starts at the minimum pulse. Any channel failing to take
    /// it fails the whole construction.
    pub fn new(channels: [P; OUTPUT_CHANNELS], timing: PulseTiming) -> AppResult<Self> {
        let mut controllers = Vec::with_capacity(OUTPUT_CHANNELS);
        for (index, pwm) in channels.into_iter().enumerate() {
            let controller = MotorController::new(pwm, timing).inspect_err(|error| {
                log::error!("Output channel {} failed to initialize: {}", index, error)
            })?;
            controllers.push(controller);
        }

        Ok(MotorsStateManager {
            controllers,
            killed: true,
        })
    }

    pub fn channel(&self, index: usize) -> Option<&MotorController<P>> {
        self.controllers.get(index)
    }

    /// Forwards bounded mixer outputs as relative-positive widths. A failing
    /// channel is skipped for this cycle.
    pub fn set_outputs(&mut self, outputs: &[f32; OUTPUT_CHANNELS]) {
        for (index, (controller, width)) in self.controllers.iter_mut().zip(outputs).enumerate() {
            if let Err(error) = controller.set_channel_width(*width) {
                log::warn!("Output channel {}: {}", index, error);
            }
        }
        self.killed = false;
    }

    pub fn kill_motors(&mut self) {
        for (index, controller) in self.controllers.iter_mut().enumerate() {
            if let Err(error) = controller.set_minimum() {
                log::warn!("Output channel {}: {}", index, error);
            }
        }
        if !self.killed {
            log::info!("Killed motors");
            self.killed = true;
        }
    }
}
