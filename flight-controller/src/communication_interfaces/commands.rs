use std::sync::mpsc::Sender;

use shared_definitions::commands::CoreCommand;

use crate::{
    config::parameters::SharedConfiguration, control::arming::force_disarm,
    shared_core_values::AtomicArmState,
};

/// Asks the parameter save task to persist the current configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveRequest;

/// Applies host commands to the shared configuration and arm state.
pub struct CommandHandler<'a> {
    config: &'a SharedConfiguration,
    arm_state: &'a AtomicArmState,
    save_requests: Sender<SaveRequest>,
}

impl<'a> CommandHandler<'a> {
    pub fn new(
        config: &'a SharedConfiguration,
        arm_state: &'a AtomicArmState,
        save_requests: Sender<SaveRequest>,
    ) -> Self {
        Self {
            config,
            arm_state,
            save_requests,
        }
    }

    /// Returns `false` when the command was ignored.
    pub fn handle(&self, command: CoreCommand) -> bool {
        match command {
            CoreCommand::ForceDisarm { key } => force_disarm(self.arm_state, key),
            CoreCommand::SetArmSettings(settings) => {
                self.config.set_arm_settings(settings);
                true
            }
            CoreCommand::SetControllerGains(gains) => {
                self.config.set_controller_gains(gains);
                true
            }
            CoreCommand::SetControlLimits(limits) => {
                self.config.set_control_limits(limits);
                true
            }
            CoreCommand::SetOutputMixer(mixer) => {
                self.config.set_output_mixer(mixer);
                true
            }
            CoreCommand::SetFlightMode(mode) => {
                log::info!("Flight mode {:?} requested", mode);
                self.config.set_flight_mode(mode);
                true
            }
            CoreCommand::SetDirectPwm(channels) => {
                self.config.set_direct_pwm(channels);
                true
            }
            CoreCommand::SaveParameters => match self.save_requests.send(SaveRequest) {
                Ok(()) => true,
                Err(_) => {
                    log::warn!("Parameter save task not running");
                    false
                }
            },
        }
    }
}
