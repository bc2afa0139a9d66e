use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Duration,
};

use shared_definitions::{
    controller::{ControlStages, FlightMode},
    tuning::{ControllerGainSet, OUTPUT_CHANNELS},
};

use crate::{
    communication_interfaces::controller::RemoteControl,
    config::{
        constants::{
            ACTUATOR_LIMIT, ESTIMATE_STALE_TIMEOUT_US, RATE_FILTER_ALPHA, TELEMETRY_CYCLE_DIVIDER,
        },
        parameters::{ControlConfiguration, SharedConfiguration},
    },
    control::{
        filters::LowPassFilter3D,
        pi::PIController,
        reference::{ControlReference, ReferenceBuilder, DEG2RAD},
    },
    output::mixer::OutputMixer,
    shared_core_values::SharedCoreValues,
    telemetry::{publish_cycle, TelemetryHook, TelemetrySink},
    util::{
        math::{
            bound,
            vectors::{Quaternion, Vector3D},
        },
        time::get_current_system_time_us,
    },
};

/// One estimator update, the trigger for one control cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AttitudeEstimate {
    pub attitude: Quaternion,
    /// Body rates in rad/s, `x` roll, `y` pitch, `z` yaw.
    pub rotation_rate: Vector3D,
    pub position: Option<Vector3D>,
    pub velocity: Option<Vector3D>,
    /// Seconds since the previous estimate.
    pub dt: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MainControlLoopOutCommands {
    KillMotors,
    UpdateOutputs([f32; OUTPUT_CHANNELS]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStage {
    Position,
    Velocity,
    Attitude,
    Rate,
    OutputUpdate,
    Send,
}

/// Stages in execution order. A mode enters at its own level and runs every
/// stage below it in the same cycle.
pub const CASCADE: [ControlStage; 6] = [
    ControlStage::Position,
    ControlStage::Velocity,
    ControlStage::Attitude,
    ControlStage::Rate,
    ControlStage::OutputUpdate,
    ControlStage::Send,
];

impl ControlStage {
    /// Index into [`CASCADE`] where `mode` enters, `None` when disarmed.
    pub fn entry_for(mode: FlightMode) -> Option<usize> {
        match mode {
            FlightMode::Disarmed => None,
            FlightMode::Position => Some(0),
            FlightMode::Velocity => Some(1),
            FlightMode::Attitude => Some(2),
            FlightMode::Rate => Some(3),
            FlightMode::DirectControl => Some(4),
            FlightMode::DirectPwm => Some(5),
        }
    }

    pub fn flag(&self) -> ControlStages {
        match self {
            ControlStage::Position => ControlStages::POSITION,
            ControlStage::Velocity => ControlStages::VELOCITY,
            ControlStage::Attitude => ControlStages::ATTITUDE,
            ControlStage::Rate => ControlStages::RATE,
            ControlStage::OutputUpdate => ControlStages::OUTPUT_UPDATE,
            ControlStage::Send => ControlStages::SEND,
        }
    }
}

/// Pitch, roll and yaw controllers of one cascade level.
type AxisControllers = [PIController; 3];

pub struct ControlPipeline {
    reference: ControlReference,
    position_controllers: AxisControllers,
    velocity_controllers: AxisControllers,
    attitude_controllers: AxisControllers,
    rate_controllers: AxisControllers,
    rate_filter: LowPassFilter3D,
    mixer: OutputMixer,
    config: ControlConfiguration,
    config_revision: u32,
}

impl ControlPipeline {
    pub fn new(config: ControlConfiguration) -> Self {
        let mut pipeline = Self {
            reference: ControlReference::default(),
            position_controllers: Default::default(),
            velocity_controllers: Default::default(),
            attitude_controllers: Default::default(),
            rate_controllers: Default::default(),
            rate_filter: LowPassFilter3D::new(RATE_FILTER_ALPHA),
            mixer: OutputMixer::default(),
            config: config.clone(),
            config_revision: 0,
        };
        pipeline.apply_configuration(config);
        pipeline
    }

    pub fn reference(&self) -> &ControlReference {
        &self.reference
    }

    pub fn configuration(&self) -> &ControlConfiguration {
        &self.config
    }

    pub fn controller_gains(&self) -> ControllerGainSet {
        let gains = |controllers: &AxisControllers| controllers.each_ref().map(|pi| *pi.gains());
        ControllerGainSet {
            position: gains(&self.position_controllers),
            velocity: gains(&self.velocity_controllers),
            attitude: gains(&self.attitude_controllers),
            rate: gains(&self.rate_controllers),
        }
    }

    /// Only controllers whose gains actually changed lose their state. A new
    /// flight mode also clears the stages it no longer runs.
    pub fn apply_configuration(&mut self, config: ControlConfiguration) {
        if config.flight_mode != self.config.flight_mode {
            log::info!(
                "Flight mode {:?} -> {:?}",
                self.config.flight_mode,
                config.flight_mode
            );
            self.reset_skipped_stages(config.flight_mode);
        }

        let groups = [
            (&mut self.position_controllers, config.gains.position),
            (&mut self.velocity_controllers, config.gains.velocity),
            (&mut self.attitude_controllers, config.gains.attitude),
            (&mut self.rate_controllers, config.gains.rate),
        ];
        for (controllers, gains) in groups {
            for (controller, gains) in controllers.iter_mut().zip(gains) {
                controller.set_gains(gains);
            }
        }
        self.mixer.set_config(config.mixer);
        self.config = config;
    }

    /// Picks up configuration written by other tasks since the last call.
    pub fn sync_configuration(&mut self, shared: &SharedConfiguration) {
        if let Some((revision, config)) = shared.snapshot_if_changed(self.config_revision) {
            log::debug!("Applying control configuration revision {}", revision);
            self.config_revision = revision;
            self.apply_configuration(config);
        }
    }

    /// Runs one control cycle and reports which stages executed.
    pub fn update_control_action(
        &mut self,
        rc: &impl RemoteControl,
        armed: bool,
        estimate: &AttitudeEstimate,
        controllers_out_callback: &mut impl FnMut(MainControlLoopOutCommands),
    ) -> ControlStages {
        let mode = if armed {
            self.config.flight_mode
        } else {
            FlightMode::Disarmed
        };

        ReferenceBuilder::build(
            &mut self.reference,
            mode,
            rc,
            &self.config.arm_settings,
            &self.config.limits,
            &self.config.direct_pwm,
        );

        let Some(entry) = ControlStage::entry_for(mode) else {
            self.kill_outputs(controllers_out_callback);
            return ControlStages::DISABLE_OUTPUTS;
        };

        let mut executed = ControlStages::empty();
        for stage in &CASCADE[entry..] {
            self.run_stage(*stage, estimate, controllers_out_callback);
            executed |= stage.flag();
        }
        executed
    }

    fn run_stage(
        &mut self,
        stage: ControlStage,
        estimate: &AttitudeEstimate,
        controllers_out_callback: &mut impl FnMut(MainControlLoopOutCommands),
    ) {
        match stage {
            ControlStage::Position => self.position_control(estimate.position.as_ref(), estimate.dt),
            ControlStage::Velocity => self.velocity_control(estimate.velocity.as_ref(), estimate.dt),
            ControlStage::Attitude => self.attitude_control(&estimate.attitude, estimate.dt),
            ControlStage::Rate => self.rate_control(&estimate.rotation_rate, estimate.dt),
            ControlStage::OutputUpdate => {
                self.reference.pwm_out = self.mixer.mix(&self.reference.actuator_desired);
            }
            ControlStage::Send => {
                controllers_out_callback(MainControlLoopOutCommands::UpdateOutputs(
                    self.reference.pwm_out,
                ));
            }
        }
    }

    /// Extension point. No position law yet, the attitude reference built
    /// from the sticks passes through unchanged.
    fn position_control(&mut self, _position: Option<&Vector3D>, _dt: f32) {}

    /// Extension point, see `position_control`.
    fn velocity_control(&mut self, _velocity: Option<&Vector3D>, _dt: f32) {}

    fn attitude_control(&mut self, attitude: &Quaternion, dt: f32) {
        let measured = attitude.pitch_roll();
        let reference = self.reference.attitude_reference;
        let limits = self.config.limits.max_rate_attitude;

        let pitch_rate = self.attitude_controllers[0].update(reference.pitch - measured.pitch, dt);
        let roll_rate = self.attitude_controllers[1].update(reference.roll - measured.roll, dt);

        let max_pitch = limits.pitch * DEG2RAD;
        let max_roll = limits.roll * DEG2RAD;
        self.reference.rate_reference.pitch = bound(pitch_rate, -max_pitch, max_pitch);
        self.reference.rate_reference.roll = bound(roll_rate, -max_roll, max_roll);
    }

    fn rate_control(&mut self, rotation_rate: &Vector3D, dt: f32) {
        let filtered = self.rate_filter.update(rotation_rate);
        let reference = self.reference.rate_reference;

        let pitch = self.rate_controllers[0].update(reference.pitch - filtered.y, dt);
        let roll = self.rate_controllers[1].update(reference.roll - filtered.x, dt);
        let yaw = self.rate_controllers[2].update(reference.yaw - filtered.z, dt);

        let demand = &mut self.reference.actuator_desired;
        demand.pitch = bound(pitch, -ACTUATOR_LIMIT, ACTUATOR_LIMIT);
        demand.roll = bound(roll, -ACTUATOR_LIMIT, ACTUATOR_LIMIT);
        demand.yaw = bound(yaw, -ACTUATOR_LIMIT, ACTUATOR_LIMIT);
    }

    /// Zeroes the reference and every controller, then stops the motors.
    fn kill_outputs(
        &mut self,
        controllers_out_callback: &mut impl FnMut(MainControlLoopOutCommands),
    ) {
        self.reference.reset();
        self.reset_skipped_stages(FlightMode::Disarmed);
        controllers_out_callback(MainControlLoopOutCommands::KillMotors);
    }

    fn reset_skipped_stages(&mut self, mode: FlightMode) {
        let entry = ControlStage::entry_for(mode).unwrap_or(CASCADE.len());
        for stage in &CASCADE[..entry] {
            match stage {
                ControlStage::Position => {
                    self.position_controllers.iter_mut().for_each(PIController::reset)
                }
                ControlStage::Velocity => {
                    self.velocity_controllers.iter_mut().for_each(PIController::reset)
                }
                ControlStage::Attitude => {
                    self.attitude_controllers.iter_mut().for_each(PIController::reset)
                }
                ControlStage::Rate => {
                    self.rate_controllers.iter_mut().for_each(PIController::reset);
                    self.rate_filter.reset();
                }
                ControlStage::OutputUpdate | ControlStage::Send => {}
            }
        }
    }
}

/// Runs one cascade per received estimate until the estimator hangs up.
/// Stops the motors whenever no estimate arrives within the staleness timeout.
pub fn start_flight_controllers(
    shared: SharedCoreValues<'_>,
    estimates: Receiver<AttitudeEstimate>,
    mut telemetry_sink: Option<&mut dyn TelemetrySink>,
    mut controllers_out_callback: impl FnMut(MainControlLoopOutCommands),
) {
    let mut pipeline = ControlPipeline::new(shared.config.snapshot());
    let mut telemetry_hook = TelemetryHook::new(TELEMETRY_CYCLE_DIVIDER);
    let mut previous_time_us = get_current_system_time_us();
    let stale_timeout = Duration::from_micros(ESTIMATE_STALE_TIMEOUT_US);
    let mut stalled = false;

    loop {
        let estimate = match estimates.recv_timeout(stale_timeout) {
            Ok(estimate) => estimate,
            Err(RecvTimeoutError::Timeout) => {
                if !stalled {
                    log::warn!(
                        "No estimate for {} us, stopping outputs",
                        ESTIMATE_STALE_TIMEOUT_US
                    );
                    stalled = true;
                }
                pipeline.kill_outputs(&mut controllers_out_callback);
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        stalled = false;

        pipeline.sync_configuration(shared.config);

        let armed = shared.arm_state.is_armed();
        pipeline.update_control_action(
            &shared.controller_input.snapshot(),
            armed,
            &estimate,
            &mut controllers_out_callback,
        );

        let current_time_us = get_current_system_time_us();
        publish_cycle(
            shared.telemetry,
            pipeline.reference(),
            &estimate,
            current_time_us.saturating_sub(previous_time_us),
            current_time_us,
        );
        previous_time_us = current_time_us;

        if let Some(telemetry) = telemetry_hook.on_cycle(pipeline.reference(), &estimate) {
            if let Some(sink) = telemetry_sink.as_deref_mut() {
                sink.send(&telemetry);
            }
        }
    }

    log::warn!("Estimate source closed, flight controllers stopped");
}
