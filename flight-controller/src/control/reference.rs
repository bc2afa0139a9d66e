use shared_definitions::{
    controller::{FlightMode, RcInputRole},
    tuning::{ArmSettings, ControlLimits, OUTPUT_CHANNELS},
};

use crate::{
    communication_interfaces::controller::RemoteControl,
    output::mixer::ActuatorDemand,
    util::math::{
        bound,
        vectors::{RotationVector2D, RotationVector3D},
    },
};

pub const DEG2RAD: f32 = core::f32::consts::PI / 180.0;

/// Targets for one control cycle. Angles in radians, rates in rad/s.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ControlReference {
    pub mode: FlightMode,
    pub attitude_reference: RotationVector2D,
    pub rate_reference: RotationVector3D,
    pub actuator_desired: ActuatorDemand,
    pub pwm_out: [f32; OUTPUT_CHANNELS],
}

impl ControlReference {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Turns RC levels into the reference for the cascade level the mode enters at.
pub struct ReferenceBuilder;

impl ReferenceBuilder {
    /// `mode` is the mode for this cycle, `Disarmed` unless the gate is armed.
    pub fn build(
        reference: &mut ControlReference,
        mode: FlightMode,
        rc: &impl RemoteControl,
        arm_settings: &ArmSettings,
        limits: &ControlLimits,
        direct_pwm: &[f32; OUTPUT_CHANNELS],
    ) {
        reference.mode = mode;
        if mode == FlightMode::Disarmed {
            return;
        }

        let pitch = rc.input_level(RcInputRole::Pitch);
        let roll = rc.input_level(RcInputRole::Roll);
        let yaw = rc.input_level(RcInputRole::Yaw);

        match mode {
            FlightMode::Position | FlightMode::Velocity | FlightMode::Attitude => {
                reference.attitude_reference = RotationVector2D {
                    pitch: limits.max_angle.pitch * DEG2RAD * pitch,
                    roll: limits.max_angle.roll * DEG2RAD * roll,
                };
            }
            FlightMode::Rate => {
                reference.rate_reference.pitch = limits.max_rate.pitch * DEG2RAD * pitch;
                reference.rate_reference.roll = limits.max_rate.roll * DEG2RAD * roll;
            }
            FlightMode::DirectControl => {
                reference.actuator_desired.pitch = bound(pitch, -1.0, 1.0);
                reference.actuator_desired.roll = bound(roll, -1.0, 1.0);
                reference.actuator_desired.yaw = bound(yaw, -1.0, 1.0);
            }
            FlightMode::DirectPwm => {
                reference.pwm_out = *direct_pwm;
            }
            FlightMode::Disarmed => {}
        }

        // Yaw is only ever rate controlled
        reference.rate_reference.yaw = limits.max_rate.yaw * DEG2RAD * yaw;

        let throttle = rc.input_level(RcInputRole::Throttle);
        reference.actuator_desired.throttle = throttle.max(arm_settings.armed_min_throttle);
    }
}
