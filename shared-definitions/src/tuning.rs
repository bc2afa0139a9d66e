use crate::controller::ArmStickDirection;

pub const CONTROL_NUMBER_OF_CONTROLLERS: usize = 12;
pub const OUTPUT_CHANNELS: usize = 8;
/// Throttle, pitch, roll, yaw.
pub const MIXER_INPUTS: usize = 4;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PIGains {
    pub kp: f32,
    pub ki: f32,
    pub output_min: f32,
    pub output_max: f32,
}

impl PIGains {
    pub const fn new(kp: f32, ki: f32, output_min: f32, output_max: f32) -> Self {
        Self {
            kp,
            ki,
            output_min,
            output_max,
        }
    }

    pub const fn symmetric(kp: f32, ki: f32, output_limit: f32) -> Self {
        Self::new(kp, ki, -output_limit, output_limit)
    }
}

/// Gains of every PI controller in the cascade. The flat order is position
/// (x, y, z), velocity (x, y, z), attitude (pitch, roll, yaw), rate (pitch,
/// roll, yaw).
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ControllerGainSet {
    pub position: [PIGains; 3],
    pub velocity: [PIGains; 3],
    pub attitude: [PIGains; 3],
    pub rate: [PIGains; 3],
}

impl ControllerGainSet {
    pub fn to_flat(&self) -> [PIGains; CONTROL_NUMBER_OF_CONTROLLERS] {
        let mut flat = [PIGains::default(); CONTROL_NUMBER_OF_CONTROLLERS];
        for (index, gains) in self
            .position
            .iter()
            .chain(self.velocity.iter())
            .chain(self.attitude.iter())
            .chain(self.rate.iter())
            .enumerate()
        {
            flat[index] = *gains;
        }
        flat
    }

    pub fn from_flat(flat: &[PIGains; CONTROL_NUMBER_OF_CONTROLLERS]) -> Self {
        let group = |offset: usize| [flat[offset], flat[offset + 1], flat[offset + 2]];
        Self {
            position: group(0),
            velocity: group(3),
            attitude: group(6),
            rate: group(9),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PitchRollLimit {
    pub pitch: f32,
    pub roll: f32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PitchRollYawLimit {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Reference bounds, in degrees and degrees per second.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ControlLimits {
    pub max_angle: PitchRollLimit,
    pub max_rate: PitchRollYawLimit,
    pub max_rate_attitude: PitchRollLimit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmSettings {
    pub stick_threshold: f32,
    pub armed_min_throttle: f32,
    pub stick_direction: ArmStickDirection,
    /// Seconds the gesture must be held.
    pub arm_stick_time: u8,
    /// Seconds at low throttle before an automatic disarm, 0 disables it.
    pub arm_zero_throttle_timeout: u8,
}

impl Default for ArmSettings {
    fn default() -> Self {
        Self {
            stick_threshold: 0.0,
            armed_min_throttle: 0.0,
            stick_direction: ArmStickDirection::None,
            arm_stick_time: 5,
            arm_zero_throttle_timeout: 30,
        }
    }
}

/// Per channel weights for throttle, pitch, roll and yaw. Channels the
/// airframe does not use keep an all-zero row.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OutputMixerConfig {
    pub weights: [[f32; MIXER_INPUTS]; OUTPUT_CHANNELS],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_set_flat_order_follows_cascade() {
        let mut gains = ControllerGainSet::default();
        gains.position[0].kp = 1.0;
        gains.velocity[2].kp = 6.0;
        gains.attitude[1].kp = 8.0;
        gains.rate[2].kp = 12.0;

        let flat = gains.to_flat();
        assert_eq!(flat[0].kp, 1.0);
        assert_eq!(flat[5].kp, 6.0);
        assert_eq!(flat[7].kp, 8.0);
        assert_eq!(flat[11].kp, 12.0);
        assert_eq!(ControllerGainSet::from_flat(&flat), gains);
    }

    #[test]
    fn unused_mixer_rows_default_to_zero() {
        let mixer = OutputMixerConfig::default();
        assert!(mixer
            .weights
            .iter()
            .all(|row| row.iter().all(|weight| *weight == 0.0)));
    }
}
