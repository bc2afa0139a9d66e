use shared_definitions::tuning::{OutputMixerConfig, MIXER_INPUTS, OUTPUT_CHANNELS};

use crate::{config::constants::ACTUATOR_LIMIT, util::math::bound};

/// Demand on the four actuator axes. Attitude axes in [-1, 1], throttle in [0, 1].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ActuatorDemand {
    pub throttle: f32,
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

impl ActuatorDemand {
    /// Mixer input order: throttle, pitch, roll, yaw.
    pub fn as_mixer_inputs(&self) -> [f32; MIXER_INPUTS] {
        [self.throttle, self.pitch, self.roll, self.yaw]
    }
}

/// Linear map from actuator demand to the physical output channels.
#[derive(Debug, Default, Clone)]
pub struct OutputMixer {
    config: OutputMixerConfig,
}

impl OutputMixer {
    pub fn new(config: OutputMixerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputMixerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: OutputMixerConfig) {
        self.config = config;
    }

    pub fn mix(&self, demand: &ActuatorDemand) -> [f32; OUTPUT_CHANNELS] {
        let inputs = demand.as_mixer_inputs();
        let mut outputs = [0.0_f32; OUTPUT_CHANNELS];
        for (output, row) in outputs.iter_mut().zip(self.config.weights.iter()) {
            let sum: f32 = row
                .iter()
                .zip(inputs.iter())
                .map(|(weight, input)| weight * input)
                .sum();
            *output = bound(sum, -ACTUATOR_LIMIT, ACTUATOR_LIMIT);
        }
        outputs
    }
}

// Motor positions in channel order
const QUAD_X_FRONT_RIGHT: usize = 0; //CCW
const QUAD_X_FRONT_LEFT: usize = 1; //CW
const QUAD_X_REAR_RIGHT: usize = 2; //CW
const QUAD_X_REAR_LEFT: usize = 3; //CCW

/// Quadcopter in X configuration on channels 0..4, remaining channels unused.
pub fn quadcopter_x_mixer() -> OutputMixerConfig {
    let mut mixer = OutputMixerConfig::default();
    //                                   throttle, pitch, roll, yaw
    mixer.weights[QUAD_X_FRONT_RIGHT] = [1.0, 1.0, -1.0, -1.0];
    mixer.weights[QUAD_X_FRONT_LEFT] = [1.0, 1.0, 1.0, 1.0];
    mixer.weights[QUAD_X_REAR_RIGHT] = [1.0, -1.0, -1.0, 1.0];
    mixer.weights[QUAD_X_REAR_LEFT] = [1.0, -1.0, 1.0, -1.0];
    mixer
}
