use std::sync::{
    atomic::{AtomicU32, Ordering},
    PoisonError, RwLock,
};

use once_cell::sync::Lazy;
use shared_definitions::{
    controller::FlightMode,
    tuning::{ArmSettings, ControlLimits, ControllerGainSet, OutputMixerConfig, OUTPUT_CHANNELS},
};

use crate::{config::constants::ACTUATOR_LIMIT, util::math::bound};

/// Everything the control and arming tasks can be reconfigured with at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlConfiguration {
    pub arm_settings: ArmSettings,
    pub gains: ControllerGainSet,
    pub limits: ControlLimits,
    pub mixer: OutputMixerConfig,
    /// Mode entered while armed.
    pub flight_mode: FlightMode,
    pub direct_pwm: [f32; OUTPUT_CHANNELS],
}

impl Default for ControlConfiguration {
    fn default() -> Self {
        Self {
            arm_settings: ArmSettings::default(),
            gains: ControllerGainSet::default(),
            limits: ControlLimits::default(),
            mixer: OutputMixerConfig::default(),
            flight_mode: FlightMode::Attitude,
            direct_pwm: [0.0; OUTPUT_CHANNELS],
        }
    }
}

/// Guarded handle for configuration written from the command interface and
/// read by the real-time tasks. Each write bumps the revision so readers can
/// keep a private copy and refresh it only when something changed.
pub struct SharedConfiguration {
    config: RwLock<ControlConfiguration>,
    revision: AtomicU32,
}

pub static SHARED_CONFIGURATION: Lazy<SharedConfiguration> =
    Lazy::new(|| SharedConfiguration::new(ControlConfiguration::default()));

impl SharedConfiguration {
    pub fn new(config: ControlConfiguration) -> Self {
        Self {
            config: RwLock::new(config),
            revision: AtomicU32::new(0),
        }
    }

    pub fn revision(&self) -> u32 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ControlConfiguration {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns a copy and its revision when the revision differs from `last_revision`.
    pub fn snapshot_if_changed(&self, last_revision: u32) -> Option<(u32, ControlConfiguration)> {
        if self.revision() == last_revision {
            return None;
        }
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        Some((self.revision(), config.clone()))
    }

    pub fn replace(&self, config: ControlConfiguration) {
        self.update(|current| *current = config);
    }

    fn update(&self, apply: impl FnOnce(&mut ControlConfiguration)) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut config);
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    pub fn arm_settings(&self) -> ArmSettings {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .arm_settings
    }

    pub fn set_arm_settings(&self, settings: ArmSettings) {
        self.update(|config| config.arm_settings = settings);
    }

    pub fn controller_gains(&self) -> ControllerGainSet {
        self.config.read().unwrap_or_else(PoisonError::into_inner).gains
    }

    pub fn set_controller_gains(&self, gains: ControllerGainSet) {
        self.update(|config| config.gains = gains);
    }

    pub fn control_limits(&self) -> ControlLimits {
        self.config.read().unwrap_or_else(PoisonError::into_inner).limits
    }

    pub fn set_control_limits(&self, limits: ControlLimits) {
        self.update(|config| config.limits = limits);
    }

    pub fn output_mixer(&self) -> OutputMixerConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).mixer
    }

    pub fn set_output_mixer(&self, mixer: OutputMixerConfig) {
        self.update(|config| config.mixer = mixer);
    }

    pub fn flight_mode(&self) -> FlightMode {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .flight_mode
    }

    pub fn set_flight_mode(&self, mode: FlightMode) {
        self.update(|config| config.flight_mode = mode);
    }

    pub fn set_direct_pwm(&self, channels: [f32; OUTPUT_CHANNELS]) {
        let channels = channels.map(|value| {
            if value.is_finite() {
                bound(value, -ACTUATOR_LIMIT, ACTUATOR_LIMIT)
            } else {
                0.0
            }
        });
        self.update(|config| config.direct_pwm = channels);
    }
}
