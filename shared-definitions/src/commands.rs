use crate::{
    controller::FlightMode,
    tuning::{ArmSettings, ControlLimits, ControllerGainSet, OutputMixerConfig, OUTPUT_CHANNELS},
};

/// Key that must accompany a forced disarm request.
pub const FORCE_DISARM_KEY: u32 = 0xDEAD_BEEF;

/// Commands accepted from the configuration / host interface.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Disarms immediately when `key` matches [`FORCE_DISARM_KEY`], ignored otherwise.
    ForceDisarm { key: u32 },
    SetArmSettings(ArmSettings),
    SetControllerGains(ControllerGainSet),
    SetControlLimits(ControlLimits),
    SetOutputMixer(OutputMixerConfig),
    SetFlightMode(FlightMode),
    SetDirectPwm([f32; OUTPUT_CHANNELS]),
    SaveParameters,
}
