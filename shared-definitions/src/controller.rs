/// Logical RC channel roles as delivered by the receiver decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcInputRole {
    Throttle,
    Pitch,
    Roll,
    Yaw,
    Aux1,
}

/// Snapshot of normalized RC levels. Throttle and aux1 are in [0, 1],
/// the attitude sticks in [-1, 1].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ControllerInput {
    pub throttle: f32,
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
    pub aux1: f32,
    pub link_active: bool,
}

impl ControllerInput {
    pub fn level(&self, role: RcInputRole) -> f32 {
        match role {
            RcInputRole::Throttle => self.throttle,
            RcInputRole::Pitch => self.pitch,
            RcInputRole::Roll => self.roll,
            RcInputRole::Yaw => self.yaw,
            RcInputRole::Aux1 => self.aux1,
        }
    }
}

/// Flight modes, ordered by how deep into the cascade the reference enters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum FlightMode {
    #[default]
    Disarmed = 0,
    DirectPwm = 1,
    DirectControl = 2,
    Rate = 3,
    Attitude = 4,
    Velocity = 5,
    Position = 6,
}

impl TryFrom<u8> for FlightMode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FlightMode::Disarmed),
            1 => Ok(FlightMode::DirectPwm),
            2 => Ok(FlightMode::DirectControl),
            3 => Ok(FlightMode::Rate),
            4 => Ok(FlightMode::Attitude),
            5 => Ok(FlightMode::Velocity),
            6 => Ok(FlightMode::Position),
            _ => Err(()),
        }
    }
}

/// Stick used for the arm gesture, and whether the arm side is its minimum
/// or maximum deflection. The opposite side disarms.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArmStickDirection {
    #[default]
    None = 0,
    PitchMin = 1,
    PitchMax = 2,
    RollMin = 3,
    RollMax = 4,
    YawMin = 5,
    YawMax = 6,
}

impl ArmStickDirection {
    /// Stick role and `true` when the arm side is the minimum deflection.
    pub fn stick(&self) -> Option<(RcInputRole, bool)> {
        match self {
            ArmStickDirection::None => None,
            ArmStickDirection::PitchMin => Some((RcInputRole::Pitch, true)),
            ArmStickDirection::PitchMax => Some((RcInputRole::Pitch, false)),
            ArmStickDirection::RollMin => Some((RcInputRole::Roll, true)),
            ArmStickDirection::RollMax => Some((RcInputRole::Roll, false)),
            ArmStickDirection::YawMin => Some((RcInputRole::Yaw, true)),
            ArmStickDirection::YawMax => Some((RcInputRole::Yaw, false)),
        }
    }
}

impl TryFrom<u8> for ArmStickDirection {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ArmStickDirection::None),
            1 => Ok(ArmStickDirection::PitchMin),
            2 => Ok(ArmStickDirection::PitchMax),
            3 => Ok(ArmStickDirection::RollMin),
            4 => Ok(ArmStickDirection::RollMax),
            5 => Ok(ArmStickDirection::YawMin),
            6 => Ok(ArmStickDirection::YawMax),
            _ => Err(()),
        }
    }
}

bitflags::bitflags! {
    /// Cascade stages that executed during one control cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ControlStages: u8 {
        const POSITION = 1 << 0;
        const VELOCITY = 1 << 1;
        const ATTITUDE = 1 << 2;
        const RATE = 1 << 3;
        const OUTPUT_UPDATE = 1 << 4;
        const SEND = 1 << 5;
        const DISABLE_OUTPUTS = 1 << 6;
    }
}
