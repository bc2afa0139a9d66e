use std::sync::atomic::{AtomicBool, AtomicI16, AtomicI32, AtomicU32, AtomicU64, Ordering};

use shared_definitions::{controller::ControllerInput, tuning::OUTPUT_CHANNELS};

use crate::{
    config::parameters::{SharedConfiguration, SHARED_CONFIGURATION},
    util::math::vectors::RotationVector3D,
};

pub struct AtomicF32(AtomicU32);
impl AtomicF32 {
    pub const fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }
    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }
    pub fn store(&self, val: f32, order: Ordering) {
        self.0.store(val.to_bits(), order)
    }
}

/// Latest RC levels, written by the receiver decoder and read without
/// blocking by the arming and control tasks.
pub struct AtomicControllerInput {
    pub throttle: AtomicF32,
    pub pitch: AtomicF32,
    pub roll: AtomicF32,
    pub yaw: AtomicF32,
    pub aux1: AtomicF32,
    pub link_active: AtomicBool,
}

impl AtomicControllerInput {
    pub const fn new() -> Self {
        AtomicControllerInput {
            throttle: AtomicF32::new(0.0),
            pitch: AtomicF32::new(0.0),
            roll: AtomicF32::new(0.0),
            yaw: AtomicF32::new(0.0),
            aux1: AtomicF32::new(0.0),
            link_active: AtomicBool::new(false),
        }
    }

    pub fn store(&self, input: &ControllerInput) {
        self.throttle.store(input.throttle, Ordering::Relaxed);
        self.pitch.store(input.pitch, Ordering::Relaxed);
        self.roll.store(input.roll, Ordering::Relaxed);
        self.yaw.store(input.yaw, Ordering::Relaxed);
        self.aux1.store(input.aux1, Ordering::Relaxed);
        self.link_active.store(input.link_active, Ordering::Release);
    }

    pub fn snapshot(&self) -> ControllerInput {
        ControllerInput {
            link_active: self.link_active.load(Ordering::Acquire),
            throttle: self.throttle.load(Ordering::Relaxed),
            pitch: self.pitch.load(Ordering::Relaxed),
            roll: self.roll.load(Ordering::Relaxed),
            yaw: self.yaw.load(Ordering::Relaxed),
            aux1: self.aux1.load(Ordering::Relaxed),
        }
    }
}

impl Default for AtomicControllerInput {
    fn default() -> Self {
        Self::new()
    }
}

/// The armed flag. Written by the arming task and the forced disarm path,
/// read by the control task once per cycle.
pub struct AtomicArmState {
    armed: AtomicBool,
}

impl AtomicArmState {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Returns the previous value.
    pub fn set_armed(&self, armed: bool) -> bool {
        self.armed.swap(armed, Ordering::AcqRel)
    }
}

impl Default for AtomicArmState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AtomicRotationVector3D {
    roll: AtomicI16,
    pitch: AtomicI16,
    yaw: AtomicI16,
}

impl AtomicRotationVector3D {
    pub const fn new() -> Self {
        Self {
            roll: AtomicI16::new(0),
            pitch: AtomicI16::new(0),
            yaw: AtomicI16::new(0),
        }
    }
    pub fn store(&self, vector: RotationVector3D) {
        self.roll
            .store((vector.roll * 100.0) as i16, Ordering::Relaxed);
        self.pitch
            .store((vector.pitch * 100.0) as i16, Ordering::Relaxed);
        self.yaw
            .store((vector.yaw * 100.0) as i16, Ordering::Relaxed);
    }
    pub fn read(&self) -> RotationVector3D {
        RotationVector3D {
            roll: self.roll.load(Ordering::Relaxed) as f32 / 100.0,
            pitch: self.pitch.load(Ordering::Relaxed) as f32 / 100.0,
            yaw: self.yaw.load(Ordering::Relaxed) as f32 / 100.0,
        }
    }
}

const ZERO_CHANNEL: AtomicF32 = AtomicF32::new(0.0);

pub struct AtomicTelemetry {
    pub loop_exec_time_us: AtomicI32,
    pub last_estimate_us: AtomicU64,
    pub rotation_rate: AtomicRotationVector3D,
    pub channel_outputs: [AtomicF32; OUTPUT_CHANNELS],
    pub throttle: AtomicF32,
    pub armed: AtomicBool,
}

impl AtomicTelemetry {
    pub const fn new() -> Self {
        AtomicTelemetry {
            loop_exec_time_us: AtomicI32::new(0),
            last_estimate_us: AtomicU64::new(0),
            rotation_rate: AtomicRotationVector3D::new(),
            channel_outputs: [ZERO_CHANNEL; OUTPUT_CHANNELS],
            throttle: AtomicF32::new(0.0),
            armed: AtomicBool::new(false),
        }
    }

    pub fn channel_outputs(&self) -> [f32; OUTPUT_CHANNELS] {
        let mut outputs = [0.0_f32; OUTPUT_CHANNELS];
        for (output, shared) in outputs.iter_mut().zip(self.channel_outputs.iter()) {
            *output = shared.load(Ordering::Relaxed);
        }
        outputs
    }
}

impl Default for AtomicTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

pub static SHARED_CONTROLLER_INPUT: AtomicControllerInput = AtomicControllerInput::new();
pub static SHARED_ARM_STATE: AtomicArmState = AtomicArmState::new();
pub static SHARED_TELEMETRY: AtomicTelemetry = AtomicTelemetry::new();

/// Handles to the state the tasks share. Tests build their own, the firmware
/// uses the process-wide statics.
#[derive(Clone, Copy)]
pub struct SharedCoreValues<'a> {
    pub controller_input: &'a AtomicControllerInput,
    pub arm_state: &'a AtomicArmState,
    pub config: &'a SharedConfiguration,
    pub telemetry: &'a AtomicTelemetry,
}

impl SharedCoreValues<'static> {
    pub fn global() -> Self {
        Self {
            controller_input: &SHARED_CONTROLLER_INPUT,
            arm_state: &SHARED_ARM_STATE,
            config: &SHARED_CONFIGURATION,
            telemetry: &SHARED_TELEMETRY,
        }
    }
}
