use shared_definitions::{
    commands::FORCE_DISARM_KEY,
    controller::{ArmStickDirection, RcInputRole},
    tuning::ArmSettings,
};

use crate::{
    communication_interfaces::controller::RemoteControl, config::constants::EMERGENCY_STOP_LEVEL,
    shared_core_values::AtomicArmState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmingStickRegion {
    NoRegion,
    ArmRegion,
    DisarmRegion,
}

/// Tick counters of the arming state machine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArmingTimers {
    pub arm_time: u32,
    pub disarm_time: u32,
    pub timeout_time: u32,
}

/// Where the sticks currently are relative to the configured gesture.
///
/// The throttle must sit at or below `stick_threshold`. The gesture stick is
/// compared against `1 - 2 * stick_threshold`, the factor two because the
/// throttle spans half the range of the other sticks.
pub fn classify_sticks(rc: &impl RemoteControl, settings: &ArmSettings) -> ArmingStickRegion {
    let threshold = settings.stick_threshold;
    if rc.input_level(RcInputRole::Throttle) > threshold {
        return ArmingStickRegion::NoRegion;
    }

    let Some((role, is_min)) = settings.stick_direction.stick() else {
        return ArmingStickRegion::NoRegion;
    };

    let bound = 1.0 - 2.0 * threshold;
    let level = rc.input_level(role);
    let (arm_side, disarm_side) = if is_min {
        (level <= -bound, level >= bound)
    } else {
        (level >= bound, level <= -bound)
    };

    if arm_side {
        ArmingStickRegion::ArmRegion
    } else if disarm_side {
        ArmingStickRegion::DisarmRegion
    } else {
        ArmingStickRegion::NoRegion
    }
}

/// Periodic evaluator of the arm/disarm stick gesture. Owns the timers and
/// is the normal writer of the shared armed flag.
pub struct ArmingGate<'a> {
    arm_state: &'a AtomicArmState,
    rate_hz: u32,
    timers: ArmingTimers,
    /// Armed flag as of the end of the previous tick.
    armed: bool,
}

impl<'a> ArmingGate<'a> {
    pub fn new(arm_state: &'a AtomicArmState, rate_hz: u32) -> Self {
        Self {
            arm_state,
            rate_hz: rate_hz.max(1),
            timers: ArmingTimers::default(),
            armed: arm_state.is_armed(),
        }
    }

    pub fn timers(&self) -> &ArmingTimers {
        &self.timers
    }

    pub fn is_armed(&self) -> bool {
        self.arm_state.is_armed()
    }

    /// One evaluation step, to be called at `rate_hz`. Returns the armed state.
    pub fn tick(&mut self, rc: &impl RemoteControl, settings: &ArmSettings) -> bool {
        if self.armed && !self.arm_state.is_armed() {
            // Disarmed by another task, re-arming needs a complete new hold
            self.timers = ArmingTimers::default();
        }
        self.armed = self.evaluate(rc, settings);
        self.armed
    }

    fn evaluate(&mut self, rc: &impl RemoteControl, settings: &ArmSettings) -> bool {
        if !rc.link_active() || settings.stick_direction == ArmStickDirection::None {
            self.timers = ArmingTimers::default();
            self.set_armed(false, "no RC link or arm gesture");
            return false;
        }

        if rc.input_level(RcInputRole::Aux1) < EMERGENCY_STOP_LEVEL {
            self.timers = ArmingTimers::default();
            self.set_armed(false, "emergency stop");
            return false;
        }

        match classify_sticks(rc, settings) {
            ArmingStickRegion::ArmRegion => {
                self.timers.arm_time = self.timers.arm_time.saturating_add(1);
                self.timers.disarm_time = 0;
                self.timers.timeout_time = 0;
                if self.held_for(self.timers.arm_time, settings.arm_stick_time) {
                    self.set_armed(true, "arm gesture");
                }
            }
            ArmingStickRegion::DisarmRegion => {
                self.timers.disarm_time = self.timers.disarm_time.saturating_add(1);
                self.timers.arm_time = 0;
                self.timers.timeout_time = 0;
                if self.held_for(self.timers.disarm_time, settings.arm_stick_time) {
                    self.set_armed(false, "disarm gesture");
                }
            }
            ArmingStickRegion::NoRegion => {
                self.timers.arm_time = 0;
                self.timers.disarm_time = 0;

                let throttle_low =
                    rc.input_level(RcInputRole::Throttle) <= settings.stick_threshold;
                if settings.arm_zero_throttle_timeout != 0 && throttle_low {
                    self.timers.timeout_time = self.timers.timeout_time.saturating_add(1);
                    if self.held_for(
                        self.timers.timeout_time,
                        settings.arm_zero_throttle_timeout,
                    ) {
                        self.set_armed(false, "zero throttle timeout");
                    }
                } else {
                    self.timers.timeout_time = 0;
                }
            }
        }

        self.arm_state.is_armed()
    }

    fn held_for(&self, ticks: u32, seconds: u8) -> bool {
        ticks >= seconds as u32 * self.rate_hz
    }

    fn set_armed(&self, armed: bool, reason: &str) {
        if self.arm_state.set_armed(armed) != armed {
            if armed {
                log::info!("Controllers armed ({})", reason);
            } else {
                log::info!("Controllers disarmed ({})", reason);
            }
        }
    }
}

/// Safety override, reachable from any task at any time. Only the exact
/// sentinel key disarms; any other value is ignored. Returns whether the
/// request was accepted.
pub fn force_disarm(arm_state: &AtomicArmState, key: u32) -> bool {
    if key != FORCE_DISARM_KEY {
        return false;
    }
    if arm_state.set_armed(false) {
        log::info!("Controllers disarmed (forced)");
    }
    true
}

/// Disarms when the control task has stopped receiving estimates.
pub struct EstimateWatchdog {
    timeout_us: u64,
}

impl EstimateWatchdog {
    pub fn new(timeout_us: u64) -> Self {
        Self { timeout_us }
    }

    /// Returns `true` when it forced a disarm.
    pub fn check(&self, arm_state: &AtomicArmState, now_us: u64, last_estimate_us: u64) -> bool {
        if !arm_state.is_armed() || now_us.saturating_sub(last_estimate_us) <= self.timeout_us {
            return false;
        }
        arm_state.set_armed(false);
        log::warn!(
            "Controllers disarmed (no estimate for {} us)",
            now_us.saturating_sub(last_estimate_us)
        );
        true
    }
}
