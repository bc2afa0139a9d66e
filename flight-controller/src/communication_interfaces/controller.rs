use shared_definitions::controller::{ControllerInput, RcInputRole};

/// Non-blocking view of the RC receiver.
pub trait RemoteControl {
    fn input_level(&self, role: RcInputRole) -> f32;
    fn link_active(&self) -> bool;
}

impl RemoteControl for ControllerInput {
    fn input_level(&self, role: RcInputRole) -> f32 {
        self.level(role)
    }

    fn link_active(&self) -> bool {
        self.link_active
    }
}
