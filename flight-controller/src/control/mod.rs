pub mod arming;
pub mod control_loops;
pub mod filters;
pub mod pi;
pub mod reference;
