pub mod constants;
pub mod parameters;
pub mod store;
