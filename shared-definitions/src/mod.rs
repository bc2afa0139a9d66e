pub mod commands;
pub mod controller;
pub mod tuning;
