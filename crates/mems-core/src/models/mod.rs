//! Shared data models for MEMS diagnostics

mod actuator;
mod frame;
mod sample;

pub use actuator::*;
pub use frame::*;
pub use sample::*;
