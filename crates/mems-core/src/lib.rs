//! mems-core - Core traits and types for MEMS 1.6 diagnostics
//!
//! This crate provides the pieces shared by every other crate in the
//! workspace: the closed set of diagnostic commands, the data model produced
//! by an ECU, and the `EcuLink` seam that transports implement.

pub mod command;
pub mod error;
pub mod link;
pub mod models;

pub use command::{Command, CommandClass, UnknownCommand};
pub use error::{LinkError, LinkResult};
pub use link::{EcuConnector, EcuLink};
pub use models::*;
