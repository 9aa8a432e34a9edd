//! mems-link - ECU links for MEMS 1.6 diagnostics
//!
//! This crate provides the `EcuLink` implementations used by the
//! diagnostic tool:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 EcuConnector                  │
//! │        connect(port) -> impl EcuLink          │
//! │                                               │
//! │  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │   SerialLink     │  │    MockLink      │  │
//! │  │ (tokio-serial,   │  │ (scripted ECU,   │  │
//! │  │  ROSCO protocol) │  │  for tests)      │  │
//! │  └────────┬─────────┘  └──────────────────┘  │
//! │           │                                   │
//! │     ┌─────┴─────┐                             │
//! │     │ protocol  │ command bytes, frame sizes  │
//! │     └───────────┘                             │
//! └──────────────────────────────────────────────┘
//! ```

pub mod mock;
pub mod protocol;
pub mod serial;

pub use mock::{MockConnector, MockLink, Transaction};
pub use serial::{SerialConnector, SerialLink, SerialSettings};

// Re-export for convenience
pub use mems_core::{EcuConnector, EcuLink, LinkError, LinkResult};
