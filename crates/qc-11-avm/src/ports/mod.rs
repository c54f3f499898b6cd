//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for public execution.
//!
//! - **Driving Ports (Inbound)**: `PublicExecutionApi`
//! - **Driven Ports (Outbound)**: `WorldStateReader`, `ContractsDb`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
