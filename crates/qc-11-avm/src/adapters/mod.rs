//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the outbound ports.

pub mod in_memory;

pub use in_memory::*;
