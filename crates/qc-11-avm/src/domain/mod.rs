//! # Domain Layer (Inner Hexagon)
//!
//! Requests, results, configuration and the invariants results must satisfy.
//! No I/O and no async.

pub mod entities;
pub mod invariants;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use value_objects::*;
