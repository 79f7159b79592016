//! Poll driver
//!
//! Owns the applied state and runs cycles back to back, never
//! overlapping, until cancelled at an interval boundary.

mod loops;

pub use loops::{run, Cycle};
