//! Accelerometer sampling.
//!
//! # Responsibility
//! - Control the platform accelerometer subscription.
//! - Turn raw samples into magnitude readings and republish them.
//!
//! # Invariants
//! - An unavailable sensor is reported as a status, never as a panic, and is
//!   not retried.

pub mod sampler;
