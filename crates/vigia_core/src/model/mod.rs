//! Domain model for the fall detection engine.
//!
//! # Responsibility
//! - Define the value types shared by sampler, detector, alert and dialer.
//! - Own contact validation so no other layer re-implements it.
//!
//! # Invariants
//! - An `EmergencyContact` value always holds 10-11 ASCII digits.
//! - `Settings` never carries an unvalidated contact.

pub mod contact;
pub mod sample;
pub mod settings;
