//! Fall detection: magnitude buffer, state machine and detector.
//!
//! # Responsibility
//! - Infer a probable fall (impact followed by immobility) from magnitude
//!   readings.
//!
//! # Invariants
//! - Detection contains no I/O and cannot fail at runtime; bad readings are
//!   skipped.
//! - At most one confirmation per cycle; the detector stays suspended until
//!   explicitly reset.

pub mod buffer;
pub mod config;
pub mod detector;
pub mod machine;
