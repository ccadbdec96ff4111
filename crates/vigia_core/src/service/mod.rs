//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep engine/FFI layers decoupled from storage details.

pub mod settings_store;
