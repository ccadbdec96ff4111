//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable key-value contract settings are stored through.
//! - Isolate SQLite query details from the settings service.

pub mod settings_repo;
