//! Flutter-facing bindings for the Vigia core.

pub mod api;
